//! Serialisation of DNS messages to the wire format.  See the `types`
//! module for details of the format.
//!
//! Names are always written out uncompressed: queries hold a single
//! name, so there is nothing to gain.

use std::fmt;

use crate::protocol::types::*;

impl Message {
    /// # Errors
    ///
    /// If a section or a record's RDATA is too big to have its length
    /// written in 16 bits.
    pub fn to_octets(self) -> Result<Vec<u8>, Error> {
        let mut buffer = WritableBuffer::default();
        self.serialise(&mut buffer)?;
        Ok(buffer.octets)
    }

    /// # Errors
    ///
    /// See `to_octets`.
    pub fn serialise(self, buffer: &mut WritableBuffer) -> Result<(), Error> {
        buffer.write_u16(self.header.id);
        buffer.write_u16(self.header.flags.bits());
        for len in [
            self.questions.len(),
            self.answers.len(),
            self.authority.len(),
            self.additional.len(),
        ] {
            buffer.write_u16(length_field(len)?);
        }

        for question in &self.questions {
            question.serialise(buffer);
        }

        for rr in [self.answers, self.authority, self.additional]
            .into_iter()
            .flatten()
        {
            rr.serialise(buffer)?;
        }

        Ok(())
    }
}

impl Question {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        self.name.serialise(buffer);
        buffer.write_u16(self.qtype.into());
        buffer.write_u16(self.qclass.into());
    }
}

impl WireRecord {
    /// # Errors
    ///
    /// If the RDATA is longer than 65535 octets.
    pub fn serialise(&self, buffer: &mut WritableBuffer) -> Result<(), Error> {
        self.name.serialise(buffer);
        buffer.write_u16(self.rtype().into());
        buffer.write_u16(self.class.into());
        buffer.write_u32(self.ttl);

        // RDLENGTH is patched in once the RDATA is written
        let rdlength_at = buffer.octets.len();
        buffer.write_u16(0);
        self.data.serialise(buffer);

        let rdlength = length_field(buffer.octets.len() - rdlength_at - 2)?;
        buffer.octets[rdlength_at..rdlength_at + 2].copy_from_slice(&rdlength.to_be_bytes());

        Ok(())
    }
}

impl RecordData {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        match self {
            RecordData::A { address } => buffer.write_octets(&address.octets()),
            RecordData::NS { nsdname } => nsdname.serialise(buffer),
            RecordData::CNAME { cname } => cname.serialise(buffer),
            RecordData::MX {
                preference,
                exchange,
            } => {
                buffer.write_u16(*preference);
                exchange.serialise(buffer);
            }
            RecordData::Opaque { octets, .. } => buffer.write_octets(octets),
        }
    }
}

impl DomainName {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        for label in self.labels() {
            buffer.write_u8(label.len());
            buffer.write_octets(label.octets());
        }
    }
}

/// Errors encountered when serialising a message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// A length does not fit in a 16-bit field.
    LengthTooLarge { length: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::LengthTooLarge { length } => {
                write!(f, "length {length} does not fit in 16 bits")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A buffer which can be written to, for serialisation purposes.
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self {
            octets: Vec::with_capacity(512),
        }
    }
}

impl WritableBuffer {
    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        self.octets.extend_from_slice(octets);
    }
}

fn length_field(length: usize) -> Result<u16, Error> {
    u16::try_from(length).map_err(|_| Error::LengthTooLarge { length })
}
