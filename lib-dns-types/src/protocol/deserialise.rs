//! Deserialisation of DNS messages from the network.  See the `types`
//! module for details of the format.

use bytes::Bytes;
use std::fmt;
use std::net::Ipv4Addr;

use crate::protocol::types::*;

/// Compression pointers are the two top bits of a length octet.
const POINTER_TAG: u8 = 0b1100_0000;

impl Message {
    /// # Errors
    ///
    /// If the message cannot be parsed.
    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(octets);

        reader.id = reader.u16(Part::Header).map_err(|_| Error::NoId)?;
        let flags = Flags::from_bits(reader.u16(Part::Header)?);
        let qdcount = reader.u16(Part::Header)?;
        let ancount = reader.u16(Part::Header)?;
        let nscount = reader.u16(Part::Header)?;
        let arcount = reader.u16(Part::Header)?;

        let questions = (0..qdcount)
            .map(|_| reader.question())
            .collect::<Result<Vec<_>, _>>()?;
        let answers = reader.records(ancount)?;
        let authority = reader.records(nscount)?;
        let additional = reader.records(arcount)?;

        Ok(Self {
            header: Header {
                id: reader.id,
                flags,
            },
            questions,
            answers,
            authority,
            additional,
        })
    }
}

/// A cursor over a received message.  Every error it raises carries
/// the message ID, once that has been read.
pub struct Reader<'a> {
    octets: &'a [u8],
    position: usize,
    id: u16,
}

impl<'a> Reader<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            octets,
            position: 0,
            id: 0,
        }
    }

    /// # Errors
    ///
    /// If the question is truncated or its name is invalid.
    pub fn question(&mut self) -> Result<Question, Error> {
        Ok(Question {
            name: self.name()?,
            qtype: RecordType::from(self.u16(Part::Question)?),
            qclass: RecordClass::from(self.u16(Part::Question)?),
        })
    }

    fn records(&mut self, count: u16) -> Result<Vec<WireRecord>, Error> {
        (0..count).map(|_| self.record()).collect()
    }

    /// # Errors
    ///
    /// If the record is truncated, a name in it is invalid, or the
    /// RDATA does not fill exactly RDLENGTH octets.
    pub fn record(&mut self) -> Result<WireRecord, Error> {
        let name = self.name()?;
        let rtype = RecordType::from(self.u16(Part::Record)?);
        let class = RecordClass::from(self.u16(Part::Record)?);
        let ttl = self.u32(Part::Record)?;
        let rdlength = usize::from(self.u16(Part::Record)?);
        let rdata_end = self.position + rdlength;

        // names in RDATA are read in place, so pointers in them
        // resolve against the whole message
        let data = match rtype {
            RecordType::A => RecordData::A {
                address: Ipv4Addr::from(self.u32(Part::Record)?),
            },
            RecordType::NS => RecordData::NS {
                nsdname: self.name()?,
            },
            RecordType::CNAME => RecordData::CNAME { cname: self.name()? },
            RecordType::MX => RecordData::MX {
                preference: self.u16(Part::Record)?,
                exchange: self.name()?,
            },
            rtype => RecordData::Opaque {
                rtype,
                octets: Bytes::copy_from_slice(self.take(rdlength, Part::Record)?),
            },
        };

        if self.position != rdata_end {
            return Err(Error::RdataLengthMismatch { id: self.id });
        }

        Ok(WireRecord {
            name,
            data,
            class,
            ttl,
        })
    }

    /// # Errors
    ///
    /// If the name is truncated, too long, has an invalid label, or
    /// has a pointer which does not point backwards.
    pub fn name(&mut self) -> Result<DomainName, Error> {
        let start = self.position;
        let mut labels = Vec::<Label>::with_capacity(5);
        let mut len = 0;

        loop {
            let size = self.u8(Part::Name)?;

            if size & POINTER_TAG == POINTER_TAG {
                let lo = self.u8(Part::Name)?;
                let target = usize::from(u16::from_be_bytes([size & !POINTER_TAG, lo]));

                // a pointer must refer to an earlier name (RFC 1035
                // section 4.1.4), which also rules out loops
                if target >= start {
                    return Err(Error::BadPointer { id: self.id });
                }

                let mut earlier = Reader {
                    octets: self.octets,
                    position: target,
                    id: self.id,
                };
                labels.extend_from_slice(earlier.name()?.labels());
                break;
            }

            if usize::from(size) > LABEL_MAX_LEN {
                return Err(Error::BadLabel { id: self.id });
            }

            let octets = self.take(usize::from(size), Part::Name)?;
            let label = Label::try_from(octets).map_err(|_| Error::BadLabel { id: self.id })?;
            labels.push(label);

            if size == 0 {
                break;
            }

            len += 1 + octets.len();
            if len > DOMAINNAME_MAX_LEN {
                return Err(Error::NameTooLong { id: self.id });
            }
        }

        DomainName::from_labels(labels).ok_or(Error::NameTooLong { id: self.id })
    }

    fn u8(&mut self, part: Part) -> Result<u8, Error> {
        Ok(self.take(1, part)?[0])
    }

    fn u16(&mut self, part: Part) -> Result<u16, Error> {
        let octets = self.take(2, part)?;
        Ok(u16::from_be_bytes([octets[0], octets[1]]))
    }

    fn u32(&mut self, part: Part) -> Result<u32, Error> {
        let octets = self.take(4, part)?;
        Ok(u32::from_be_bytes([
            octets[0], octets[1], octets[2], octets[3],
        ]))
    }

    fn take(&mut self, size: usize, part: Part) -> Result<&'a [u8], Error> {
        let end = self.position + size;
        let octets = self
            .octets
            .get(self.position..end)
            .ok_or(Error::Truncated { id: self.id, part })?;
        self.position = end;
        Ok(octets)
    }
}

/// Which part of a message was being read when it ran out.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Part {
    Header,
    Question,
    Record,
    Name,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Part::Header => write!(f, "header"),
            Part::Question => write!(f, "question"),
            Part::Record => write!(f, "resource record"),
            Part::Name => write!(f, "domain name"),
        }
    }
}

/// Errors encountered when parsing a message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// Not even two octets, so there is no ID to answer to.
    NoId,
    Truncated { id: u16, part: Part },
    RdataLengthMismatch { id: u16 },
    NameTooLong { id: u16 },
    BadPointer { id: u16 },
    BadLabel { id: u16 },
}

impl Error {
    pub fn id(self) -> Option<u16> {
        match self {
            Error::NoId => None,
            Error::Truncated { id, .. }
            | Error::RdataLengthMismatch { id }
            | Error::NameTooLong { id }
            | Error::BadPointer { id }
            | Error::BadLabel { id } => Some(id),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoId => write!(f, "message too short to contain an ID"),
            Error::Truncated { part, .. } => write!(f, "{part} truncated"),
            Error::RdataLengthMismatch { .. } => write!(f, "RDATA does not match RDLENGTH"),
            Error::NameTooLong { .. } => write!(f, "domain name too long"),
            Error::BadPointer { .. } => write!(f, "compression pointer does not point backwards"),
            Error::BadLabel { .. } => write!(f, "domain name label invalid"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::test_util::*;
    use crate::test_util::domain;

    #[test]
    fn response_parses_back() {
        let query = Message::recursive_query(
            42,
            Question {
                name: domain("www.example.com."),
                qtype: RecordType::A,
                qclass: RecordClass::IN,
            },
        );
        let mut response = Message::reply_to(&query);
        response.answers = vec![
            wire_cname_record("www.example.com.", "web.example.net."),
            wire_a_record("web.example.net.", Ipv4Addr::new(192, 0, 2, 80)),
        ];
        response.authority = vec![wire_soa_record("example.net.")];
        response.additional = vec![
            wire_ns_record("example.net.", "ns.example.net."),
            wire_mx_record("example.net.", 10, "mail.example.net."),
        ];

        let octets = response.clone().to_octets().unwrap();

        assert_eq!(Ok(response), Message::from_octets(&octets));
    }

    #[test]
    fn expands_compression_pointers() {
        // "example.com." at offset 0, then "www" and a pointer back
        let octets = b"\x07example\x03com\x00\x03www\xc0\x00";
        let mut reader = Reader::new(octets);

        assert_eq!(Ok(domain("example.com.")), reader.name());
        assert_eq!(Ok(domain("www.example.com.")), reader.name());
    }

    #[test]
    fn rejects_pointers_to_themselves() {
        assert_eq!(
            Err(Error::BadPointer { id: 0 }),
            Reader::new(b"\xc0\x00").name()
        );
    }

    #[test]
    fn rejects_overlong_labels() {
        assert_eq!(Err(Error::BadLabel { id: 0 }), Reader::new(b"\x40").name());
    }

    #[test]
    fn rejects_short_header() {
        assert_eq!(Err(Error::NoId), Message::from_octets(&[1]));
        assert_eq!(
            Err(Error::Truncated {
                id: 0x0102,
                part: Part::Header
            }),
            Message::from_octets(&[1, 2, 3])
        );
    }

    #[test]
    fn rejects_missing_records() {
        let mut query = Message::recursive_query(
            9,
            Question {
                name: domain("example.com."),
                qtype: RecordType::MX,
                qclass: RecordClass::IN,
            },
        );
        query.answers = vec![wire_mx_record("example.com.", 10, "mx.example.com.")];
        let octets = query.to_octets().unwrap();

        assert_eq!(
            Some(9),
            Message::from_octets(&octets[..octets.len() - 3])
                .unwrap_err()
                .id()
        );
    }

    #[test]
    fn rejects_rdlength_mismatch() {
        let mut octets = b"\x00".to_vec();
        octets.extend_from_slice(&u16::from(RecordType::A).to_be_bytes());
        octets.extend_from_slice(&u16::from(RecordClass::IN).to_be_bytes());
        octets.extend_from_slice(&300u32.to_be_bytes());
        octets.extend_from_slice(&5u16.to_be_bytes());
        octets.extend_from_slice(&[192, 0, 2, 1, 0]);

        assert_eq!(
            Err(Error::RdataLengthMismatch { id: 0 }),
            Reader::new(&octets).record()
        );
    }

    #[test]
    fn keeps_unknown_rdata_opaque() {
        let mut octets = b"\x00".to_vec();
        octets.extend_from_slice(&99u16.to_be_bytes());
        octets.extend_from_slice(&u16::from(RecordClass::IN).to_be_bytes());
        octets.extend_from_slice(&60u32.to_be_bytes());
        octets.extend_from_slice(&3u16.to_be_bytes());
        octets.extend_from_slice(b"abc");

        let rr = Reader::new(&octets).record().unwrap();

        assert_eq!(
            RecordData::Opaque {
                rtype: RecordType::from(99),
                octets: Bytes::from_static(b"abc"),
            },
            rr.data
        );
        assert_eq!(60, rr.ttl);
    }
}
