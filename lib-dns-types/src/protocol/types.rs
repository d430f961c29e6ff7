//! Just enough of the DNS wire format to ask a recursive resolver
//! about A, CNAME, NS, and MX records and to read its answer.  See
//! section 4 of RFC 1035.
//!
//! ```text
//!     +---------------------+
//!     |        Header       |  id, flags, and four section counts
//!     +---------------------+
//!     |       Question      |
//!     +---------------------+
//!     |        Answer       |
//!     +---------------------+
//!     |      Authority      |
//!     +---------------------+
//!     |      Additional     |
//!     +---------------------+
//! ```

use bytes::Bytes;
use std::fmt;
use std::net::Ipv4Addr;

pub use crate::names::{DomainName, Label, DOMAINNAME_MAX_LEN, LABEL_MAX_LEN};

/// Size of the fixed header, in octets.
pub const HEADER_LEN: usize = 12;

/// A whole message.  The section counts are not stored: they are
/// computed when serialising.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<WireRecord>,
    pub authority: Vec<WireRecord>,
    pub additional: Vec<WireRecord>,
}

impl Message {
    /// A standard query with the recursion-desired flag set: the
    /// zone walker only ever talks to a recursive resolver.
    pub fn recursive_query(id: u16, question: Question) -> Self {
        let mut flags = Flags::default();
        flags.set_recursion_desired(true);

        Self {
            header: Header { id, flags },
            questions: vec![question],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// An empty, successful, reply to `query`, as a recursive
    /// resolver would send it.
    pub fn reply_to(query: &Message) -> Self {
        let mut flags = query.header.flags;
        flags.set_response(true);
        flags.set_truncated(false);
        flags.set_recursion_available(true);
        flags.set_rcode(Rcode::NOERROR);

        Self {
            header: Header {
                id: query.header.id,
                flags,
            },
            questions: query.questions.clone(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
}

/// The second 16 bits of the header, kept packed exactly as they are
/// on the wire.
///
/// ```text
///       0  1  2  3  4  5  6  7  8  9 10 11 12 13 14 15
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Flags(u16);

impl Flags {
    pub const QR: u16 = 0b1000_0000_0000_0000;
    pub const OPCODE: u16 = 0b0111_1000_0000_0000;
    pub const AA: u16 = 0b0000_0100_0000_0000;
    pub const TC: u16 = 0b0000_0010_0000_0000;
    pub const RD: u16 = 0b0000_0001_0000_0000;
    pub const RA: u16 = 0b0000_0000_1000_0000;
    pub const RCODE: u16 = 0b0000_0000_0000_1111;

    const OPCODE_SHIFT: u32 = Self::OPCODE.trailing_zeros();

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_response(self) -> bool {
        self.0 & Self::QR != 0
    }

    pub fn is_authoritative(self) -> bool {
        self.0 & Self::AA != 0
    }

    pub fn is_truncated(self) -> bool {
        self.0 & Self::TC != 0
    }

    pub fn recursion_desired(self) -> bool {
        self.0 & Self::RD != 0
    }

    pub fn recursion_available(self) -> bool {
        self.0 & Self::RA != 0
    }

    pub fn opcode(self) -> Opcode {
        Opcode((self.0 & Self::OPCODE) >> Self::OPCODE_SHIFT)
    }

    pub fn rcode(self) -> Rcode {
        Rcode(self.0 & Self::RCODE)
    }

    pub fn set_response(&mut self, on: bool) {
        self.set(Self::QR, on);
    }

    pub fn set_truncated(&mut self, on: bool) {
        self.set(Self::TC, on);
    }

    pub fn set_recursion_desired(&mut self, on: bool) {
        self.set(Self::RD, on);
    }

    pub fn set_recursion_available(&mut self, on: bool) {
        self.set(Self::RA, on);
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.0 = (self.0 & !Self::OPCODE) | ((opcode.0 << Self::OPCODE_SHIFT) & Self::OPCODE);
    }

    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.0 = (self.0 & !Self::RCODE) | (rcode.0 & Self::RCODE);
    }

    fn set(&mut self, mask: u16, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

/// A single question.  Only the `IN` class is asked about, but others
/// are tolerated in responses.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

/// A record in the answer, authority, or additional section.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct WireRecord {
    pub name: DomainName,
    pub data: RecordData,
    pub class: RecordClass,
    pub ttl: u32,
}

impl WireRecord {
    /// An `IN` record with a five minute TTL.
    pub fn new(name: DomainName, data: RecordData) -> Self {
        Self {
            name,
            data,
            class: RecordClass::IN,
            ttl: 300,
        }
    }

    pub fn rtype(&self) -> RecordType {
        self.data.rtype()
    }
}

/// Decoded RDATA.  Only the types the walker asks about are decoded
/// (so that compression pointers in them are expanded), everything
/// else is carried as opaque octets.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RecordData {
    A { address: Ipv4Addr },
    NS { nsdname: DomainName },
    CNAME { cname: DomainName },
    MX { preference: u16, exchange: DomainName },
    Opaque { rtype: RecordType, octets: Bytes },
}

impl RecordData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordData::A { .. } => RecordType::A,
            RecordData::NS { .. } => RecordType::NS,
            RecordData::CNAME { .. } => RecordType::CNAME,
            RecordData::MX { .. } => RecordType::MX,
            RecordData::Opaque { rtype, .. } => *rtype,
        }
    }
}

/// Defines a newtype over a wire integer, with a named constant per
/// well-known value.  Unknown values are representable, and display as
/// the given prefix followed by the number.
macro_rules! wire_code {
    ( $(#[$attr:meta])* $name:ident($int:ty), $prefix:literal;
      $( ($variant:ident => $value:expr, $mnemonic:literal) )* ) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name($int);

        impl $name {
            $( pub const $variant: $name = $name($value); )*

            pub fn mnemonic(self) -> Option<&'static str> {
                match self {
                    $( $name::$variant => Some($mnemonic), )*
                    _ => None,
                }
            }
        }

        impl From<$int> for $name {
            fn from(value: $int) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $int {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match self.mnemonic() {
                    Some(mnemonic) => f.write_str(mnemonic),
                    None => write!(f, "{}{}", $prefix, self.0),
                }
            }
        }
    };
}

wire_code! {
    /// What sort of query this is.  A 4-bit field.
    Opcode(u16), "OPCODE";
    (QUERY => 0, "QUERY")
    (IQUERY => 1, "IQUERY")
    (STATUS => 2, "STATUS")
}

wire_code! {
    /// What sort of response this is.  A 4-bit field.
    Rcode(u16), "RCODE";
    (NOERROR => 0, "NOERROR")
    (FORMERR => 1, "FORMERR")
    (SERVFAIL => 2, "SERVFAIL")
    (NXDOMAIN => 3, "NXDOMAIN")
    (NOTIMP => 4, "NOTIMP")
    (REFUSED => 5, "REFUSED")
}

wire_code! {
    /// Record types, as used by records and by questions.
    RecordType(u16), "TYPE";
    (A => 1, "A")
    (NS => 2, "NS")
    (CNAME => 5, "CNAME")
    (SOA => 6, "SOA")
    (MX => 15, "MX")
    (AAAA => 28, "AAAA")
}

wire_code! {
    /// Record classes.  Only `IN` is interesting.
    RecordClass(u16), "CLASS";
    (IN => 1, "IN")
}


#[cfg(any(feature = "test-util", test))]
#[allow(clippy::missing_panics_doc)]
pub mod test_util {
    use super::*;
    use crate::test_util::domain;

    pub fn wire_a_record(name: &str, address: Ipv4Addr) -> WireRecord {
        WireRecord::new(domain(name), RecordData::A { address })
    }

    pub fn wire_cname_record(name: &str, target_name: &str) -> WireRecord {
        WireRecord::new(
            domain(name),
            RecordData::CNAME {
                cname: domain(target_name),
            },
        )
    }

    pub fn wire_ns_record(superdomain_name: &str, nameserver_name: &str) -> WireRecord {
        WireRecord::new(
            domain(superdomain_name),
            RecordData::NS {
                nsdname: domain(nameserver_name),
            },
        )
    }

    pub fn wire_mx_record(name: &str, preference: u16, exchange_name: &str) -> WireRecord {
        WireRecord::new(
            domain(name),
            RecordData::MX {
                preference,
                exchange: domain(exchange_name),
            },
        )
    }

    /// An SOA, as a negative answer carries in its authority section.
    /// Its RDATA is never decoded.
    pub fn wire_soa_record(name: &str) -> WireRecord {
        let mut octets = b"\x05mname\x00\x05rname\x00".to_vec();
        for field in 1u32..=5 {
            octets.extend_from_slice(&field.to_be_bytes());
        }

        WireRecord::new(
            domain(name),
            RecordData::Opaque {
                rtype: RecordType::SOA,
                octets: Bytes::from(octets),
            },
        )
    }
}
