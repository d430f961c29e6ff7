//! Resource records as observed by the zone walker: a name, a kind,
//! and either the values of an answer or a negative observation.
//!
//! These are deliberately simpler than the wire-format records in
//! `protocol::types`: no TTL, no class, and the data is kept as
//! strings, so a snapshot can be written and read back exactly.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::failures::{Failure, FailureKind};
use crate::names::DomainName;
use crate::protocol::types::RecordType;

/// The record types the zone walker asks about.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordKind {
    A,
    CNAME,
    NS,
    MX,
}

impl RecordKind {
    /// True for kinds whose values are domain names.
    pub fn is_name_valued(self) -> bool {
        self != RecordKind::A
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordKind::A => write!(f, "A"),
            RecordKind::CNAME => write!(f, "CNAME"),
            RecordKind::NS => write!(f, "NS"),
            RecordKind::MX => write!(f, "MX"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = RecordKindFromStr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordKind::A),
            "CNAME" => Ok(RecordKind::CNAME),
            "NS" => Ok(RecordKind::NS),
            "MX" => Ok(RecordKind::MX),
            _ => Err(RecordKindFromStr::NoParse),
        }
    }
}

/// Errors that can arise when converting a `&str` into a
/// `RecordKind`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordKindFromStr {
    NoParse,
}

impl fmt::Display for RecordKindFromStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "could not parse string to record kind (expected A, CNAME, NS, or MX)")
    }
}

impl std::error::Error for RecordKindFromStr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<RecordKind> for RecordType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::A => RecordType::A,
            RecordKind::CNAME => RecordType::CNAME,
            RecordKind::NS => RecordType::NS,
            RecordKind::MX => RecordType::MX,
        }
    }
}

impl TryFrom<RecordType> for RecordKind {
    type Error = RecordType;

    fn try_from(rtype: RecordType) -> Result<Self, Self::Error> {
        match rtype {
            RecordType::A => Ok(RecordKind::A),
            RecordType::CNAME => Ok(RecordKind::CNAME),
            RecordType::NS => Ok(RecordKind::NS),
            RecordType::MX => Ok(RecordKind::MX),
            other => Err(other),
        }
    }
}

/// What was observed for a (name, kind) pair.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RecordValues {
    /// A positive answer.  INVARIANT: non-empty and duplicate-free.
    Answer(Vec<String>),

    /// The name exists, but has no records of this kind.
    NoAnswer,

    /// The name does not exist.
    NonExistent,
}

/// A single observation.
///
/// Two records are equal if they have the same name and kind: the
/// values are not compared.  Use `same_observation` to compare
/// everything.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub kind: RecordKind,
    pub values: RecordValues,
}

impl ResourceRecord {
    /// A positive record.  Duplicate values are dropped, keeping the
    /// first occurrence.  An empty list of values is a `NoAnswer`.
    pub fn new(name: DomainName, kind: RecordKind, values: Vec<String>) -> Self {
        let mut seen = HashSet::with_capacity(values.len());
        let mut deduped = Vec::with_capacity(values.len());
        for value in values {
            if seen.insert(value.clone()) {
                deduped.push(value);
            }
        }

        let values = if deduped.is_empty() {
            RecordValues::NoAnswer
        } else {
            RecordValues::Answer(deduped)
        };

        Self { name, kind, values }
    }

    pub fn with_addresses(name: DomainName, addresses: &[Ipv4Addr]) -> Self {
        Self::new(
            name,
            RecordKind::A,
            addresses.iter().map(ToString::to_string).collect(),
        )
    }

    pub fn with_names(name: DomainName, kind: RecordKind, targets: &[DomainName]) -> Self {
        Self::new(
            name,
            kind,
            targets.iter().map(DomainName::to_dotted_string).collect(),
        )
    }

    pub fn no_answer(name: DomainName, kind: RecordKind) -> Self {
        Self {
            name,
            kind,
            values: RecordValues::NoAnswer,
        }
    }

    pub fn non_existent(name: DomainName, kind: RecordKind) -> Self {
        Self {
            name,
            kind,
            values: RecordValues::NonExistent,
        }
    }

    pub fn is_negative(&self) -> bool {
        !matches!(self.values, RecordValues::Answer(_))
    }

    /// The failure a negative record stands for.
    pub fn failure(&self) -> Option<Failure> {
        match self.values {
            RecordValues::Answer(_) => None,
            RecordValues::NoAnswer => Some(Failure::no_answer(format!(
                "{} has no {} records",
                self.name, self.kind
            ))),
            RecordValues::NonExistent => Some(Failure::domain_non_existent(format!(
                "{} does not exist",
                self.name
            ))),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.values {
            RecordValues::Answer(_) => None,
            RecordValues::NoAnswer => Some(FailureKind::NoAnswer),
            RecordValues::NonExistent => Some(FailureKind::DomainNonExistent),
        }
    }

    /// The values of a positive record, empty for a negative one.
    pub fn values(&self) -> &[String] {
        match &self.values {
            RecordValues::Answer(values) => values,
            _ => &[],
        }
    }

    /// The value, if there is exactly one.
    pub fn single_value(&self) -> Option<&str> {
        match self.values() {
            [value] => Some(value),
            _ => None,
        }
    }

    /// The values parsed as domain names, skipping any which don't
    /// parse.
    pub fn target_names(&self) -> Vec<DomainName> {
        self.values()
            .iter()
            .filter_map(|v| DomainName::from_dotted_string(v).ok())
            .collect()
    }

    /// The values parsed as addresses, skipping any which don't
    /// parse.
    pub fn addresses(&self) -> Vec<Ipv4Addr> {
        self.values()
            .iter()
            .filter_map(|v| Ipv4Addr::from_str(v).ok())
            .collect()
    }

    /// Compare name, kind, and values.
    pub fn same_observation(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind && self.values == other.values
    }
}

impl PartialEq for ResourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for ResourceRecord {}

impl Hash for ResourceRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.values {
            RecordValues::Answer(values) => {
                write!(f, "{}\t{}\t{}", self.name, self.kind, values.join(" "))
            }
            RecordValues::NoAnswer => write!(f, "{}\t{}\t; no answer", self.name, self.kind),
            RecordValues::NonExistent => {
                write!(f, "{}\t{}\t; does not exist", self.name, self.kind)
            }
        }
    }
}
