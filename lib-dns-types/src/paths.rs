//! Resolution paths: zero or more CNAME hops followed by a terminal
//! record.
//!
//! ```text
//!     www.example.com.  CNAME  web.example.net.
//!     web.example.net.  CNAME  lb.example.org.
//!     lb.example.org.   A      192.0.2.10
//! ```
//!
//! Every hop's name is the previous hop's target.  Paths can only be
//! constructed through `PathBuilder`, which checks this as records
//! are added, so a `Path` is always valid.

use std::fmt;
use std::net::Ipv4Addr;

use crate::names::DomainName;
use crate::records::{RecordKind, ResourceRecord};

/// The validated records of a path, shared by all the path kinds.
///
/// INVARIANT: non-empty, every record but the last is a single-valued
/// positive CNAME, and each record's name is the previous record's
/// value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Chain {
    records: Vec<ResourceRecord>,
}

impl Chain {
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// The CNAME hops before the terminal record.
    pub fn aliases(&self) -> &[ResourceRecord] {
        &self.records[..self.records.len() - 1]
    }

    #[allow(clippy::missing_panics_doc)]
    pub fn terminal(&self) -> &ResourceRecord {
        // safe because of the non-empty invariant
        self.records.last().unwrap()
    }

    /// The name resolution started at.
    pub fn queried_name(&self) -> &DomainName {
        &self.records[0].name
    }

    /// The name of the terminal record.
    pub fn canonical_name(&self) -> &DomainName {
        &self.terminal().name
    }
}

macro_rules! path_kind {
    ($path:ident, $variant:ident) => {
        impl $path {
            pub fn chain(&self) -> &Chain {
                &self.0
            }

            pub fn records(&self) -> &[ResourceRecord] {
                self.0.records()
            }

            pub fn aliases(&self) -> &[ResourceRecord] {
                self.0.aliases()
            }

            pub fn terminal(&self) -> &ResourceRecord {
                self.0.terminal()
            }

            pub fn queried_name(&self) -> &DomainName {
                self.0.queried_name()
            }

            pub fn canonical_name(&self) -> &DomainName {
                self.0.canonical_name()
            }
        }

        impl From<$path> for Path {
            fn from(path: $path) -> Self {
                Path::$variant(path)
            }
        }

        impl TryFrom<Path> for $path {
            type Error = Path;

            fn try_from(path: Path) -> Result<Self, Self::Error> {
                match path {
                    Path::$variant(p) => Ok(p),
                    other => Err(other),
                }
            }
        }
    };
}

/// A path ending in an A record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct APath(Chain);

impl APath {
    pub fn addresses(&self) -> Vec<Ipv4Addr> {
        self.terminal().addresses()
    }
}

/// A path ending in an NS record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NSPath(Chain);

impl NSPath {
    pub fn nameservers(&self) -> Vec<DomainName> {
        self.terminal().target_names()
    }
}

/// A path ending in an MX record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MXPath(Chain);

impl MXPath {
    pub fn exchanges(&self) -> Vec<DomainName> {
        self.terminal().target_names()
    }
}

/// A path ending in a CNAME whose target has not been resolved.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CNAMEPath(Chain);

impl CNAMEPath {
    pub fn target(&self) -> Option<DomainName> {
        self.terminal()
            .single_value()
            .and_then(|v| DomainName::from_dotted_string(v).ok())
    }
}

path_kind!(APath, A);
path_kind!(NSPath, NS);
path_kind!(MXPath, MX);
path_kind!(CNAMEPath, CNAME);

/// A validated path of any kind.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Path {
    A(APath),
    NS(NSPath),
    MX(MXPath),
    CNAME(CNAMEPath),
}

impl Path {
    pub fn chain(&self) -> &Chain {
        match self {
            Path::A(p) => p.chain(),
            Path::NS(p) => p.chain(),
            Path::MX(p) => p.chain(),
            Path::CNAME(p) => p.chain(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Path::A(_) => RecordKind::A,
            Path::NS(_) => RecordKind::NS,
            Path::MX(_) => RecordKind::MX,
            Path::CNAME(_) => RecordKind::CNAME,
        }
    }

    pub fn terminal(&self) -> &ResourceRecord {
        self.chain().terminal()
    }

    pub fn aliases(&self) -> &[ResourceRecord] {
        self.chain().aliases()
    }
}

/// Builds a `Path` one record at a time, checking each link.
///
/// ```
/// # use dns_types::names::DomainName;
/// # use dns_types::paths::{Path, PathBuilder};
/// # use dns_types::records::{RecordKind, ResourceRecord};
/// # use std::net::Ipv4Addr;
/// let www = DomainName::from_dotted_string("www.example.com.").unwrap();
/// let web = DomainName::from_dotted_string("web.example.net.").unwrap();
///
/// let path = PathBuilder::new()
///     .add_alias(ResourceRecord::with_names(www, RecordKind::CNAME, &[web.clone()]))?
///     .complete_resolution(ResourceRecord::with_addresses(web, &[Ipv4Addr::LOCALHOST]))?
///     .build()?;
///
/// assert!(matches!(path, Path::A(_)));
/// # Ok::<(), dns_types::paths::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    aliases: Vec<ResourceRecord>,
    terminal: Option<ResourceRecord>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a CNAME hop.
    ///
    /// # Errors
    ///
    /// If the path is already complete, if the record is not a
    /// single-valued positive CNAME, if it does not continue from the
    /// previous hop, or if its target is a name already on the path.
    pub fn add_alias(mut self, record: ResourceRecord) -> Result<Self, Error> {
        if self.terminal.is_some() {
            return Err(Error::AlreadyComplete);
        }
        if record.kind != RecordKind::CNAME {
            return Err(Error::NotAnAlias {
                name: record.name,
                kind: record.kind,
            });
        }
        check_record(&record)?;
        if let Some(previous) = self.aliases.last() {
            check_link(previous, &record)?;
        }
        if let Some(target) = record.target_names().first() {
            if *target == record.name || self.aliases.iter().any(|alias| alias.name == *target) {
                return Err(Error::AliasLoop {
                    name: target.clone(),
                });
            }
        }

        self.aliases.push(record);
        Ok(self)
    }

    /// Append the terminal record.  A CNAME terminal gives a
    /// `CNAMEPath`.
    ///
    /// # Errors
    ///
    /// If the path is already complete, if the record is negative,
    /// or if it does not continue from the last hop.
    pub fn complete_resolution(mut self, record: ResourceRecord) -> Result<Self, Error> {
        if self.terminal.is_some() {
            return Err(Error::AlreadyComplete);
        }
        check_record(&record)?;
        if let Some(previous) = self.aliases.last() {
            check_link(previous, &record)?;
        }

        self.terminal = Some(record);
        Ok(self)
    }

    /// The hops added so far.
    pub fn aliases(&self) -> &[ResourceRecord] {
        &self.aliases
    }

    /// # Errors
    ///
    /// If there is no terminal record.
    pub fn build(self) -> Result<Path, Error> {
        let terminal = self.terminal.ok_or(Error::Incomplete)?;
        let kind = terminal.kind;

        let mut records = self.aliases;
        records.push(terminal);
        let chain = Chain { records };

        Ok(match kind {
            RecordKind::A => Path::A(APath(chain)),
            RecordKind::NS => Path::NS(NSPath(chain)),
            RecordKind::MX => Path::MX(MXPath(chain)),
            RecordKind::CNAME => Path::CNAME(CNAMEPath(chain)),
        })
    }
}

/// Checks which apply to every record in a path.
fn check_record(record: &ResourceRecord) -> Result<(), Error> {
    if record.is_negative() {
        return Err(Error::NegativeRecord {
            name: record.name.clone(),
            kind: record.kind,
        });
    }
    if record.kind == RecordKind::CNAME && record.single_value().is_none() {
        return Err(Error::AmbiguousAlias {
            name: record.name.clone(),
        });
    }
    Ok(())
}

/// Check `next` continues from the alias `previous`.
fn check_link(previous: &ResourceRecord, next: &ResourceRecord) -> Result<(), Error> {
    let expected = previous
        .single_value()
        .and_then(|v| DomainName::from_dotted_string(v).ok());

    match expected {
        Some(target) if target == next.name => Ok(()),
        _ => Err(Error::ChainIntegrityViolation {
            expected: previous.single_value().unwrap_or_default().to_string(),
            found: next.name.clone(),
        }),
    }
}

/// Errors that can arise when building a `Path`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// A record's name is not the previous hop's target.
    ChainIntegrityViolation { expected: String, found: DomainName },

    /// A record other than the terminal one is not a CNAME.
    NotAnAlias { name: DomainName, kind: RecordKind },

    /// A CNAME does not have exactly one target.
    AmbiguousAlias { name: DomainName },

    /// A CNAME leads back to a name earlier in the path.
    AliasLoop { name: DomainName },

    /// Paths only hold positive observations.
    NegativeRecord { name: DomainName, kind: RecordKind },

    /// A record was added after the terminal record.
    AlreadyComplete,

    /// `build` was called without a terminal record.
    Incomplete,
}

impl Error {
    /// Whether the records themselves are unusable, as opposed to
    /// having been put together in the wrong order.
    pub fn is_bad_data(&self) -> bool {
        matches!(self, Error::AmbiguousAlias { .. } | Error::AliasLoop { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ChainIntegrityViolation { expected, found } => write!(
                f,
                "chain integrity violation: expected a record for '{expected}', got '{found}'"
            ),
            Error::NotAnAlias { name, kind } => {
                write!(f, "{name} {kind} is not an alias, but is not the last record")
            }
            Error::AmbiguousAlias { name } => {
                write!(f, "{name} CNAME does not have exactly one target")
            }
            Error::AliasLoop { name } => write!(f, "alias chain loops back to {name}"),
            Error::NegativeRecord { name, kind } => {
                write!(f, "{name} {kind} is a negative observation")
            }
            Error::AlreadyComplete => write!(f, "path already has a terminal record"),
            Error::Incomplete => write!(f, "path has no terminal record"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
