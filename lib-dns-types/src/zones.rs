use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;

use crate::failures::Failure;
use crate::names::DomainName;
use crate::paths::{APath, NSPath};

/// A delegated zone: the NS record (and the aliases followed to
/// reach it) and what became of each of its nameservers.
///
/// Zones are identified by name.  Other zones are referred to by
/// name too, never by reference.
#[derive(Debug, Clone)]
pub struct Zone {
    name: DomainName,
    name_resolution_path: NSPath,

    /// INVARIANT: each `queried_name` is distinct, is one of the NS
    /// record's values, and is not a key in `unresolved_nameservers`.
    nameservers: Vec<APath>,

    /// INVARIANT: each key is one of the NS record's values.
    unresolved_nameservers: BTreeMap<DomainName, Failure>,

    /// Names which are CNAMEs (possibly through other CNAMEs) for
    /// this zone's name.
    aliases: BTreeSet<DomainName>,
}

impl Zone {
    /// Build a zone, checking every nameserver named in the NS record
    /// is accounted for exactly once.
    ///
    /// # Errors
    ///
    /// If an NS value is not a domain name, or a nameserver is
    /// missing, duplicated, or not named in the NS record.
    pub fn new(
        name_resolution_path: NSPath,
        nameservers: Vec<APath>,
        unresolved_nameservers: BTreeMap<DomainName, Failure>,
    ) -> Result<Self, Error> {
        let values = name_resolution_path.terminal().values();
        let mut expected = BTreeSet::new();
        for value in values {
            let name = DomainName::from_dotted_string(value).map_err(|_| {
                Error::UnparsableNameserver {
                    value: value.clone(),
                }
            })?;
            expected.insert(name);
        }

        let mut seen = BTreeSet::new();
        for name in nameservers
            .iter()
            .map(APath::queried_name)
            .chain(unresolved_nameservers.keys())
        {
            if !expected.contains(name) {
                return Err(Error::UnexpectedNameserver { name: name.clone() });
            }
            if !seen.insert(name.clone()) {
                return Err(Error::DuplicateNameserver { name: name.clone() });
            }
        }
        if let Some(name) = expected.difference(&seen).next() {
            return Err(Error::MissingNameserver { name: name.clone() });
        }
        if seen.len() != values.len() {
            return Err(Error::NameserverCountMismatch {
                values: values.len(),
                accounted: seen.len(),
            });
        }

        Ok(Self {
            name: name_resolution_path.canonical_name().clone(),
            name_resolution_path,
            nameservers,
            unresolved_nameservers,
            aliases: BTreeSet::new(),
        })
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn name_resolution_path(&self) -> &NSPath {
        &self.name_resolution_path
    }

    pub fn nameservers(&self) -> &[APath] {
        &self.nameservers
    }

    pub fn unresolved_nameservers(&self) -> &BTreeMap<DomainName, Failure> {
        &self.unresolved_nameservers
    }

    pub fn aliases(&self) -> &BTreeSet<DomainName> {
        &self.aliases
    }

    /// Every nameserver hostname in the NS record, resolved or not.
    pub fn nameserver_names(&self) -> Vec<DomainName> {
        self.name_resolution_path.nameservers()
    }

    /// The hostnames of the nameservers which resolved.
    pub fn resolved_nameserver_names(&self) -> Vec<DomainName> {
        self.nameservers
            .iter()
            .map(|p| p.queried_name().clone())
            .collect()
    }

    /// Every (nameserver hostname, address) pair.
    pub fn nameserver_addresses(&self) -> Vec<(DomainName, Ipv4Addr)> {
        let mut out = Vec::new();
        for path in &self.nameservers {
            for address in path.addresses() {
                out.push((path.queried_name().clone(), address));
            }
        }
        out
    }

    /// Record a name which aliases this zone.  Returns `false` if it
    /// was already known.
    pub fn add_alias(&mut self, alias: DomainName) -> bool {
        if alias == self.name {
            return false;
        }
        self.aliases.insert(alias)
    }
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Zone {}

impl Hash for Zone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Errors that can arise when building a `Zone`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    UnexpectedNameserver { name: DomainName },
    DuplicateNameserver { name: DomainName },
    MissingNameserver { name: DomainName },
    UnparsableNameserver { value: String },
    /// Two NS values name the same host.
    NameserverCountMismatch { values: usize, accounted: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnexpectedNameserver { name } => {
                write!(f, "nameserver '{name}' is not in the zone's NS record")
            }
            Error::DuplicateNameserver { name } => {
                write!(f, "nameserver '{name}' is accounted for more than once")
            }
            Error::MissingNameserver { name } => {
                write!(f, "nameserver '{name}' is neither resolved nor unresolved")
            }
            Error::UnparsableNameserver { value } => {
                write!(f, "NS value '{value}' is not a domain name")
            }
            Error::NameserverCountMismatch { values, accounted } => write!(
                f,
                "NS record has {values} values but {accounted} nameservers are accounted for"
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
