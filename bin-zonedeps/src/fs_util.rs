use std::fmt;
use std::io;
use std::path::Path;
use tokio::fs::read_to_string;

use dns_types::names::{DomainName, InvalidDomainName};
use ip_asn::{AsnTable, LoadError};
use zone_resolver::cache::deserialise;
use zone_resolver::SharedCache;

/// Read a list of domain names, one per line.  Blank lines and lines
/// starting with `#` are ignored.
pub async fn domains_from_file<P: AsRef<Path>>(
    path: P,
) -> io::Result<Result<Vec<DomainName>, DomainsFileError>> {
    let data = read_to_string(path).await?;
    Ok(parse_domains(&data))
}

pub fn parse_domains(data: &str) -> Result<Vec<DomainName>, DomainsFileError> {
    let mut out = Vec::new();
    for (i, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match DomainName::from_dotted_string(line) {
            Ok(name) => out.push(name),
            Err(error) => return Err(DomainsFileError { line: i + 1, error }),
        }
    }
    Ok(out)
}

/// A bad name in a list of domain names.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DomainsFileError {
    pub line: usize,
    pub error: InvalidDomainName,
}

impl fmt::Display for DomainsFileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

impl std::error::Error for DomainsFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Read a cache snapshot.  A missing file is an empty cache.
pub async fn cache_from_file<P: AsRef<Path>>(
    path: P,
) -> io::Result<Result<SharedCache, deserialise::Error>> {
    match SharedCache::load_from_file(path).await {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Ok(SharedCache::new())),
        result => result,
    }
}

/// Read an IP-to-ASN table.
pub async fn asn_table_from_file<P: AsRef<Path>>(path: P) -> io::Result<Result<AsnTable, LoadError>> {
    AsnTable::load_from_file(path).await
}
