//! A table of IPv4 ranges and the autonomous systems which announce
//! them.
//!
//! The dataset is tab-separated, one range per line, sorted by start
//! address:
//!
//! ```text
//! start_ip	end_ip	as_number	country_code	as_description
//! ```
//!
//! Rows are only parsed when a lookup touches them, and each row is
//! parsed at most once.  The binary search only reads the start
//! address of the rows it passes through.

use ipnetwork::Ipv4Network;
use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use tokio::fs::read_to_string;

use crate::network::{get_network_of_ip, EntryNetworks};

/// Number of columns in a row.
pub const FIELD_COUNT: usize = 5;

/// Once the binary search has narrowed the candidates to this many
/// rows, they are scanned in order.
const SCAN_WINDOW: usize = 4;

/// One row of the table.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct AsEntry {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub as_number: u32,
    pub country_code: String,
    pub description: String,
}

impl AsEntry {
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.start <= ip && ip <= self.end
    }
}

impl fmt::Display for AsEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "AS{} ({}) {}-{} {}",
            self.as_number, self.country_code, self.start, self.end, self.description
        )
    }
}

impl FromStr for AsEntry {
    type Err = AsEntryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split('\t').collect::<Vec<_>>();
        let [start, end, as_number, country_code, description] = fields.as_slice() else {
            return Err(AsEntryParseError::WrongFieldCount {
                count: fields.len(),
            });
        };

        let start = Ipv4Addr::from_str(start).map_err(|_| AsEntryParseError::BadStartAddress)?;
        let end = Ipv4Addr::from_str(end).map_err(|_| AsEntryParseError::BadEndAddress)?;
        if start > end {
            return Err(AsEntryParseError::BackwardsRange);
        }

        Ok(Self {
            start,
            end,
            as_number: as_number
                .trim()
                .parse()
                .map_err(|_| AsEntryParseError::BadAsNumber)?,
            country_code: (*country_code).to_string(),
            description: description.trim_end().to_string(),
        })
    }
}

/// Why a row could not be parsed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AsEntryParseError {
    WrongFieldCount { count: usize },
    BadStartAddress,
    BadEndAddress,
    BackwardsRange,
    BadAsNumber,
}

impl fmt::Display for AsEntryParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AsEntryParseError::WrongFieldCount { count } => {
                write!(f, "expected {FIELD_COUNT} tab-separated fields, found {count}")
            }
            AsEntryParseError::BadStartAddress => write!(f, "bad start address"),
            AsEntryParseError::BadEndAddress => write!(f, "bad end address"),
            AsEntryParseError::BackwardsRange => write!(f, "end address is before start address"),
            AsEntryParseError::BadAsNumber => write!(f, "bad AS number"),
        }
    }
}

impl std::error::Error for AsEntryParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[derive(Debug)]
struct Row {
    line: usize,
    raw: String,
    parsed: OnceLock<Result<AsEntry, AsEntryParseError>>,
}

impl Row {
    fn entry(&self) -> Result<&AsEntry, LookupError> {
        self.parsed
            .get_or_init(|| {
                self.raw.parse().map_err(|error| {
                    tracing::warn!(line = self.line, %error, "malformed ASN table row");
                    error
                })
            })
            .as_ref()
            .map_err(|reason| LookupError::MalformedDataset {
                line: self.line,
                reason: *reason,
            })
    }

    /// The start address, reading only the first column unless the
    /// row has already been parsed.
    fn start(&self) -> Result<Ipv4Addr, LookupError> {
        if let Some(Ok(entry)) = self.parsed.get() {
            return Ok(entry.start);
        }

        self.raw
            .split('\t')
            .next()
            .and_then(|start| Ipv4Addr::from_str(start).ok())
            .ok_or(LookupError::MalformedDataset {
                line: self.line,
                reason: AsEntryParseError::BadStartAddress,
            })
    }
}

/// A loaded table.
#[derive(Debug, Default)]
pub struct AsnTable {
    rows: Vec<Row>,
}

impl AsnTable {
    /// Load a table from its text form.  Only the column count of
    /// each row is checked here; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// If any non-blank line does not have exactly five columns.
    pub fn deserialise(data: &str) -> Result<Self, LoadError> {
        let mut rows = Vec::new();
        for (i, line) in data.lines().enumerate() {
            let line_number = i + 1;
            if line.trim().is_empty() {
                continue;
            }

            let count = line.split('\t').count();
            if count != FIELD_COUNT {
                return Err(LoadError::WrongFieldCount {
                    line: line_number,
                    count,
                });
            }

            rows.push(Row {
                line: line_number,
                raw: line.trim_end_matches('\r').to_string(),
                parsed: OnceLock::new(),
            });
        }

        tracing::debug!(rows = rows.len(), "loaded ASN table");
        Ok(Self { rows })
    }

    /// Read a table from a file.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Result<Self, LoadError>> {
        let data = read_to_string(path).await?;
        Ok(Self::deserialise(&data))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row whose range contains `ip`.
    ///
    /// # Errors
    ///
    /// If no row contains `ip`, if the row which does is marked as not
    /// routed (AS 0), or if the row which could contain `ip` cannot be
    /// parsed.  A row the search only passes through is malformed only
    /// if its start address is.
    pub fn resolve_range(&self, ip: Ipv4Addr) -> Result<&AsEntry, LookupError> {
        // INVARIANT: the last row starting at or before `ip`, if
        // there is one, is in `lo..hi`
        let mut lo = 0;
        let mut hi = self.rows.len();
        while hi - lo > SCAN_WINDOW {
            let mid = lo + (hi - lo) / 2;
            if self.rows[mid].start()? <= ip {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let mut matched = None;
        for row in &self.rows[lo..hi] {
            if row.start()? > ip {
                break;
            }
            matched = Some(row);
        }

        let Some(row) = matched else {
            return Err(LookupError::AutonomousSystemNotFound { ip });
        };
        let entry = row.entry()?;
        if !entry.contains(ip) {
            return Err(LookupError::AutonomousSystemNotFound { ip });
        }
        if entry.as_number == 0 {
            tracing::trace!(%ip, line = row.line, "address is not routed");
            return Err(LookupError::AutonomousSystemNotFound { ip });
        }

        Ok(entry)
    }

    /// Find the row containing `ip`, the CIDR blocks covering that
    /// row's range, and the block which contains `ip`.
    pub fn annotate(&self, ip: Ipv4Addr) -> Result<Annotation<'_>, LookupError> {
        let entry = self.resolve_range(ip)?;
        let EntryNetworks { network, summary } = get_network_of_ip(entry, ip)?;
        Ok(Annotation {
            ip,
            entry,
            network,
            summary,
        })
    }
}

/// An address with its autonomous system and network.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Annotation<'a> {
    pub ip: Ipv4Addr,
    pub entry: &'a AsEntry,
    /// The block of `summary` containing `ip`.
    pub network: Ipv4Network,
    /// Every block of the entry's range.
    pub summary: Vec<Ipv4Network>,
}

impl fmt::Display for Annotation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} AS{} {} {} {}",
            self.ip,
            self.entry.as_number,
            self.network,
            self.entry.country_code,
            self.entry.description
        )
    }
}

/// Errors that can arise when loading a table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LoadError {
    WrongFieldCount { line: usize, count: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::WrongFieldCount { line, count } => write!(
                f,
                "line {line}: expected {FIELD_COUNT} tab-separated fields, found {count}"
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Errors that can arise when looking up an address.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LookupError {
    AutonomousSystemNotFound { ip: Ipv4Addr },
    NetworkNotFound { ip: Ipv4Addr },
    MalformedDataset { line: usize, reason: AsEntryParseError },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LookupError::AutonomousSystemNotFound { ip } => {
                write!(f, "no autonomous system announces {ip}")
            }
            LookupError::NetworkNotFound { ip } => {
                write!(f, "{ip} is not in any network of its range")
            }
            LookupError::MalformedDataset { line, reason } => {
                write!(f, "line {line} of the ASN table cannot be parsed: {reason}")
            }
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
