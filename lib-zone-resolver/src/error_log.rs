//! The error log: one line per name which could not be resolved, with
//! why.

use std::fmt;
use std::io;
use std::path::Path;
use tokio::fs::write;

use dns_types::failures::{Failure, FailureKind};
use dns_types::names::DomainName;

/// A name the walker could not resolve, and why.
///
/// Entries order by name, then by kind, so a sorted log is
/// deterministic for the same set of failures.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ErrorLogEntry {
    pub name: DomainName,
    pub kind: FailureKind,
    pub message: String,
}

impl ErrorLogEntry {
    pub fn new(name: DomainName, failure: Failure) -> Self {
        Self {
            name,
            kind: failure.kind,
            message: failure.message,
        }
    }
}

impl fmt::Display for ErrorLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = self.message.replace(['\t', '\n', '\r'], " ");
        write!(f, "{}\t{}\t{message}", self.name, self.kind)
    }
}

/// Render a log, one entry per line.
pub fn serialise(entries: &[ErrorLogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

/// Write a log to a file, replacing whatever was there.
pub async fn write_to_file<P: AsRef<Path>>(path: P, entries: &[ErrorLogEntry]) -> io::Result<()> {
    write(path, serialise(entries)).await
}
