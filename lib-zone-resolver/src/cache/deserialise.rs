//! Reading a snapshot written by `Cache::serialise`.

use std::fmt;

use dns_types::names::DomainName;
use dns_types::records::{RecordKind, ResourceRecord};

use super::serialise::{NOANSWER_SENTINEL, NXDOMAIN_SENTINEL};
use super::Cache;

impl Cache {
    /// Parse a snapshot.  Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// If any line cannot be parsed.
    pub fn deserialise(data: &str) -> Result<Self, Error> {
        let mut cache = Self::new();
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            cache.add_entry(parse_line(i + 1, line)?);
        }
        Ok(cache)
    }
}

/// Parse a single line.
fn parse_line(line_number: usize, line: &str) -> Result<ResourceRecord, Error> {
    let fields = line.split('\t').collect::<Vec<_>>();
    let (name_field, kind_field, values_field) = match fields.as_slice() {
        [name, kind, values] => (*name, *kind, *values),
        _ => {
            return Err(Error::WrongFieldCount {
                line: line_number,
                count: fields.len(),
            })
        }
    };

    let name = unescape(line_number, name_field)
        .and_then(|n| {
            DomainName::from_dotted_string(&n).map_err(|_| Error::BadName {
                line: line_number,
                name: name_field.into(),
            })
        })?;

    let kind = kind_field.parse::<RecordKind>().map_err(|_| Error::BadKind {
        line: line_number,
        kind: kind_field.into(),
    })?;

    let Some(inner) = values_field
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
    else {
        return Err(Error::BadValues {
            line: line_number,
            values: values_field.into(),
        });
    };

    match inner {
        NXDOMAIN_SENTINEL => Ok(ResourceRecord::non_existent(name, kind)),
        NOANSWER_SENTINEL => Ok(ResourceRecord::no_answer(name, kind)),
        _ => {
            let mut values = Vec::new();
            for value in inner.split(',') {
                let value = unescape(line_number, value)?;
                if kind.is_name_valued() && DomainName::from_dotted_string(&value).is_err() {
                    return Err(Error::BadValues {
                        line: line_number,
                        values: values_field.into(),
                    });
                }
                values.push(value);
            }
            Ok(ResourceRecord::new(name, kind, values))
        }
    }
}

/// Undo `serialise::escape`.
fn unescape(line_number: usize, field: &str) -> Result<String, Error> {
    let bad_escape = || Error::BadEscape {
        line: line_number,
        field: field.into(),
    };

    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let mut code = 0u32;
            for _ in 0..3 {
                let digit = chars.next().and_then(|d| d.to_digit(10)).ok_or_else(bad_escape)?;
                code = code * 10 + digit;
            }
            out.push(char::from_u32(code).ok_or_else(bad_escape)?);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// An error that can occur reading a cache snapshot.  Line numbers
/// start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    WrongFieldCount { line: usize, count: usize },
    BadName { line: usize, name: String },
    BadKind { line: usize, kind: String },
    BadValues { line: usize, values: String },
    BadEscape { line: usize, field: String },
}

impl Error {
    pub fn line(&self) -> usize {
        match self {
            Error::WrongFieldCount { line, .. }
            | Error::BadName { line, .. }
            | Error::BadKind { line, .. }
            | Error::BadValues { line, .. }
            | Error::BadEscape { line, .. } => *line,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::WrongFieldCount { line, count } => {
                write!(f, "line {line}: expected 3 tab-separated fields, got {count}")
            }
            Error::BadName { line, name } => write!(f, "line {line}: bad domain name '{name}'"),
            Error::BadKind { line, kind } => write!(f, "line {line}: bad record type '{kind}'"),
            Error::BadValues { line, values } => write!(
                f,
                "line {line}: values '{values}' are not a bracketed list of valid values"
            ),
            Error::BadEscape { line, field } => {
                write!(f, "line {line}: bad escape sequence in '{field}'")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
