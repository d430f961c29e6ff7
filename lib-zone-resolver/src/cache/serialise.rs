//! Writing the cache out as a snapshot.
//!
//! One observation per line, in the order they were made:
//!
//! ```text
//! www.example.com.<TAB>CNAME<TAB>[web.example.net.]
//! web.example.net.<TAB>A<TAB>[192.0.2.1,192.0.2.2]
//! gone.example.org.<TAB>NS<TAB>[NXDomain]
//! example.net.<TAB>MX<TAB>[NoAnswer]
//! ```
//!
//! Backslashes, commas, brackets, tabs, and control characters are
//! written as `\DDD`, the decimal value of the character.  So is the
//! first character of a value which would otherwise read as a
//! sentinel.  An empty list, `[]`, is a single empty value.

use std::fmt::Write as _;

use dns_types::records::RecordValues;

use super::Cache;

pub const NXDOMAIN_SENTINEL: &str = "NXDomain";
pub const NOANSWER_SENTINEL: &str = "NoAnswer";

impl Cache {
    pub fn serialise(&self) -> String {
        let mut out = String::new();

        for rr in self.entries() {
            let values = match &rr.values {
                RecordValues::Answer(values) => values
                    .iter()
                    .map(|v| escape_value(v))
                    .collect::<Vec<_>>()
                    .join(","),
                RecordValues::NoAnswer => NOANSWER_SENTINEL.to_string(),
                RecordValues::NonExistent => NXDOMAIN_SENTINEL.to_string(),
            };

            let _ = writeln!(
                &mut out,
                "{}\t{}\t[{}]",
                escape(&rr.name.to_dotted_string()),
                rr.kind,
                values
            );
        }

        out
    }
}

/// Escape the characters which have meaning in the snapshot format.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if needs_escape(c) {
            let _ = write!(&mut out, "\\{:03}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape a record value, which must also not look like a sentinel.
fn escape_value(s: &str) -> String {
    if s == NXDOMAIN_SENTINEL || s == NOANSWER_SENTINEL {
        let mut chars = s.chars();
        if let Some(first) = chars.next() {
            return format!("\\{:03}{}", u32::from(first), chars.as_str());
        }
    }
    escape(s)
}

fn needs_escape(c: char) -> bool {
    matches!(c, '\\' | ',' | '[' | ']' | '\t') || c.is_control()
}
