use std::fmt;
use std::str::FromStr;

/// Why a name could not be resolved.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FailureKind {
    /// The name does not exist (`NXDOMAIN`).
    DomainNonExistent,

    /// The name exists but has no records of the requested type.
    NoAnswer,

    /// Anything else: timeouts, server failures, malformed
    /// responses.  These may be transient, so are worth retrying.
    UnknownReason,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        self == FailureKind::UnknownReason
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::DomainNonExistent => write!(f, "DomainNonExistent"),
            FailureKind::NoAnswer => write!(f, "NoAnswer"),
            FailureKind::UnknownReason => write!(f, "UnknownReason"),
        }
    }
}

impl FromStr for FailureKind {
    type Err = FailureKindFromStr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DomainNonExistent" => Ok(FailureKind::DomainNonExistent),
            "NoAnswer" => Ok(FailureKind::NoAnswer),
            "UnknownReason" => Ok(FailureKind::UnknownReason),
            _ => Err(FailureKindFromStr::NoParse),
        }
    }
}

/// Errors that can arise when converting a `&str` into a
/// `FailureKind`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FailureKindFromStr {
    NoParse,
}

impl fmt::Display for FailureKindFromStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "could not parse string to failure kind")
    }
}

impl std::error::Error for FailureKindFromStr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A classified resolution failure, with a human-readable
/// explanation.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn domain_non_existent(message: impl Into<String>) -> Self {
        Self::new(FailureKind::DomainNonExistent, message)
    }

    pub fn no_answer(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NoAnswer, message)
    }

    pub fn unknown_reason(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UnknownReason, message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
