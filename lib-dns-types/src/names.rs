use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

/// Maximum encoded length of a domain name.  The number of labels
/// plus sum of the lengths of the labels.
pub const DOMAINNAME_MAX_LEN: usize = 255;

/// Maximum length of a single label in a domain name.
pub const LABEL_MAX_LEN: usize = 63;

/// A fully-qualified domain name: a sequence of labels ending with
/// the empty root label.
///
/// Labels are stored lower-cased, so equality, ordering, and hashing
/// are all case-insensitive and agree with one another.  Whether a
/// name was written with or without its trailing dot makes no
/// difference either.
///
/// A label must be 63 octets or shorter.  A name must be 255 octets
/// or shorter in total, including both length and label octets.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainName {
    labels: Vec<Label>,
    // INVARIANT: len == len(labels) + sum(map(len, labels))
    len: usize,
}

impl DomainName {
    pub fn root_domain() -> Self {
        DomainName {
            labels: vec![Label::new()],
            len: 1,
        }
    }

    pub fn is_root(&self) -> bool {
        self.len == 1 && self.labels[0].is_empty()
    }

    /// True for the root and for single-label names like `com.`.
    pub fn is_top_level_domain(&self) -> bool {
        self.label_count() <= 1
    }

    pub fn is_subdomain_of(&self, other: &DomainName) -> bool {
        self.labels.ends_with(&other.labels)
    }

    /// The labels, including the terminating empty label.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The number of labels, not counting the root.
    pub fn label_count(&self) -> usize {
        self.labels.len() - 1
    }

    /// The length of the name in wire format.
    pub fn encoded_len(&self) -> usize {
        self.len
    }

    /// The name with its leftmost label removed, or `None` for the
    /// root.
    pub fn parent(&self) -> Option<DomainName> {
        if self.is_root() {
            None
        } else {
            Some(self.ancestor_at_depth(self.label_count() - 1))
        }
    }

    /// The ancestors of this name, ordered from the root down to the
    /// name itself.
    ///
    /// The last element (the name itself) is governed only by
    /// `self_included`, so the root or a TLD decomposes to itself if
    /// `self_included` is set no matter the other flags.
    ///
    /// ```
    /// # use dns_types::names::DomainName;
    /// let name = DomainName::from_dotted_string("a.b.c.").unwrap();
    /// let ancestors = name
    ///     .decompose(true, true, true)
    ///     .map(|d| d.to_dotted_string())
    ///     .collect::<Vec<_>>();
    /// assert_eq!(ancestors, vec![".", "c.", "b.c.", "a.b.c."]);
    /// ```
    pub fn decompose(
        &self,
        root_included: bool,
        tld_included: bool,
        self_included: bool,
    ) -> Decomposition<'_> {
        Decomposition {
            name: self,
            front: 0,
            back: self.label_count() + 1,
            root_included,
            tld_included,
            self_included,
        }
    }

    /// The ancestor with `depth` non-root labels.
    ///
    /// `depth` must be no greater than `label_count()`.
    fn ancestor_at_depth(&self, depth: usize) -> DomainName {
        let labels = self.labels[self.labels.len() - 1 - depth..].to_vec();
        let len = labels.len() + labels.iter().map(|l| usize::from(l.len())).sum::<usize>();
        DomainName { labels, len }
    }

    /// The name with a trailing dot, `"."` for the root.
    pub fn to_dotted_string(&self) -> String {
        if self.is_root() {
            return ".".to_string();
        }

        let mut out = String::with_capacity(self.len);
        let mut first = true;
        for label in &self.labels {
            if first {
                first = false;
            } else {
                out.push('.');
            }
            for octet in label.octets() {
                out.push(*octet as char);
            }
        }

        out
    }

    /// The name without its trailing dot, `""` for the root.
    pub fn canonical_form(&self) -> String {
        let mut out = self.to_dotted_string();
        out.pop();
        out
    }

    /// Parse a name, with or without its trailing dot.  The empty
    /// string and `"."` are both the root.
    ///
    /// # Errors
    ///
    /// If there is an empty label other than the last, if a label or
    /// the name is too long, or if there is a character which does
    /// not fit in an octet.
    pub fn from_dotted_string(s: &str) -> Result<Self, InvalidDomainName> {
        if s.is_empty() || s == "." {
            return Ok(Self::root_domain());
        }

        let mut chunks = s.split('.').collect::<Vec<_>>();
        if chunks.last() != Some(&"") {
            chunks.push("");
        }

        let mut labels = Vec::with_capacity(chunks.len());
        for (i, label_chars) in chunks.iter().enumerate() {
            if label_chars.is_empty() && i != chunks.len() - 1 {
                return Err(InvalidDomainName::EmptyLabel { name: s.into() });
            }

            let mut octets = Vec::with_capacity(label_chars.len());
            for c in label_chars.chars() {
                match u8::try_from(u32::from(c)) {
                    Ok(octet) => octets.push(octet),
                    Err(_) => {
                        return Err(InvalidDomainName::BadCharacter {
                            name: s.into(),
                            character: c,
                        })
                    }
                }
            }

            match Label::try_from(&octets[..]) {
                Ok(label) => labels.push(label),
                Err(_) => {
                    return Err(InvalidDomainName::LabelTooLong {
                        label: (*label_chars).into(),
                    })
                }
            }
        }

        Self::from_labels(labels).ok_or(InvalidDomainName::NameTooLong { name: s.into() })
    }

    /// Build a name from a sequence of labels, which must end with
    /// (and only contain one) empty label.
    pub fn from_labels(labels: Vec<Label>) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }

        let mut len = labels.len();
        let mut blank_label = false;

        for label in &labels {
            if blank_label {
                return None;
            }

            blank_label |= label.is_empty();
            len += usize::from(label.len());
        }

        if blank_label && len <= DOMAINNAME_MAX_LEN {
            Some(Self { labels, len })
        } else {
            None
        }
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainName")
            .field("to_dotted_string()", &self.to_dotted_string())
            .finish()
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.to_dotted_string())
    }
}

impl FromStr for DomainName {
    type Err = InvalidDomainName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainName::from_dotted_string(s)
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for DomainName {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let num_labels = u.int_in_range::<usize>(0..=10)?;
        let mut labels = Vec::new();
        for _ in 0..num_labels {
            labels.push(u.arbitrary()?);
        }
        labels.push(Label::new());
        DomainName::from_labels(labels).ok_or(arbitrary::Error::IncorrectFormat)
    }
}

/// The ancestors of a `DomainName`, see `DomainName::decompose`.
///
/// Cloning a `Decomposition` gives an independent iterator over the
/// same names, so it can be restarted.
#[derive(Debug, Clone)]
pub struct Decomposition<'a> {
    name: &'a DomainName,
    // depths still to produce: front..back
    front: usize,
    back: usize,
    root_included: bool,
    tld_included: bool,
    self_included: bool,
}

impl<'a> Decomposition<'a> {
    fn is_included(&self, depth: usize) -> bool {
        if depth == self.name.label_count() {
            self.self_included
        } else if depth == 0 {
            self.root_included
        } else if depth == 1 {
            self.tld_included
        } else {
            true
        }
    }
}

impl<'a> Iterator for Decomposition<'a> {
    type Item = DomainName;

    fn next(&mut self) -> Option<Self::Item> {
        while self.front < self.back {
            let depth = self.front;
            self.front += 1;
            if self.is_included(depth) {
                return Some(self.name.ancestor_at_depth(depth));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.back - self.front))
    }
}

impl<'a> DoubleEndedIterator for Decomposition<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while self.back > self.front {
            self.back -= 1;
            if self.is_included(self.back) {
                return Some(self.name.ancestor_at_depth(self.back));
            }
        }
        None
    }
}

/// Errors that can arise when converting a `&str` into a
/// `DomainName`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum InvalidDomainName {
    EmptyLabel { name: String },
    LabelTooLong { label: String },
    NameTooLong { name: String },
    BadCharacter { name: String, character: char },
}

impl fmt::Display for InvalidDomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidDomainName::EmptyLabel { name } => {
                write!(f, "invalid domain name '{name}': empty label")
            }
            InvalidDomainName::LabelTooLong { label } => write!(
                f,
                "invalid domain name: label '{label}' is longer than {LABEL_MAX_LEN} octets"
            ),
            InvalidDomainName::NameTooLong { name } => write!(
                f,
                "invalid domain name '{name}': longer than {DOMAINNAME_MAX_LEN} octets"
            ),
            InvalidDomainName::BadCharacter { name, character } => write!(
                f,
                "invalid domain name '{name}': character {character:?} does not fit in an octet"
            ),
        }
    }
}

impl std::error::Error for InvalidDomainName {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A label is just a sequence of octets, which are compared as
/// case-insensitive ASCII.  A label can be no longer than 63 octets.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Label {
    /// Private to this module so constructing an invalid `Label` is
    /// impossible.
    octets: Bytes,
}

impl Label {
    /// Create a new, empty, label.
    pub fn new() -> Self {
        Self {
            octets: Bytes::new(),
        }
    }

    #[allow(clippy::missing_panics_doc)]
    pub fn len(&self) -> u8 {
        // safe as the `TryFrom` ensures a label is <= 63 bytes
        self.octets.len().try_into().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    pub fn octets(&self) -> &Bytes {
        &self.octets
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<&[u8]> for Label {
    type Error = LabelTryFromOctetsError;

    fn try_from(mixed_case_octets: &[u8]) -> Result<Self, Self::Error> {
        if mixed_case_octets.len() > LABEL_MAX_LEN {
            return Err(LabelTryFromOctetsError::TooLong);
        }

        Ok(Self {
            octets: Bytes::copy_from_slice(&mixed_case_octets.to_ascii_lowercase()),
        })
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Label {
    // only generates non-empty labels of letters, digits, and hyphens
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Label> {
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-";

        let label_len = u.int_in_range::<usize>(1..=20)?;
        let mut octets = Vec::with_capacity(label_len);
        for _ in 0..label_len {
            octets.push(*u.choose(ALPHABET)?);
        }
        Ok(Self {
            octets: Bytes::from(octets),
        })
    }
}

/// Errors that can arise when converting a `[u8]` into a `Label`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LabelTryFromOctetsError {
    TooLong,
}
