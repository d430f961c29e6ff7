use dns_types::failures::Failure;
use dns_types::names::DomainName;
use dns_types::paths::{self, Path, PathBuilder};
use dns_types::records::ResourceRecord;

/// A terminal observation, positive or negative, and the CNAME hops
/// which were followed to reach it.
///
/// This is what both the cache and the upstream client produce.  It
/// only becomes a `Path` once the terminal record is known to be
/// positive.
#[derive(Debug, Clone)]
pub struct Answer {
    pub aliases: Vec<ResourceRecord>,
    pub record: ResourceRecord,
}

impl Answer {
    pub fn new(aliases: Vec<ResourceRecord>, record: ResourceRecord) -> Self {
        Self { aliases, record }
    }

    pub fn queried_name(&self) -> &DomainName {
        self.aliases
            .first()
            .map_or(&self.record.name, |alias| &alias.name)
    }

    pub fn canonical_name(&self) -> &DomainName {
        &self.record.name
    }

    /// Every record, aliases first.
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.aliases.iter().chain(std::iter::once(&self.record))
    }

    /// Turn a positive answer into a `Path` and a negative answer
    /// into the `Failure` it stands for.
    ///
    /// # Errors
    ///
    /// If the records do not form a chain, whether or not the
    /// terminal record is positive.
    pub fn into_path(self) -> Result<Result<Path, Failure>, paths::Error> {
        let mut builder = PathBuilder::new();
        for alias in self.aliases {
            builder = builder.add_alias(alias)?;
        }

        if let Some(failure) = self.record.failure() {
            if let Some(last) = builder.aliases().last() {
                let target = last.target_names();
                if target.first() != Some(&self.record.name) {
                    return Err(paths::Error::ChainIntegrityViolation {
                        expected: last.single_value().unwrap_or_default().to_string(),
                        found: self.record.name,
                    });
                }
            }
            return Ok(Err(failure));
        }

        Ok(Ok(builder.complete_resolution(self.record)?.build()?))
    }
}
