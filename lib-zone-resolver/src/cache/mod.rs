//! The session cache: an append-only log of every observation made
//! while walking, positive and negative.
//!
//! Nothing is ever overwritten, expired, or evicted.  A miss is
//! `None`, never an error: the caller decides whether to go to the
//! network.

pub mod deserialise;
pub mod serialise;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::fs::{read_to_string, write};

use dns_types::names::DomainName;
use dns_types::paths::{APath, Path as ResolutionPath};
use dns_types::records::{RecordKind, ResourceRecord};

use crate::answer::Answer;
use crate::RECURSION_LIMIT;

/// A convenience wrapper around a `Cache` which lets it be shared
/// between threads.
///
/// Invoking `clone` on a `SharedCache` gives a new instance which
/// refers to the same underlying `Cache` object.  Every method takes
/// the lock exactly once.
#[derive(Debug, Clone)]
pub struct SharedCache {
    cache: Arc<Mutex<Cache>>,
}

const MUTEX_POISON_MESSAGE: &str =
    "[INTERNAL ERROR] cache mutex poisoned, cannot recover from this - aborting";

impl SharedCache {
    /// Make a new, empty, shared cache.
    pub fn new() -> Self {
        Self::from(Cache::new())
    }

    /// Log an observation.  Returns `false` if an identical one was
    /// already logged.
    pub fn add_entry(&self, record: ResourceRecord) -> bool {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .add_entry(record)
    }

    pub fn lookup_first(&self, name: &DomainName, kind: RecordKind) -> Option<ResourceRecord> {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .lookup_first(name, kind)
            .cloned()
    }

    pub fn lookup_all(&self, name: &DomainName, kind: RecordKind) -> Option<Vec<ResourceRecord>> {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .lookup_all(name, kind)
            .map(|rrs| rrs.into_iter().cloned().collect())
    }

    pub fn lookup_all_aliases(&self, name: &DomainName) -> Option<BTreeSet<DomainName>> {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .lookup_all_aliases(name)
    }

    pub fn resolve_chain(&self, name: &DomainName, kind: RecordKind) -> Option<Answer> {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .resolve_chain(name, kind)
    }

    pub fn resolve_path_from_alias(&self, name: &DomainName) -> Option<APath> {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .resolve_path_from_alias(name)
    }

    pub fn resolve_zone_from_ns_record(&self, ns_record: &ResourceRecord) -> Option<CachedZone> {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .resolve_zone_from_ns_record(ns_record)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect(MUTEX_POISON_MESSAGE).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a snapshot of the cache to a file.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let data = self.cache.lock().expect(MUTEX_POISON_MESSAGE).serialise();
        write(path, data).await
    }

    /// Read a snapshot written by `save_to_file`.
    pub async fn load_from_file<P: AsRef<Path>>(
        path: P,
    ) -> io::Result<Result<Self, deserialise::Error>> {
        let data = read_to_string(path).await?;
        Ok(Cache::deserialise(&data).map(Self::from))
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Cache> for SharedCache {
    fn from(cache: Cache) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }
}

/// A zone whose nameservers could all be resolved from the cache.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedZone {
    pub zone_name: DomainName,
    pub nameservers: Vec<APath>,
    pub alias_records: Vec<ResourceRecord>,
}

/// The observation log.
///
/// You probably want to use `SharedCache` instead.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    /// Every observation, in the order it was made.
    entries: Vec<ResourceRecord>,

    /// Positions in `entries`, in ascending order.
    ///
    /// INVARIANT: `index[(n, k)]` holds exactly the positions of the
    /// entries with name `n` and kind `k`.
    index: HashMap<(DomainName, RecordKind), Vec<usize>>,

    /// Reverse CNAME links: target name to the names which alias it.
    ///
    /// INVARIANT: contains exactly the links of the positive CNAMEs
    /// in `entries`.
    aliased_by: HashMap<DomainName, BTreeSet<DomainName>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every observation, in the order it was made.
    pub fn entries(&self) -> &[ResourceRecord] {
        &self.entries
    }

    /// Log an observation.  Returns `false` if an identical one was
    /// already logged.
    pub fn add_entry(&mut self, record: ResourceRecord) -> bool {
        let key = (record.name.clone(), record.kind);
        let positions = self.index.entry(key).or_default();
        if positions
            .iter()
            .any(|i| self.entries[*i].same_observation(&record))
        {
            return false;
        }

        if record.kind == RecordKind::CNAME {
            for target in record.target_names() {
                self.aliased_by
                    .entry(target)
                    .or_default()
                    .insert(record.name.clone());
            }
        }

        positions.push(self.entries.len());
        self.entries.push(record);
        true
    }

    pub fn lookup_first(&self, name: &DomainName, kind: RecordKind) -> Option<&ResourceRecord> {
        let positions = self.index.get(&(name.clone(), kind))?;
        positions.first().map(|i| &self.entries[*i])
    }

    pub fn lookup_all(&self, name: &DomainName, kind: RecordKind) -> Option<Vec<&ResourceRecord>> {
        let positions = self.index.get(&(name.clone(), kind))?;
        if positions.is_empty() {
            None
        } else {
            Some(positions.iter().map(|i| &self.entries[*i]).collect())
        }
    }

    /// Names CNAME-linked to `name` in either direction: the targets
    /// of its own CNAMEs and the names whose CNAMEs point at it.
    pub fn lookup_all_aliases(&self, name: &DomainName) -> Option<BTreeSet<DomainName>> {
        let mut out = BTreeSet::new();
        for rr in self.lookup_all(name, RecordKind::CNAME).unwrap_or_default() {
            out.extend(rr.target_names());
        }
        if let Some(sources) = self.aliased_by.get(name) {
            out.extend(sources.iter().cloned());
        }

        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Follow positive CNAMEs from `name` until a record of `kind`
    /// (positive or negative) is found.
    ///
    /// A CNAME lookup is answered by the first CNAME observation at
    /// `name` itself.  Broken, looping, and overlong chains are
    /// misses.
    pub fn resolve_chain(&self, name: &DomainName, kind: RecordKind) -> Option<Answer> {
        if kind == RecordKind::CNAME {
            return self
                .lookup_first(name, kind)
                .map(|rr| Answer::new(Vec::new(), rr.clone()));
        }

        let mut aliases = Vec::new();
        let mut seen = HashSet::new();
        let mut current = name.clone();

        loop {
            if let Some(rr) = self.lookup_first(&current, kind) {
                return Some(Answer::new(aliases, rr.clone()));
            }
            if aliases.len() >= RECURSION_LIMIT {
                return None;
            }

            let alias = self.lookup_first(&current, RecordKind::CNAME)?;
            let target = alias.single_value()?;
            let target = DomainName::from_dotted_string(target).ok()?;

            seen.insert(current);
            if seen.contains(&target) {
                return None;
            }

            aliases.push(alias.clone());
            current = target;
        }
    }

    /// Follow CNAMEs from `name` to a positive A record.
    pub fn resolve_path_from_alias(&self, name: &DomainName) -> Option<APath> {
        let answer = self.resolve_chain(name, RecordKind::A)?;
        match answer.into_path() {
            Ok(Ok(ResolutionPath::A(path))) => Some(path),
            _ => None,
        }
    }

    /// Resolve every nameserver named in an NS record from the cache
    /// alone.  A miss if any of them cannot be.
    pub fn resolve_zone_from_ns_record(&self, ns_record: &ResourceRecord) -> Option<CachedZone> {
        if ns_record.kind != RecordKind::NS || ns_record.is_negative() {
            return None;
        }

        let mut nameservers = Vec::new();
        let mut alias_records = Vec::new();
        for nameserver in ns_record.target_names() {
            let path = self.resolve_path_from_alias(&nameserver)?;
            alias_records.extend(path.aliases().iter().cloned());
            nameservers.push(path);
        }

        Some(CachedZone {
            zone_name: ns_record.name.clone(),
            nameservers,
            alias_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use dns_types::records::RecordValues;
    use dns_types::test_util::*;
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn lookup_misses_are_none() {
        let cache = Cache::new();

        assert_eq!(None, cache.lookup_first(&domain("example.com."), RecordKind::A));
        assert_eq!(None, cache.lookup_all(&domain("example.com."), RecordKind::A));
        assert_eq!(None, cache.lookup_all_aliases(&domain("example.com.")));
        assert!(cache
            .resolve_chain(&domain("example.com."), RecordKind::A)
            .is_none());
    }

    #[test]
    fn add_entry_ignores_identical_observations() {
        let mut cache = Cache::new();

        assert!(cache.add_entry(a_record("www.example.com.", Ipv4Addr::new(1, 1, 1, 1))));
        assert!(!cache.add_entry(a_record("www.example.com.", Ipv4Addr::new(1, 1, 1, 1))));
        assert!(cache.add_entry(a_record("www.example.com.", Ipv4Addr::new(2, 2, 2, 2))));

        assert_eq!(2, cache.len());
        assert_invariants(&cache);
    }

    #[test]
    fn lookup_first_is_first_observation() {
        let mut cache = Cache::new();
        cache.add_entry(no_answer_record("www.example.com.", RecordKind::A));
        cache.add_entry(a_record("www.example.com.", Ipv4Addr::new(1, 1, 1, 1)));

        let first = cache
            .lookup_first(&domain("www.example.com."), RecordKind::A)
            .unwrap();
        assert_eq!(RecordValues::NoAnswer, first.values);

        let all = cache
            .lookup_all(&domain("www.example.com."), RecordKind::A)
            .unwrap();
        assert_eq!(2, all.len());
        assert!(!all[1].is_negative());
    }

    #[test]
    fn lookup_is_by_kind() {
        let mut cache = Cache::new();
        cache.add_entry(ns_record("example.com.", &["ns1.example.com."]));

        assert!(cache
            .lookup_first(&domain("example.com."), RecordKind::NS)
            .is_some());
        assert!(cache
            .lookup_first(&domain("example.com."), RecordKind::A)
            .is_none());
    }

    #[test]
    fn lookup_all_aliases_goes_both_ways() {
        let mut cache = Cache::new();
        cache.add_entry(cname_record("www.example.com.", "web.example.net."));
        cache.add_entry(cname_record("web.example.net.", "lb.example.org."));
        cache.add_entry(cname_record("mirror.example.com.", "web.example.net."));

        assert_eq!(
            Some(
                [
                    domain("www.example.com."),
                    domain("mirror.example.com."),
                    domain("lb.example.org."),
                ]
                .into_iter()
                .collect()
            ),
            cache.lookup_all_aliases(&domain("web.example.net."))
        );
        assert_eq!(
            Some([domain("web.example.net.")].into_iter().collect()),
            cache.lookup_all_aliases(&domain("www.example.com."))
        );
    }

    #[test]
    fn negative_cnames_are_not_aliases() {
        let mut cache = Cache::new();
        cache.add_entry(no_answer_record("www.example.com.", RecordKind::CNAME));

        assert_eq!(None, cache.lookup_all_aliases(&domain("www.example.com.")));
        assert_invariants(&cache);
    }

    #[test]
    fn resolve_chain_follows_aliases() {
        let mut cache = Cache::new();
        cache.add_entry(a_record("lb.example.org.", Ipv4Addr::new(192, 0, 2, 1)));
        cache.add_entry(cname_record("web.example.net.", "lb.example.org."));
        cache.add_entry(cname_record("www.example.com.", "web.example.net."));

        let answer = cache
            .resolve_chain(&domain("www.example.com."), RecordKind::A)
            .unwrap();

        assert_eq!(2, answer.aliases.len());
        assert_eq!(&domain("www.example.com."), answer.queried_name());
        assert_eq!(&domain("lb.example.org."), answer.canonical_name());
    }

    #[test]
    fn resolve_chain_reaches_negative_terminal() {
        let mut cache = Cache::new();
        cache.add_entry(cname_record("www.example.com.", "gone.example.net."));
        cache.add_entry(nx_domain_record("gone.example.net.", RecordKind::NS));

        let answer = cache
            .resolve_chain(&domain("www.example.com."), RecordKind::NS)
            .unwrap();

        assert_eq!(1, answer.aliases.len());
        assert_eq!(RecordValues::NonExistent, answer.record.values);
    }

    #[test]
    fn resolve_chain_for_cname_does_not_follow() {
        let mut cache = Cache::new();
        cache.add_entry(cname_record("www.example.com.", "web.example.net."));
        cache.add_entry(cname_record("web.example.net.", "lb.example.org."));

        let answer = cache
            .resolve_chain(&domain("www.example.com."), RecordKind::CNAME)
            .unwrap();

        assert!(answer.aliases.is_empty());
        assert_eq!(Some("web.example.net."), answer.record.single_value());
    }

    #[test]
    fn resolve_chain_misses_on_loop() {
        let mut cache = Cache::new();
        cache.add_entry(cname_record("a.example.com.", "b.example.com."));
        cache.add_entry(cname_record("b.example.com.", "a.example.com."));

        assert!(cache
            .resolve_chain(&domain("a.example.com."), RecordKind::A)
            .is_none());
    }

    #[test]
    fn resolve_chain_misses_on_broken_chain() {
        let mut cache = Cache::new();
        cache.add_entry(cname_record("www.example.com.", "web.example.net."));

        assert!(cache
            .resolve_chain(&domain("www.example.com."), RecordKind::A)
            .is_none());
    }

    #[test]
    fn resolve_path_from_alias_needs_positive_a() {
        let mut cache = Cache::new();
        cache.add_entry(cname_record("www.example.com.", "web.example.net."));
        cache.add_entry(no_answer_record("web.example.net.", RecordKind::A));

        assert_eq!(
            None,
            cache.resolve_path_from_alias(&domain("www.example.com."))
        );

        cache.add_entry(cname_record("ftp.example.com.", "files.example.net."));
        cache.add_entry(a_record("files.example.net.", Ipv4Addr::new(192, 0, 2, 21)));

        let path = cache
            .resolve_path_from_alias(&domain("ftp.example.com."))
            .unwrap();
        assert_eq!(&domain("ftp.example.com."), path.queried_name());
        assert_eq!(vec![Ipv4Addr::new(192, 0, 2, 21)], path.addresses());
    }

    #[test]
    fn resolve_zone_from_ns_record_needs_every_nameserver() {
        let mut cache = Cache::new();
        let ns = ns_record("example.com.", &["ns1.example.com.", "ns2.example.net."]);
        cache.add_entry(ns.clone());
        cache.add_entry(a_record("ns1.example.com.", Ipv4Addr::new(192, 0, 2, 1)));

        assert_eq!(None, cache.resolve_zone_from_ns_record(&ns));

        cache.add_entry(cname_record("ns2.example.net.", "host.example.org."));
        cache.add_entry(a_record("host.example.org.", Ipv4Addr::new(192, 0, 2, 2)));

        let zone = cache.resolve_zone_from_ns_record(&ns).unwrap();
        assert_eq!(domain("example.com."), zone.zone_name);
        assert_eq!(2, zone.nameservers.len());
        assert_eq!(
            vec![cname_record("ns2.example.net.", "host.example.org.")],
            zone.alias_records
        );
    }

    #[test]
    fn resolve_zone_from_negative_ns_record_misses() {
        let cache = Cache::new();

        assert_eq!(
            None,
            cache.resolve_zone_from_ns_record(&no_answer_record("www.example.com.", RecordKind::NS))
        );
    }

    #[test]
    fn shared_cache_is_shared() {
        let cache = SharedCache::new();
        let other = cache.clone();

        other.add_entry(a_record("www.example.com.", Ipv4Addr::LOCALHOST));

        assert_eq!(1, cache.len());
        assert!(cache
            .lookup_first(&domain("www.example.com."), RecordKind::A)
            .is_some());
    }

    #[test]
    fn add_entry_maintains_invariants() {
        let mut cache = Cache::new();

        for i in 0..100 {
            let name = arbitrary_domain();
            match i % 4 {
                0 => cache.add_entry(ResourceRecord::with_addresses(
                    name,
                    &[Ipv4Addr::new(192, 0, 2, 1)],
                )),
                1 => cache.add_entry(ResourceRecord::with_names(
                    name,
                    RecordKind::CNAME,
                    &[arbitrary_domain()],
                )),
                2 => cache.add_entry(ResourceRecord::no_answer(name, RecordKind::NS)),
                _ => cache.add_entry(ResourceRecord::non_existent(name, RecordKind::MX)),
            };
        }

        assert_invariants(&cache);
    }

    fn assert_invariants(cache: &Cache) {
        let mut index: HashMap<(DomainName, RecordKind), Vec<usize>> = HashMap::new();
        let mut aliased_by: HashMap<DomainName, BTreeSet<DomainName>> = HashMap::new();

        for (i, rr) in cache.entries.iter().enumerate() {
            index.entry((rr.name.clone(), rr.kind)).or_default().push(i);
            if rr.kind == RecordKind::CNAME {
                for target in rr.target_names() {
                    aliased_by.entry(target).or_default().insert(rr.name.clone());
                }
            }
        }

        assert_eq!(index, cache.index);
        assert_eq!(aliased_by, cache.aliased_by);
    }
}
