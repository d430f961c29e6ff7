//! Walking a set of names to discover the zones they depend on.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::Instrument;

use dns_types::failures::{Failure, FailureKind};
use dns_types::names::DomainName;
use dns_types::paths::{self, APath, MXPath, NSPath, Path};
use dns_types::records::{RecordKind, RecordValues, ResourceRecord};
use dns_types::zones::Zone;

use crate::answer::Answer;
use crate::cache::SharedCache;
use crate::client::DnsClient;
use crate::error_log::ErrorLogEntry;
use crate::metrics::{Metrics, MetricsSummary};
use crate::RECURSION_LIMIT;

/// What the resolver does, and how hard it tries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResolverSettings {
    /// Whether the root is a candidate.
    pub walk_root: bool,
    /// Whether top-level domains are candidates.
    pub walk_tlds: bool,
    /// Whether to look up MX records for the input names.
    pub collect_mail_exchangers: bool,
    /// How many candidates to walk at once.
    pub max_concurrency: usize,
    /// How many times to repeat a query which failed for an unknown
    /// reason.
    pub retries: u32,
    /// The wait before the first retry.  The nth retry waits n times
    /// this.
    pub retry_backoff: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            walk_root: false,
            walk_tlds: true,
            collect_mail_exchangers: false,
            max_concurrency: 8,
            retries: 2,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// Everything discovered by one call to `Resolver::resolve`.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Every zone built, ordered by name.
    pub zones: Vec<Zone>,
    /// Name or zone name to the zones it depends on.
    pub dependencies: BTreeMap<DomainName, BTreeSet<DomainName>>,
    /// Nameserver hostname to the zones it serves.
    pub nameservers: BTreeMap<DomainName, BTreeSet<DomainName>>,
    /// Every CNAME hop seen, alias to target.
    pub aliases: BTreeMap<DomainName, DomainName>,
    /// Input name to its MX path, if mail exchangers were collected.
    pub mail_exchangers: BTreeMap<DomainName, MXPath>,
    /// Every failure, ordered by name then kind.
    pub errors: Vec<ErrorLogEntry>,
    /// The resolver's counters when the walk finished.
    pub metrics: MetricsSummary,
}

impl Resolution {
    pub fn zone(&self, name: &DomainName) -> Option<&Zone> {
        self.zones
            .binary_search_by(|zone| zone.name().cmp(name))
            .ok()
            .map(|i| &self.zones[i])
    }
}

/// Walks names, cache first, falling back to a `DnsClient`.
///
/// Invoking `clone` on a `Resolver` gives a new handle to the same
/// client, cache, and metrics.
pub struct Resolver<C> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    client: C,
    cache: SharedCache,
    settings: ResolverSettings,
    metrics: Metrics,
}

impl<C> Clone for Resolver<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: DnsClient + 'static> Resolver<C> {
    pub fn new(client: C, cache: SharedCache, settings: ResolverSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                cache,
                settings,
                metrics: Metrics::new(),
            }),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.inner.cache
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.inner.settings
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.inner.metrics.summary()
    }

    /// Look up a record, following aliases, from the cache if
    /// possible and from the client otherwise.  Everything learned
    /// from the client is added to the cache, once it is known to
    /// form a usable chain.
    ///
    /// The inner `Err` is a negative or failed lookup, which is an
    /// expected outcome.  Records which cannot form a path at all,
    /// such as a CNAME with two targets, are an `UnknownReason`
    /// failure of the name.  The outer `Err` means the records were
    /// linked up out of order, which is a bug.
    pub async fn lookup(
        &self,
        name: &DomainName,
        kind: RecordKind,
    ) -> Result<Result<Path, Failure>, ResolveError> {
        let (answer, live) = if let Some(answer) = self.inner.cache.resolve_chain(name, kind) {
            self.inner.metrics.cache_hit();
            tracing::trace!(%name, %kind, "cache hit");
            (answer, None)
        } else {
            self.inner.metrics.cache_miss();
            tracing::trace!(%name, %kind, "cache miss");
            match self.query_with_retries(name, kind).await {
                Ok(answer) => (answer.clone(), Some(answer)),
                Err(failure) => return Ok(Err(failure)),
            }
        };

        match answer.into_path() {
            Ok(result) => {
                if let Some(answer) = live {
                    self.record_answer(kind, &answer);
                }
                Ok(result)
            }
            Err(error) if error.is_bad_data() => {
                tracing::warn!(%name, %kind, %error, "unusable records");
                Ok(Err(Failure::unknown_reason(format!(
                    "{kind} lookup of {name} gave unusable records: {error}"
                ))))
            }
            Err(error) => Err(ResolveError::Path(error)),
        }
    }

    async fn query_with_retries(&self, name: &DomainName, kind: RecordKind) -> Result<Answer, Failure> {
        let mut attempt = 0;
        loop {
            self.inner.metrics.live_query();
            let result = self
                .inner
                .client
                .query(name, kind)
                .instrument(tracing::error_span!("query", %name, %kind, %attempt))
                .await;

            match result {
                Ok(answer) => return Ok(answer),
                Err(error) if error.is_transient() && attempt < self.inner.settings.retries => {
                    attempt += 1;
                    self.inner.metrics.retry();
                    tracing::debug!(%name, %kind, %error, %attempt, "retrying");
                    sleep(self.inner.settings.retry_backoff * attempt).await;
                }
                Err(error) => {
                    self.inner.metrics.failed_query();
                    tracing::debug!(%name, %kind, %error, "giving up");
                    return Err(Failure::unknown_reason(format!(
                        "{kind} lookup of {name} failed: {error}"
                    )));
                }
            }
        }
    }

    /// Add every record of a live answer to the cache, plus what it
    /// proves about the canonical name having no CNAME.
    fn record_answer(&self, kind: RecordKind, answer: &Answer) {
        for rr in answer.records() {
            self.inner.cache.add_entry(rr.clone());
        }

        if kind != RecordKind::CNAME {
            let canonical_name = answer.canonical_name().clone();
            let derived = if answer.record.values == RecordValues::NonExistent {
                ResourceRecord::non_existent(canonical_name, RecordKind::CNAME)
            } else {
                ResourceRecord::no_answer(canonical_name, RecordKind::CNAME)
            };
            self.inner.cache.add_entry(derived);
        }
    }

    /// Walk every name, and everything they lead to, building zones
    /// and the dependencies between them.
    ///
    /// Failures to resolve individual names end up in the error log
    /// of the result.  This only returns an `Err` if the cache or a
    /// response is inconsistent, or a task panics.
    pub async fn resolve(&self, names: &[DomainName]) -> Result<Resolution, ResolveError> {
        let session = Arc::new(Session::new(names));
        let max_concurrency = self.inner.settings.max_concurrency.max(1);

        let mut queue = VecDeque::new();
        let mut scheduled = HashSet::new();
        for name in names {
            self.schedule(name, &mut scheduled, &mut queue);
        }

        tracing::info!(names = names.len(), candidates = queue.len(), "starting walk");

        let mut tasks = JoinSet::new();
        loop {
            while tasks.len() < max_concurrency {
                let Some(candidate) = queue.pop_front() else {
                    break;
                };
                let resolver = self.clone();
                let session = session.clone();
                tasks.spawn(async move {
                    let span = tracing::error_span!("walk", %candidate);
                    resolver.walk_candidate(&session, candidate).instrument(span).await
                });
            }

            match tasks.join_next().await {
                None => break,
                Some(Ok(Ok(discovered))) => {
                    for name in &discovered {
                        self.schedule(name, &mut scheduled, &mut queue);
                    }
                }
                Some(Ok(Err(error))) => {
                    tracing::error!(%error, "aborting walk");
                    tasks.abort_all();
                    return Err(error);
                }
                Some(Err(error)) => {
                    tracing::error!(%error, "aborting walk");
                    tasks.abort_all();
                    return Err(ResolveError::TaskFailed {
                        message: error.to_string(),
                    });
                }
            }
        }

        let resolution = session.finish(self.metrics());
        tracing::info!(
            candidates = scheduled.len(),
            zones = resolution.zones.len(),
            errors = resolution.errors.len(),
            metrics = %resolution.metrics,
            "finished walk"
        );
        Ok(resolution)
    }

    fn schedule(
        &self,
        name: &DomainName,
        scheduled: &mut HashSet<DomainName>,
        queue: &mut VecDeque<DomainName>,
    ) {
        for candidate in self.decompose(name) {
            if scheduled.insert(candidate.clone()) {
                queue.push_back(candidate);
            }
        }
    }

    fn decompose(&self, name: &DomainName) -> Vec<DomainName> {
        name.decompose(
            self.inner.settings.walk_root,
            self.inner.settings.walk_tlds,
            true,
        )
        .collect()
    }

    /// Walk one candidate: follow its aliases, see if where they end
    /// up is a zone, and record the edges.  Returns the names which
    /// should become candidates.
    async fn walk_candidate(
        &self,
        session: &Session,
        candidate: DomainName,
    ) -> Result<Vec<DomainName>, ResolveError> {
        let mut discovered = Vec::new();

        let Some(current) = self.follow_aliases(session, &candidate, &mut discovered).await? else {
            return Ok(discovered);
        };

        let status = self.ensure_zone(session, &current).await?;
        match &status {
            ZoneStatus::Cut(zone) if current == candidate => {
                discovered.extend(zone.nameserver_names());
                for nameserver in zone.resolved_nameserver_names() {
                    if let Some(ns_zone) = self.enclosing_zone(session, &nameserver).await? {
                        session.add_dependency(zone.name(), ns_zone.name());
                    }
                }
            }
            ZoneStatus::Cut(zone) => {
                session.add_dependency(&candidate, zone.name());
                if let Some(enclosing) = self.enclosing_zone(session, &candidate).await? {
                    session.add_dependency(&candidate, enclosing.name());
                }
            }
            ZoneStatus::NotACut | ZoneStatus::Failed => {
                if let Some(enclosing) = self.enclosing_zone(session, &candidate).await? {
                    session.add_dependency(&candidate, enclosing.name());
                }
                if current != candidate {
                    if let Some(enclosing) = self.enclosing_zone(session, &current).await? {
                        session.add_dependency(&candidate, enclosing.name());
                    }
                }
            }
        }

        if self.inner.settings.collect_mail_exchangers && session.is_input(&candidate) {
            self.collect_mail_exchangers(session, &candidate, &mut discovered)
                .await?;
        }

        Ok(discovered)
    }

    /// Follow the CNAME chain from a candidate, recording each hop.
    /// Returns the name the chain ends at, or `None` if the chain is
    /// broken, in which case the failure has been logged.
    async fn follow_aliases(
        &self,
        session: &Session,
        candidate: &DomainName,
        discovered: &mut Vec<DomainName>,
    ) -> Result<Option<DomainName>, ResolveError> {
        let mut current = candidate.clone();
        let mut seen = HashSet::from([candidate.clone()]);

        while !session.is_built_zone(&current) {
            let target = match self.lookup(&current, RecordKind::CNAME).await? {
                Ok(Path::CNAME(path)) => match path.target() {
                    Some(target) => target,
                    None => break,
                },
                Ok(_) => break,
                Err(failure) if failure.kind == FailureKind::NoAnswer => break,
                Err(failure) => {
                    session.log(&current, failure);
                    return Ok(None);
                }
            };

            if !seen.insert(target.clone()) {
                session.log(
                    candidate,
                    Failure::unknown_reason(format!("alias chain from {candidate} loops at {target}")),
                );
                return Ok(None);
            }
            if seen.len() > RECURSION_LIMIT + 1 {
                session.log(
                    candidate,
                    Failure::unknown_reason(format!(
                        "alias chain from {candidate} is longer than {RECURSION_LIMIT} hops"
                    )),
                );
                return Ok(None);
            }

            tracing::debug!(alias = %current, %target, "following alias");
            session.add_alias(&current, &target);
            discovered.push(target.clone());
            current = target;
        }

        Ok(Some(current))
    }

    async fn collect_mail_exchangers(
        &self,
        session: &Session,
        name: &DomainName,
        discovered: &mut Vec<DomainName>,
    ) -> Result<(), ResolveError> {
        match self.lookup(name, RecordKind::MX).await? {
            Ok(Path::MX(path)) => {
                let exchanges = path.exchanges();
                session.add_mail_exchangers(name, path);
                for exchange in exchanges {
                    if let Some(zone) = self.enclosing_zone(session, &exchange).await? {
                        session.add_dependency(name, zone.name());
                    }
                    discovered.push(exchange);
                }
            }
            Ok(_) => (),
            Err(failure) if failure.kind == FailureKind::NoAnswer => (),
            Err(failure) => session.log(name, failure),
        }

        Ok(())
    }

    /// The nearest ancestor-or-self of a name which is a zone.
    async fn enclosing_zone(
        &self,
        session: &Session,
        name: &DomainName,
    ) -> Result<Option<Arc<Zone>>, ResolveError> {
        for ancestor in self.decompose(name).into_iter().rev() {
            if let ZoneStatus::Cut(zone) = self.ensure_zone(session, &ancestor).await? {
                return Ok(Some(zone));
            }
        }

        Ok(None)
    }

    /// Find out whether a name is a zone, building the zone the first
    /// time anyone asks.  Concurrent callers wait for the first.
    async fn ensure_zone(&self, session: &Session, name: &DomainName) -> Result<ZoneStatus, ResolveError> {
        let cell = session.zone_cell(name);
        let status = cell
            .get_or_try_init(|| {
                self.build_zone(session, name)
                    .instrument(tracing::error_span!("zone", %name))
            })
            .await?;
        Ok(status.clone())
    }

    async fn build_zone(&self, session: &Session, name: &DomainName) -> Result<ZoneStatus, ResolveError> {
        let ns_path = match self.lookup(name, RecordKind::NS).await? {
            Ok(Path::NS(path)) if path.canonical_name() == name => path,
            Ok(_) => return Ok(ZoneStatus::NotACut),
            Err(failure) if failure.kind == FailureKind::NoAnswer => return Ok(ZoneStatus::NotACut),
            Err(failure) => {
                session.log(name, failure);
                return Ok(ZoneStatus::Failed);
            }
        };

        let (nameservers, unresolved) = self.resolve_nameservers(session, &ns_path).await?;

        match Zone::new(ns_path, nameservers, unresolved) {
            Ok(zone) => {
                tracing::debug!(
                    nameservers = zone.nameservers().len(),
                    unresolved = zone.unresolved_nameservers().len(),
                    "built zone"
                );
                Ok(ZoneStatus::Cut(Arc::new(zone)))
            }
            Err(error) => {
                session.log(
                    name,
                    Failure::unknown_reason(format!("could not build zone: {error}")),
                );
                Ok(ZoneStatus::Failed)
            }
        }
    }

    async fn resolve_nameservers(
        &self,
        session: &Session,
        ns_path: &NSPath,
    ) -> Result<(Vec<APath>, BTreeMap<DomainName, Failure>), ResolveError> {
        if let Some(cached) = self
            .inner
            .cache
            .resolve_zone_from_ns_record(ns_path.terminal())
        {
            tracing::trace!("all nameservers cached");
            return Ok((cached.nameservers, BTreeMap::new()));
        }

        let mut nameservers = Vec::new();
        let mut unresolved = BTreeMap::new();
        for nameserver in ns_path.nameservers() {
            let failure = match self.lookup(&nameserver, RecordKind::A).await? {
                Ok(Path::A(path)) => {
                    nameservers.push(path);
                    continue;
                }
                Ok(path) => Failure::unknown_reason(format!(
                    "{nameserver} resolved to a {} record",
                    path.kind()
                )),
                Err(failure) => failure,
            };

            tracing::debug!(%nameserver, %failure, "unresolved nameserver");
            session.log(&nameserver, failure.clone());
            unresolved.insert(nameserver, failure);
        }

        Ok((nameservers, unresolved))
    }
}

/// Whether a name is the apex of a zone.
#[derive(Debug, Clone)]
enum ZoneStatus {
    Cut(Arc<Zone>),
    NotACut,
    Failed,
}

const SESSION_MUTEX_POISON_MESSAGE: &str =
    "[INTERNAL ERROR] session mutex poisoned, cannot recover from this - aborting";

/// State shared by the tasks of one `resolve` call.
struct Session {
    inputs: HashSet<DomainName>,
    zone_cells: Mutex<HashMap<DomainName, Arc<OnceCell<ZoneStatus>>>>,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    dependencies: BTreeMap<DomainName, BTreeSet<DomainName>>,
    aliases: BTreeMap<DomainName, DomainName>,
    mail_exchangers: BTreeMap<DomainName, MXPath>,
    errors: BTreeSet<ErrorLogEntry>,
}

impl Session {
    fn new(names: &[DomainName]) -> Self {
        Self {
            inputs: names.iter().cloned().collect(),
            zone_cells: Mutex::new(HashMap::new()),
            state: Mutex::new(SessionState::default()),
        }
    }

    fn is_input(&self, name: &DomainName) -> bool {
        self.inputs.contains(name)
    }

    fn zone_cell(&self, name: &DomainName) -> Arc<OnceCell<ZoneStatus>> {
        self.zone_cells
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .entry(name.clone())
            .or_default()
            .clone()
    }

    fn is_built_zone(&self, name: &DomainName) -> bool {
        self.zone_cells
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .get(name)
            .and_then(|cell| cell.get())
            .is_some_and(|status| matches!(status, ZoneStatus::Cut(_)))
    }

    fn log(&self, name: &DomainName, failure: Failure) {
        tracing::debug!(%name, kind = %failure.kind, message = %failure.message, "failure");
        self.state
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .errors
            .insert(ErrorLogEntry::new(name.clone(), failure));
    }

    fn add_dependency(&self, from: &DomainName, to: &DomainName) {
        if from == to {
            return;
        }
        self.state
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .dependencies
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
    }

    fn add_alias(&self, alias: &DomainName, target: &DomainName) {
        self.state
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .aliases
            .insert(alias.clone(), target.clone());
    }

    fn add_mail_exchangers(&self, name: &DomainName, path: MXPath) {
        self.state
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .mail_exchangers
            .insert(name.clone(), path);
    }

    /// Gather up everything the walk found.  Aliases are merged into
    /// every zone their chain reaches.
    fn finish(&self, metrics: MetricsSummary) -> Resolution {
        let mut zones = BTreeMap::new();
        for cell in self
            .zone_cells
            .lock()
            .expect(SESSION_MUTEX_POISON_MESSAGE)
            .values()
        {
            if let Some(ZoneStatus::Cut(zone)) = cell.get() {
                zones.insert(zone.name().clone(), Zone::clone(zone));
            }
        }

        let state = std::mem::take(&mut *self.state.lock().expect(SESSION_MUTEX_POISON_MESSAGE));

        for alias in state.aliases.keys() {
            let mut seen = HashSet::new();
            let mut next = state.aliases.get(alias);
            while let Some(target) = next {
                if !seen.insert(target) {
                    break;
                }
                if let Some(zone) = zones.get_mut(target) {
                    zone.add_alias(alias.clone());
                }
                next = state.aliases.get(target);
            }
        }

        let mut nameservers: BTreeMap<DomainName, BTreeSet<DomainName>> = BTreeMap::new();
        for zone in zones.values() {
            for nameserver in zone.nameserver_names() {
                nameservers
                    .entry(nameserver)
                    .or_default()
                    .insert(zone.name().clone());
            }
        }

        Resolution {
            zones: zones.into_values().collect(),
            dependencies: state.dependencies,
            nameservers,
            aliases: state.aliases,
            mail_exchangers: state.mail_exchangers,
            errors: state.errors.into_iter().collect(),
            metrics,
        }
    }
}

/// Errors which stop a whole walk.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResolveError {
    /// Records which should form an alias chain do not.
    Path(paths::Error),
    /// A walking task panicked or was cancelled.
    TaskFailed { message: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolveError::Path(error) => write!(f, "inconsistent records: {error}"),
            ResolveError::TaskFailed { message } => write!(f, "walking task failed: {message}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Path(error) => Some(error),
            ResolveError::TaskFailed { .. } => None,
        }
    }
}

impl From<paths::Error> for ResolveError {
    fn from(error: paths::Error) -> Self {
        ResolveError::Path(error)
    }
}

#[cfg(test)]
mod tests {
    use dns_types::test_util::*;

    use super::*;

    #[test]
    fn default_settings() {
        let settings = ResolverSettings::default();

        assert!(!settings.walk_root);
        assert!(settings.walk_tlds);
        assert!(!settings.collect_mail_exchangers);
        assert_eq!(8, settings.max_concurrency);
    }

    #[test]
    fn session_skips_self_edges() {
        let session = Session::new(&[]);
        session.add_dependency(&domain("example.com."), &domain("example.com."));
        session.add_dependency(&domain("example.com."), &domain("example.net."));

        let resolution = session.finish(MetricsSummary::default());

        assert_eq!(
            Some(&[domain("example.net.")].into_iter().collect::<BTreeSet<_>>()),
            resolution.dependencies.get(&domain("example.com."))
        );
    }

    #[test]
    fn session_deduplicates_errors() {
        let session = Session::new(&[]);
        session.log(&domain("bogus.example."), Failure::domain_non_existent("gone"));
        session.log(&domain("bogus.example."), Failure::domain_non_existent("gone"));
        session.log(&domain("a.example."), Failure::unknown_reason("timed out"));

        let resolution = session.finish(MetricsSummary::default());

        assert_eq!(
            vec![domain("a.example."), domain("bogus.example.")],
            resolution
                .errors
                .iter()
                .map(|e| e.name.clone())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn session_merges_aliases_transitively() {
        let session = Session::new(&[]);
        let zone = Zone::new(
            ns_path(&[], ns_record("example.net.", &["ns.example.net."])),
            Vec::new(),
            [(domain("ns.example.net."), Failure::unknown_reason("timed out"))]
                .into_iter()
                .collect(),
        )
        .unwrap();
        session
            .zone_cell(&domain("example.net."))
            .set(ZoneStatus::Cut(Arc::new(zone)))
            .unwrap();
        session.add_alias(&domain("www.example.com."), &domain("web.example.org."));
        session.add_alias(&domain("web.example.org."), &domain("example.net."));

        let resolution = session.finish(MetricsSummary::default());
        let zone = resolution.zone(&domain("example.net.")).unwrap();

        assert_eq!(
            &[domain("web.example.org."), domain("www.example.com.")]
                .into_iter()
                .collect::<BTreeSet<_>>(),
            zone.aliases()
        );
        assert_eq!(
            Some(&[domain("example.net.")].into_iter().collect::<BTreeSet<_>>()),
            resolution.nameservers.get(&domain("ns.example.net."))
        );
    }

    #[test]
    fn session_tolerates_alias_loops() {
        let session = Session::new(&[]);
        session.add_alias(&domain("a.example."), &domain("b.example."));
        session.add_alias(&domain("b.example."), &domain("a.example."));

        let resolution = session.finish(MetricsSummary::default());

        assert_eq!(2, resolution.aliases.len());
        assert!(resolution.zones.is_empty());
    }
}
