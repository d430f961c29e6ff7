#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dns_types::names::DomainName;
use dns_types::records::{RecordKind, ResourceRecord};
use dns_types::test_util::domain;
use zone_resolver::answer::Answer;
use zone_resolver::{DnsClient, QueryError, ResolverSettings, RECURSION_LIMIT};

// ============================================================================
// Scripted upstream
// ============================================================================

/// An in-memory stand-in for a recursive resolver.  Names which have
/// records, or have descendants with records, exist; everything else
/// is `NXDOMAIN`.
///
/// Clones share records, injected failures, and query counts.
#[derive(Clone, Default)]
pub struct FakeInternet {
    records: Arc<Mutex<HashMap<(DomainName, RecordKind), Vec<String>>>>,
    failures: Arc<Mutex<HashMap<(DomainName, RecordKind), u32>>>,
    queries: Arc<Mutex<HashMap<(DomainName, RecordKind), u64>>>,
    total_queries: Arc<AtomicU64>,
}

impl FakeInternet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the records with fresh failures and counters.
    pub fn fresh_copy(&self) -> Self {
        let records = self.records.lock().unwrap().clone();
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    pub fn a(self, name: &str, addresses: &[Ipv4Addr]) -> Self {
        self.insert(name, RecordKind::A, addresses.iter().map(ToString::to_string).collect())
    }

    pub fn cname(self, name: &str, target: &str) -> Self {
        self.insert(name, RecordKind::CNAME, vec![domain(target).to_dotted_string()])
    }

    /// A CNAME with several targets, which no well-behaved upstream
    /// would ever return.
    pub fn forked_cname(self, name: &str, targets: &[&str]) -> Self {
        self.insert(name, RecordKind::CNAME, dotted(targets))
    }

    pub fn ns(self, name: &str, nameservers: &[&str]) -> Self {
        self.insert(name, RecordKind::NS, dotted(nameservers))
    }

    pub fn mx(self, name: &str, exchanges: &[&str]) -> Self {
        self.insert(name, RecordKind::MX, dotted(exchanges))
    }

    /// Make the next `times` queries for this name and kind time out.
    pub fn failing(self, name: &str, kind: RecordKind, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert((domain(name), kind), times);
        self
    }

    pub fn query_count(&self, name: &str, kind: RecordKind) -> u64 {
        self.queries
            .lock()
            .unwrap()
            .get(&(domain(name), kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    fn insert(self, name: &str, kind: RecordKind, values: Vec<String>) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert((domain(name), kind), values);
        self
    }

    fn exists(&self, name: &DomainName) -> bool {
        self.records
            .lock()
            .unwrap()
            .keys()
            .any(|(n, _)| n.is_subdomain_of(name))
    }

    fn lookup(&self, name: &DomainName, kind: RecordKind) -> Option<Vec<String>> {
        self.records
            .lock()
            .unwrap()
            .get(&(name.clone(), kind))
            .cloned()
    }
}

#[async_trait]
impl DnsClient for FakeInternet {
    async fn query(&self, name: &DomainName, kind: RecordKind) -> Result<Answer, QueryError> {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        *self
            .queries
            .lock()
            .unwrap()
            .entry((name.clone(), kind))
            .or_default() += 1;

        if let Some(remaining) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&(name.clone(), kind))
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(QueryError::Timeout);
            }
        }

        let mut aliases = Vec::new();
        let mut current = name.clone();
        if kind != RecordKind::CNAME {
            while let Some(targets) = self.lookup(&current, RecordKind::CNAME) {
                if aliases.len() == RECURSION_LIMIT {
                    return Err(QueryError::AliasChainTooLong { name: name.clone() });
                }
                let target = domain(&targets[0]);
                aliases.push(ResourceRecord::with_names(
                    current,
                    RecordKind::CNAME,
                    &[target.clone()],
                ));
                current = target;
            }
        }

        let record = match self.lookup(&current, kind) {
            Some(values) => ResourceRecord::new(current, kind, values),
            None if self.exists(&current) => ResourceRecord::no_answer(current, kind),
            None => ResourceRecord::non_existent(current, kind),
        };

        Ok(Answer::new(aliases, record))
    }
}

fn dotted(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| domain(n).to_dotted_string()).collect()
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn settings() -> ResolverSettings {
    ResolverSettings {
        retry_backoff: Duration::from_millis(1),
        ..ResolverSettings::default()
    }
}

pub fn names(names: &[&str]) -> Vec<DomainName> {
    names.iter().map(|n| domain(n)).collect()
}

/// A single-label zone with two in-zone nameservers, and a few hosts.
pub fn example_world() -> FakeInternet {
    FakeInternet::new()
        .ns("example.", &["ns1.example.", "ns2.example."])
        .a("ns1.example.", &[Ipv4Addr::new(192, 0, 2, 1)])
        .a("ns2.example.", &[Ipv4Addr::new(192, 0, 2, 2)])
        .a("a.example.", &[Ipv4Addr::new(192, 0, 2, 10)])
        .a("b.example.", &[Ipv4Addr::new(192, 0, 2, 11)])
        .a("c.example.", &[Ipv4Addr::new(192, 0, 2, 12)])
}

/// Two zones under different TLDs, one hosting the other's
/// nameservers, joined by aliases and a mail exchanger.
pub fn hosted_world() -> FakeInternet {
    FakeInternet::new()
        .ns("example.com.", &["ns1.dns.net.", "ns2.dns.net."])
        .ns("dns.net.", &["ns1.dns.net.", "ns2.dns.net."])
        .a("ns1.dns.net.", &[Ipv4Addr::new(198, 51, 100, 1)])
        .a("ns2.dns.net.", &[Ipv4Addr::new(198, 51, 100, 2)])
        .ns("example.net.", &["ns.example.net."])
        .a("ns.example.net.", &[Ipv4Addr::new(203, 0, 113, 53)])
        .a("www.example.com.", &[Ipv4Addr::new(203, 0, 113, 80)])
        .cname("alias.example.com.", "example.net.")
        .cname("chain.example.com.", "alias.example.com.")
        .mx("example.com.", &["mail.example.net."])
        .a("mail.example.net.", &[Ipv4Addr::new(203, 0, 113, 25)])
}
