//! Asking a recursive resolver about a name, and turning its answer
//! into an `Answer`.

use async_trait::async_trait;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Instrument;

use dns_types::names::DomainName;
use dns_types::protocol::types::*;
use dns_types::protocol::{deserialise, serialise};
use dns_types::records::{RecordKind, ResourceRecord};

use crate::answer::Answer;
use crate::util::nameserver::{query_nameserver_tcp, query_nameserver_udp, response_matches_request};
use crate::util::net::TcpError;
use crate::RECURSION_LIMIT;

/// Something which can answer questions about names.
///
/// Negative answers (the name does not exist, or has no records of
/// that kind) are `Ok`: an `Err` means no usable answer was obtained
/// at all, and asking again might help.
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn query(&self, name: &DomainName, kind: RecordKind) -> Result<Answer, QueryError>;
}

/// A client for a single upstream recursive resolver.  Queries go
/// over UDP first, falling back to TCP if the UDP response is
/// truncated or does not arrive.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    pub address: SocketAddr,
    pub query_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(address: SocketAddr, query_timeout: Duration) -> Self {
        Self {
            address,
            query_timeout,
        }
    }
}

#[async_trait]
impl DnsClient for UpstreamClient {
    async fn query(&self, name: &DomainName, kind: RecordKind) -> Result<Answer, QueryError> {
        let request = Message::recursive_query(
            rand::thread_rng().gen(),
            Question {
                name: name.clone(),
                qtype: kind.into(),
                qclass: RecordClass::IN,
            },
        );
        let mut serialised = request.clone().to_octets().map_err(QueryError::Serialise)?;

        let response = async {
            match query_nameserver_udp(self.address, self.query_timeout, &mut serialised).await {
                Ok(response) if !response.header.flags.is_truncated() => Ok(response),
                Ok(_) => {
                    tracing::trace!("UDP response truncated, retrying over TCP");
                    query_nameserver_tcp(self.address, self.query_timeout, &mut serialised).await
                }
                Err(error) => {
                    tracing::trace!(%error, "UDP query failed, retrying over TCP");
                    query_nameserver_tcp(self.address, self.query_timeout, &mut serialised).await
                }
            }
        }
        .instrument(tracing::error_span!("query_upstream", address = %self.address))
        .await?;

        if !response_matches_request(&request, &response) {
            return Err(QueryError::Mismatched);
        }

        interpret_response(name, kind, &response)
    }
}

/// Turn a response from a recursive resolver into an `Answer`.
///
/// # Errors
///
/// If the response is truncated, signals an error other than a name
/// error, or has an alias chain which loops, is too long, or forks.
pub fn interpret_response(
    name: &DomainName,
    kind: RecordKind,
    response: &Message,
) -> Result<Answer, QueryError> {
    if response.header.flags.is_truncated() {
        return Err(QueryError::Truncated);
    }

    let (canonical_name, aliases) = if kind == RecordKind::CNAME {
        (name.clone(), Vec::new())
    } else {
        follow_cnames(&response.answers, name)?
    };

    let record = match response.header.flags.rcode() {
        Rcode::NOERROR => {
            let values = record_values(&response.answers, &canonical_name, kind);
            if kind == RecordKind::CNAME && values.len() > 1 {
                return Err(QueryError::AmbiguousAlias {
                    name: canonical_name,
                });
            }
            ResourceRecord::new(canonical_name, kind, values)
        }
        Rcode::NXDOMAIN => ResourceRecord::non_existent(canonical_name, kind),
        rcode => return Err(QueryError::Rcode(rcode)),
    };

    Ok(Answer::new(aliases, record))
}

/// The values of every record of `kind` at `name`.  MX exchanges are
/// ordered by preference.
fn record_values(rrs: &[WireRecord], name: &DomainName, kind: RecordKind) -> Vec<String> {
    let mut exchanges = Vec::new();
    let mut values = Vec::new();

    for rr in rrs.iter().filter(|rr| &rr.name == name) {
        match (&rr.data, kind) {
            (RecordData::A { address }, RecordKind::A) => values.push(address.to_string()),
            (RecordData::NS { nsdname }, RecordKind::NS) => {
                values.push(nsdname.to_dotted_string());
            }
            (RecordData::CNAME { cname }, RecordKind::CNAME) => {
                let cname = cname.to_dotted_string();
                if !values.contains(&cname) {
                    values.push(cname);
                }
            }
            (
                RecordData::MX {
                    preference,
                    exchange,
                },
                RecordKind::MX,
            ) => exchanges.push((*preference, exchange.to_dotted_string())),
            _ => (),
        }
    }

    exchanges.sort_by_key(|(preference, _)| *preference);
    values.extend(exchanges.into_iter().map(|(_, exchange)| exchange));
    values
}

/// Given a set of RRs and a domain name we're looking for, follow
/// `CNAME`s in the response and return the final name and the hops
/// taken, in order.
///
/// # Errors
///
/// If the chain loops, is longer than `RECURSION_LIMIT`, or reaches a
/// name with more than one CNAME target.
pub fn follow_cnames(
    rrs: &[WireRecord],
    target: &DomainName,
) -> Result<(DomainName, Vec<ResourceRecord>), QueryError> {
    let mut cname_map = HashMap::<&DomainName, &DomainName>::new();
    let mut forks = HashSet::<&DomainName>::new();
    for rr in rrs {
        if let RecordData::CNAME { cname } = &rr.data {
            if let Some(previous) = cname_map.insert(&rr.name, cname) {
                if previous != cname {
                    forks.insert(&rr.name);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut hops = Vec::new();
    let mut final_name = target.clone();
    seen.insert(final_name.clone());
    while let Some(next) = cname_map.get(&final_name) {
        if forks.contains(&final_name) {
            return Err(QueryError::AmbiguousAlias { name: final_name });
        }
        if seen.contains(*next) {
            return Err(QueryError::AliasLoop {
                name: target.clone(),
            });
        }
        if hops.len() == RECURSION_LIMIT {
            return Err(QueryError::AliasChainTooLong {
                name: target.clone(),
            });
        }

        seen.insert((*next).clone());
        hops.push(ResourceRecord::with_names(
            final_name,
            RecordKind::CNAME,
            &[(*next).clone()],
        ));
        final_name = (*next).clone();
    }

    Ok((final_name, hops))
}

/// Why a query did not produce an answer.
#[derive(Debug)]
pub enum QueryError {
    Timeout,
    Io(io::Error),
    Tcp(TcpError),
    Serialise(serialise::Error),
    Malformed(deserialise::Error),
    Mismatched,
    Truncated,
    Rcode(Rcode),
    AliasLoop { name: DomainName },
    AliasChainTooLong { name: DomainName },
    AmbiguousAlias { name: DomainName },
}

impl QueryError {
    /// Whether asking again might give a different result.  Malformed
    /// alias chains will not fix themselves.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            QueryError::AliasLoop { .. }
                | QueryError::AliasChainTooLong { .. }
                | QueryError::AmbiguousAlias { .. }
        )
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::Timeout => write!(f, "timed out"),
            QueryError::Io(error) => write!(f, "I/O error: {error}"),
            QueryError::Tcp(error) => write!(f, "TCP error: {error}"),
            QueryError::Serialise(error) => write!(f, "could not serialise query: {error}"),
            QueryError::Malformed(error) => write!(f, "malformed response: {error}"),
            QueryError::Mismatched => write!(f, "response does not match query"),
            QueryError::Truncated => write!(f, "response truncated"),
            QueryError::Rcode(rcode) => write!(f, "upstream returned {rcode}"),
            QueryError::AliasLoop { name } => write!(f, "alias chain from {name} loops"),
            QueryError::AliasChainTooLong { name } => write!(
                f,
                "alias chain from {name} is longer than {RECURSION_LIMIT} hops"
            ),
            QueryError::AmbiguousAlias { name } => {
                write!(f, "{name} has more than one CNAME target")
            }
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Io(error) => Some(error),
            QueryError::Tcp(error) => Some(error),
            QueryError::Serialise(error) => Some(error),
            QueryError::Malformed(error) => Some(error),
            _ => None,
        }
    }
}
