#![warn(clippy::pedantic)]
// TODO: fix
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::semicolon_if_nothing_returned)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

pub mod answer;
pub mod cache;
pub mod client;
pub mod error_log;
pub mod metrics;
pub mod resolver;
pub mod util;

pub use self::cache::SharedCache;
pub use self::client::{DnsClient, QueryError, UpstreamClient};
pub use self::resolver::{Resolution, ResolveError, Resolver, ResolverSettings};

/// Maximum length of an alias chain.  A chain of CNAMEs longer than
/// this is treated as broken, whether it comes from the cache or from
/// an upstream response.
///
/// This is to protect against a maliciously-configured upstream
/// nameserver which returns an infinite stream of CNAME records.
pub const RECURSION_LIMIT: usize = 32;
