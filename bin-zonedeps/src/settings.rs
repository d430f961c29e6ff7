use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dns_types::names::DomainName;
use zone_resolver::util::resolv_conf::DNS_PORT;
use zone_resolver::ResolverSettings;

/// Prefix of environment variables which override the configuration
/// file, eg `ZONEDEPS_CONCURRENCY=16`.
pub const ENV_PREFIX: &str = "ZONEDEPS";

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub domains: Vec<Name>,
    pub domains_file: Option<PathBuf>,
    pub upstream: Option<Upstream>,
    pub cache_file: Option<PathBuf>,
    pub asn_table: Option<PathBuf>,
    pub error_log: Option<PathBuf>,
    pub concurrency: usize,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub query_timeout_ms: u64,
    pub walk_root: bool,
    pub walk_tlds: bool,
    pub mail_exchangers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let resolver = ResolverSettings::default();
        Self {
            domains: Vec::new(),
            domains_file: None,
            upstream: None,
            cache_file: None,
            asn_table: None,
            error_log: None,
            concurrency: resolver.max_concurrency,
            retries: resolver.retries,
            retry_backoff_ms: u64::try_from(resolver.retry_backoff.as_millis()).unwrap_or(250),
            query_timeout_ms: 5000,
            walk_root: resolver.walk_root,
            walk_tlds: resolver.walk_tlds,
            mail_exchangers: resolver.collect_mail_exchangers,
        }
    }
}

impl Settings {
    /// Read settings from an optional file, then from `ZONEDEPS_*`
    /// environment variables.
    pub fn new(filename: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(filename) = filename {
            builder = builder.add_source(File::from(filename));
        }
        Self::from_builder(builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)))
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            walk_root: self.walk_root,
            walk_tlds: self.walk_tlds,
            collect_mail_exchangers: self.mail_exchangers,
            max_concurrency: self.concurrency,
            retries: self.retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// A domain name in a configuration file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Name {
    pub domain: DomainName,
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NameVisitor;

        impl<'de> Visitor<'de> for NameVisitor {
            type Value = Name;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a domain name")
            }

            fn visit_str<E>(self, v: &str) -> Result<Name, E>
            where
                E: de::Error,
            {
                match DomainName::from_dotted_string(v) {
                    Ok(domain) => Ok(Name { domain }),
                    Err(_) => Err(de::Error::invalid_value(
                        Unexpected::Str(v),
                        &"a valid domain name",
                    )),
                }
            }
        }

        deserializer.deserialize_str(NameVisitor)
    }
}

/// The address of the upstream resolver.  The port may be left off,
/// in which case it is 53.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Upstream {
    pub address: SocketAddr,
}

impl Upstream {
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(address) = s.parse::<SocketAddr>() {
            return Some(Self { address });
        }
        s.parse::<IpAddr>().ok().map(|ip| Self {
            address: SocketAddr::new(ip, DNS_PORT),
        })
    }
}

impl<'de> Deserialize<'de> for Upstream {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UpstreamVisitor;

        impl<'de> Visitor<'de> for UpstreamVisitor {
            type Value = Upstream;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an IP address, with or without a port")
            }

            fn visit_str<E>(self, v: &str) -> Result<Upstream, E>
            where
                E: de::Error,
            {
                Upstream::parse(v).ok_or_else(|| {
                    de::Error::invalid_value(Unexpected::Str(v), &"an IP address or address:port")
                })
            }
        }

        deserializer.deserialize_str(UpstreamVisitor)
    }
}
