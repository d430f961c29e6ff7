use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use dns_types::names::DomainName;
use zone_resolver::error_log;
use zone_resolver::util::resolv_conf::{upstream_from_resolv_conf, RESOLV_CONF_PATH};
use zone_resolver::{Resolver, SharedCache, UpstreamClient};

mod fs_util;
mod report;
mod settings;

use self::fs_util::*;
use self::report::Report;
use self::settings::{Settings, Upstream};

// the doc comments for this struct turn into the CLI help text
#[derive(Debug, Parser)]
/// Map the DNS zones a set of domain names depend on.
///
/// For each name, zonedeps follows its CNAME aliases, finds the zones
/// it is delegated through and their nameservers, and then does the
/// same for the nameservers' own names.  Every lookup goes through a
/// recursive resolver, and every answer is cached, so a saved cache
/// can be replayed offline.
///
/// Settings are read from the configuration file, then from ZONEDEPS_*
/// environment variables, then from the command line.
struct Args {
    /// Domain names to walk
    #[arg(value_parser = parse_domain)]
    domains: Vec<DomainName>,

    /// File of domain names to walk, one per line
    #[arg(short = 'f', long)]
    domains_file: Option<PathBuf>,

    /// Path to a YAML configuration file
    #[arg(short, long, env = "ZONEDEPS_CONFIG")]
    config: Option<PathBuf>,

    /// Recursive resolver to send queries to, as address or
    /// address:port (default: the first nameserver in
    /// /etc/resolv.conf)
    #[arg(short, long, value_parser = parse_upstream)]
    upstream: Option<SocketAddr>,

    /// How many names to walk at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// How many times to repeat a query which failed for an unknown
    /// reason
    #[arg(long)]
    retries: Option<u32>,

    /// Cache snapshot to load before walking (if it exists) and to
    /// save afterwards
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// IP-to-ASN table to annotate nameserver addresses with
    #[arg(long)]
    asn_table: Option<PathBuf>,

    /// File to write the error log to
    #[arg(long)]
    error_log: Option<PathBuf>,

    /// Also walk the mail exchangers of each name
    #[arg(long)]
    mail_exchangers: bool,

    /// Log in JSON rather than plain text
    #[arg(long)]
    json_logs: bool,
}

fn parse_domain(s: &str) -> Result<DomainName, String> {
    DomainName::from_dotted_string(s).map_err(|error| error.to_string())
}

fn parse_upstream(s: &str) -> Result<SocketAddr, String> {
    Upstream::parse(s)
        .map(|upstream| upstream.address)
        .ok_or_else(|| format!("'{s}' is not an IP address or address:port"))
}

impl Args {
    /// Command-line arguments take priority over the settings file.
    fn override_settings(&self, settings: &mut Settings) {
        if self.domains_file.is_some() {
            settings.domains_file.clone_from(&self.domains_file);
        }
        if let Some(address) = self.upstream {
            settings.upstream = Some(Upstream { address });
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(retries) = self.retries {
            settings.retries = retries;
        }
        if self.cache_file.is_some() {
            settings.cache_file.clone_from(&self.cache_file);
        }
        if self.asn_table.is_some() {
            settings.asn_table.clone_from(&self.asn_table);
        }
        if self.error_log.is_some() {
            settings.error_log.clone_from(&self.error_log);
        }
        if self.mail_exchangers {
            settings.mail_exchangers = true;
        }
    }
}

fn begin_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let logger = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        logger.json().init();
    } else {
        logger.init();
    }
}

async fn input_names(args: &Args, settings: &Settings) -> Vec<DomainName> {
    let mut names = args.domains.clone();
    names.extend(settings.domains.iter().map(|name| name.domain.clone()));

    if let Some(path) = &settings.domains_file {
        match domains_from_file(path).await {
            Ok(Ok(from_file)) => names.extend(from_file),
            Ok(Err(error)) => {
                tracing::error!(?path, %error, "could not parse domains file");
                process::exit(1);
            }
            Err(error) => {
                tracing::error!(?path, %error, "could not read domains file");
                process::exit(1);
            }
        }
    }

    names.sort();
    names.dedup();
    names
}

async fn upstream_address(settings: &Settings) -> SocketAddr {
    if let Some(upstream) = settings.upstream {
        return upstream.address;
    }

    match upstream_from_resolv_conf(RESOLV_CONF_PATH).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            tracing::error!(path = %RESOLV_CONF_PATH, "no nameserver configured, use --upstream");
            process::exit(1);
        }
        Err(error) => {
            tracing::error!(path = %RESOLV_CONF_PATH, %error, "could not read resolver configuration, use --upstream");
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    begin_logging(args.json_logs);

    let mut settings = match Settings::new(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(error) => {
            tracing::error!(%error, "could not read settings");
            process::exit(1);
        }
    };
    args.override_settings(&mut settings);

    let names = input_names(&args, &settings).await;
    if names.is_empty() {
        tracing::error!("no domain names given");
        process::exit(1);
    }

    let upstream = upstream_address(&settings).await;

    let cache = if let Some(path) = &settings.cache_file {
        match cache_from_file(path).await {
            Ok(Ok(cache)) => {
                tracing::info!(?path, records = %cache.len(), "loaded cache");
                cache
            }
            Ok(Err(error)) => {
                tracing::error!(?path, %error, "could not parse cache file");
                process::exit(1);
            }
            Err(error) => {
                tracing::error!(?path, %error, "could not read cache file");
                process::exit(1);
            }
        }
    } else {
        SharedCache::new()
    };

    let asn_table = if let Some(path) = &settings.asn_table {
        match asn_table_from_file(path).await {
            Ok(Ok(table)) => {
                tracing::info!(?path, rows = %table.len(), "loaded ASN table");
                Some(table)
            }
            Ok(Err(error)) => {
                tracing::error!(?path, %error, "could not parse ASN table");
                process::exit(1);
            }
            Err(error) => {
                tracing::error!(?path, %error, "could not read ASN table");
                process::exit(1);
            }
        }
    } else {
        None
    };

    tracing::info!(%upstream, names = %names.len(), "walking");

    let client = UpstreamClient::new(upstream, settings.query_timeout());
    let resolver = Resolver::new(client, cache.clone(), settings.resolver_settings());
    let resolution = match resolver.resolve(&names).await {
        Ok(resolution) => resolution,
        Err(error) => {
            tracing::error!(%error, "walk failed");
            process::exit(1);
        }
    };

    print!(
        "{}",
        Report {
            resolution: &resolution,
            asn_table: asn_table.as_ref(),
        }
    );

    if let Some(path) = &settings.cache_file {
        if let Err(error) = cache.save_to_file(path).await {
            tracing::error!(?path, %error, "could not save cache");
            process::exit(1);
        }
        tracing::info!(?path, records = %cache.len(), "saved cache");
    }

    if let Some(path) = &settings.error_log {
        if let Err(error) = error_log::write_to_file(path, &resolution.errors).await {
            tracing::error!(?path, %error, "could not write error log");
            process::exit(1);
        }
    }

    tracing::info!(
        zones = %resolution.zones.len(),
        errors = %resolution.errors.len(),
        metrics = %resolution.metrics,
        "done"
    );
}
