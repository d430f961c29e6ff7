use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tokio::fs::read_to_string;

pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

pub const DNS_PORT: u16 = 53;

/// The first nameserver configured in a resolv.conf file, on the
/// standard DNS port.
pub async fn upstream_from_resolv_conf<P: AsRef<Path>>(path: P) -> io::Result<Option<SocketAddr>> {
    let data = read_to_string(path).await?;
    Ok(first_nameserver(&data).map(|ip| SocketAddr::new(ip, DNS_PORT)))
}

/// Find the first parseable `nameserver` line.
pub fn first_nameserver(data: &str) -> Option<IpAddr> {
    for line in data.lines() {
        let line = line.trim_start();
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let mut fields = line.split_whitespace();
        if fields.next() != Some("nameserver") {
            continue;
        }
        if let Some(Ok(address)) = fields.next().map(str::parse::<IpAddr>) {
            return Some(address);
        }
    }

    None
}
