//! The plain-text report printed at the end of a run.

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use dns_types::names::DomainName;
use ip_asn::AsnTable;
use zone_resolver::Resolution;

pub struct Report<'a> {
    pub resolution: &'a Resolution,
    pub asn_table: Option<&'a AsnTable>,
}

impl Report<'_> {
    fn write_address(&self, f: &mut fmt::Formatter, address: Ipv4Addr) -> fmt::Result {
        write!(f, " {address}")?;
        if let Some(table) = self.asn_table {
            match table.annotate(address) {
                Ok(annotation) => {
                    write!(
                        f,
                        " [AS{} {} {} {}; range",
                        annotation.entry.as_number,
                        annotation.network,
                        annotation.entry.country_code,
                        annotation.entry.description
                    )?;
                    for block in &annotation.summary {
                        write!(f, " {block}")?;
                    }
                    write!(f, "]")?;
                }
                Err(error) => write!(f, " [{error}]")?,
            }
        }
        Ok(())
    }
}

fn write_names(f: &mut fmt::Formatter, names: &BTreeSet<DomainName>) -> fmt::Result {
    for name in names {
        write!(f, " {name}")?;
    }
    writeln!(f)
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let resolution = self.resolution;

        writeln!(f, "ZONES")?;
        for zone in &resolution.zones {
            writeln!(f, "{}", zone.name())?;
            for path in zone.nameservers() {
                write!(f, "\tnameserver {}", path.queried_name())?;
                for address in path.addresses() {
                    self.write_address(f, address)?;
                }
                writeln!(f)?;
            }
            for (name, failure) in zone.unresolved_nameservers() {
                writeln!(f, "\tunresolved {name} {}: {}", failure.kind, failure.message)?;
            }
            for alias in zone.aliases() {
                writeln!(f, "\talias {alias}")?;
            }
        }

        writeln!(f, "\nDEPENDENCIES")?;
        for (name, dependencies) in &resolution.dependencies {
            write!(f, "{name}\t->")?;
            write_names(f, dependencies)?;
        }

        writeln!(f, "\nNAMESERVERS")?;
        for (name, zones) in &resolution.nameservers {
            write!(f, "{name}\tserves")?;
            write_names(f, zones)?;
        }

        writeln!(f, "\nMAIL EXCHANGERS")?;
        for (name, path) in &resolution.mail_exchangers {
            write!(f, "{name}\t->")?;
            for exchange in path.exchanges() {
                write!(f, " {exchange}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\nERRORS")?;
        for entry in &resolution.errors {
            writeln!(f, "{entry}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dns_types::failures::Failure;
    use dns_types::test_util::*;
    use dns_types::zones::Zone;
    use std::collections::BTreeMap;
    use zone_resolver::error_log::ErrorLogEntry;
    use zone_resolver::metrics::MetricsSummary;

    use super::*;

    fn resolution() -> Resolution {
        let mut zone = Zone::new(
            ns_path(
                &[],
                ns_record("example.com.", &["ns1.example.net.", "ns2.example.net."]),
            ),
            vec![a_path(
                &[],
                a_record("ns1.example.net.", Ipv4Addr::new(10, 0, 2, 10)),
            )],
            [(
                domain("ns2.example.net."),
                Failure::domain_non_existent("ns2.example.net. does not exist"),
            )]
            .into_iter()
            .collect(),
        )
        .unwrap();
        zone.add_alias(domain("www.example.org."));

        let mut dependencies = BTreeMap::new();
        dependencies.insert(
            domain("example.com."),
            [domain("example.net.")].into_iter().collect(),
        );

        Resolution {
            zones: vec![zone],
            dependencies,
            nameservers: BTreeMap::new(),
            aliases: BTreeMap::new(),
            mail_exchangers: BTreeMap::new(),
            errors: vec![ErrorLogEntry::new(
                domain("ns2.example.net."),
                Failure::domain_non_existent("ns2.example.net. does not exist"),
            )],
            metrics: MetricsSummary::default(),
        }
    }

    #[test]
    fn renders_every_section() {
        let resolution = resolution();
        let report = Report {
            resolution: &resolution,
            asn_table: None,
        }
        .to_string();

        assert_eq!(
            "ZONES
example.com.
\tnameserver ns1.example.net. 10.0.2.10
\tunresolved ns2.example.net. DomainNonExistent: ns2.example.net. does not exist
\talias www.example.org.

DEPENDENCIES
example.com.\t-> example.net.

NAMESERVERS

MAIL EXCHANGERS

ERRORS
ns2.example.net.\tDomainNonExistent\tns2.example.net. does not exist
",
            report
        );
    }

    #[test]
    fn annotates_addresses() {
        let resolution = resolution();
        let table =
            AsnTable::deserialise("10.0.1.0\t10.0.3.255\t200\tZZ\tEXAMPLE-200\n").unwrap();
        let report = Report {
            resolution: &resolution,
            asn_table: Some(&table),
        }
        .to_string();

        assert!(report.contains(
            "\tnameserver ns1.example.net. 10.0.2.10 [AS200 10.0.2.0/23 ZZ EXAMPLE-200; range 10.0.1.0/24 10.0.2.0/23]\n"
        ));
    }
}
