#![allow(clippy::missing_panics_doc)]

use arbitrary::{Arbitrary, Unstructured};
use rand::Rng;
use std::net::Ipv4Addr;

use crate::names::DomainName;
use crate::paths::{APath, NSPath, PathBuilder};
use crate::records::{RecordKind, ResourceRecord};

pub fn arbitrary_domain() -> DomainName {
    let mut rng = rand::thread_rng();
    for size in [64, 128, 256, 512] {
        let mut buf = Vec::with_capacity(size);
        for _ in 0..size {
            buf.push(rng.gen());
        }

        if let Ok(name) = DomainName::arbitrary(&mut Unstructured::new(&buf)) {
            return name;
        }
    }

    panic!("could not generate arbitrary value!");
}

pub fn domain(name: &str) -> DomainName {
    DomainName::from_dotted_string(name).unwrap()
}

pub fn a_record(name: &str, address: Ipv4Addr) -> ResourceRecord {
    ResourceRecord::with_addresses(domain(name), &[address])
}

pub fn cname_record(name: &str, target_name: &str) -> ResourceRecord {
    ResourceRecord::with_names(domain(name), RecordKind::CNAME, &[domain(target_name)])
}

pub fn ns_record(superdomain_name: &str, nameserver_names: &[&str]) -> ResourceRecord {
    ResourceRecord::with_names(
        domain(superdomain_name),
        RecordKind::NS,
        &nameserver_names
            .iter()
            .map(|n| domain(n))
            .collect::<Vec<_>>(),
    )
}

pub fn mx_record(name: &str, exchange_names: &[&str]) -> ResourceRecord {
    ResourceRecord::with_names(
        domain(name),
        RecordKind::MX,
        &exchange_names.iter().map(|n| domain(n)).collect::<Vec<_>>(),
    )
}

pub fn no_answer_record(name: &str, kind: RecordKind) -> ResourceRecord {
    ResourceRecord::no_answer(domain(name), kind)
}

pub fn nx_domain_record(name: &str, kind: RecordKind) -> ResourceRecord {
    ResourceRecord::non_existent(domain(name), kind)
}

pub fn a_path(aliases: &[ResourceRecord], terminal: ResourceRecord) -> APath {
    APath::try_from(build_path(aliases, terminal)).unwrap()
}

pub fn ns_path(aliases: &[ResourceRecord], terminal: ResourceRecord) -> NSPath {
    NSPath::try_from(build_path(aliases, terminal)).unwrap()
}

fn build_path(aliases: &[ResourceRecord], terminal: ResourceRecord) -> crate::paths::Path {
    let mut builder = PathBuilder::new();
    for alias in aliases {
        builder = builder.add_alias(alias.clone()).unwrap();
    }
    builder.complete_resolution(terminal).unwrap().build().unwrap()
}
