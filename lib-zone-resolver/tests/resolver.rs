mod helpers;

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use dns_types::failures::FailureKind;
use dns_types::names::DomainName;
use dns_types::paths::Path;
use dns_types::records::{RecordKind, RecordValues, ResourceRecord};
use dns_types::test_util::domain;
use zone_resolver::{Resolution, Resolver, ResolverSettings, SharedCache};

use helpers::*;

fn zone_names(resolution: &Resolution) -> Vec<DomainName> {
    resolution.zones.iter().map(|z| z.name().clone()).collect()
}

fn has_error(resolution: &Resolution, name: &str, kind: FailureKind) -> bool {
    resolution
        .errors
        .iter()
        .any(|e| e.name == domain(name) && e.kind == kind)
}

fn depends_on(resolution: &Resolution, from: &str, to: &str) -> bool {
    resolution
        .dependencies
        .get(&domain(from))
        .is_some_and(|deps| deps.contains(&domain(to)))
}

#[tokio::test]
async fn names_in_one_zone_share_it() {
    let world = example_world();
    let resolver = Resolver::new(world.clone(), SharedCache::new(), settings());

    let resolution = resolver
        .resolve(&names(&["a.example.", "b.example."]))
        .await
        .unwrap();

    assert_eq!(vec![domain("example.")], zone_names(&resolution));
    assert!(depends_on(&resolution, "a.example.", "example."));
    assert!(depends_on(&resolution, "b.example.", "example."));
    assert!(!resolution.dependencies.contains_key(&domain("example.")));
    assert!(resolution.errors.is_empty());

    let zone = resolution.zone(&domain("example.")).unwrap();
    assert_eq!(2, zone.nameservers().len());
    assert!(zone.unresolved_nameservers().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_zone_is_built_once() {
    let world = example_world();
    let resolver = Resolver::new(world.clone(), SharedCache::new(), settings());

    resolver
        .resolve(&names(&["a.example.", "b.example.", "c.example."]))
        .await
        .unwrap();

    assert_eq!(1, world.query_count("example.", RecordKind::NS));
    assert_eq!(1, world.query_count("ns1.example.", RecordKind::A));
    assert_eq!(1, world.query_count("ns2.example.", RecordKind::A));
}

#[tokio::test]
async fn second_walk_on_shared_cache_is_offline() {
    let world = hosted_world();
    let cache = SharedCache::new();
    let settings = ResolverSettings {
        collect_mail_exchangers: true,
        ..settings()
    };
    let inputs = names(&["www.example.com.", "chain.example.com.", "example.com."]);

    let first = Resolver::new(world.clone(), cache.clone(), settings.clone())
        .resolve(&inputs)
        .await
        .unwrap();
    assert!(world.total_queries() > 0);

    let replay = world.fresh_copy();
    let second = Resolver::new(replay.clone(), cache.clone(), settings)
        .resolve(&inputs)
        .await
        .unwrap();

    assert_eq!(0, replay.total_queries());
    assert_eq!(0, second.metrics.live_queries);
    assert_eq!(0, second.metrics.cache_misses);
    assert_eq!(zone_names(&first), zone_names(&second));
    for (one, two) in first.zones.iter().zip(&second.zones) {
        assert_eq!(one.nameservers(), two.nameservers());
        assert_eq!(one.aliases(), two.aliases());
    }
    assert_eq!(first.dependencies, second.dependencies);
    assert_eq!(first.nameservers, second.nameservers);
    assert_eq!(first.errors, second.errors);
}

#[tokio::test]
async fn non_existent_names_are_cached_and_not_retried() {
    let world = example_world();
    let cache = SharedCache::new();

    let first = Resolver::new(world.clone(), cache.clone(), settings())
        .resolve(&names(&["bogus.example."]))
        .await
        .unwrap();

    assert!(has_error(&first, "bogus.example.", FailureKind::DomainNonExistent));
    assert_eq!(1, world.query_count("bogus.example.", RecordKind::CNAME));
    assert_eq!(0, first.metrics.retries);
    assert_eq!(
        Some(RecordValues::NonExistent),
        cache
            .lookup_first(&domain("bogus.example."), RecordKind::CNAME)
            .map(|rr| rr.values)
    );

    let replay = world.fresh_copy();
    let second = Resolver::new(replay.clone(), cache, settings())
        .resolve(&names(&["bogus.example."]))
        .await
        .unwrap();

    assert_eq!(0, replay.total_queries());
    assert_eq!(first.errors, second.errors);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let world = example_world().failing("a.example.", RecordKind::CNAME, 1);
    let resolver = Resolver::new(world.clone(), SharedCache::new(), settings());

    let resolution = resolver.resolve(&names(&["a.example."])).await.unwrap();

    assert!(resolution.errors.is_empty());
    assert_eq!(2, world.query_count("a.example.", RecordKind::CNAME));
    assert_eq!(1, resolution.metrics.retries);
    assert!(depends_on(&resolution, "a.example.", "example."));
}

#[tokio::test]
async fn retries_are_bounded() {
    let world = example_world().failing("a.example.", RecordKind::CNAME, 10);
    let settings = ResolverSettings {
        retries: 2,
        ..settings()
    };
    let resolver = Resolver::new(world.clone(), SharedCache::new(), settings);

    let resolution = resolver
        .resolve(&names(&["a.example.", "b.example."]))
        .await
        .unwrap();

    assert!(has_error(&resolution, "a.example.", FailureKind::UnknownReason));
    assert_eq!(3, world.query_count("a.example.", RecordKind::CNAME));
    assert_eq!(1, resolution.metrics.failed_queries);

    // one name failing does not stop the rest
    assert_eq!(vec![domain("example.")], zone_names(&resolution));
    assert!(depends_on(&resolution, "b.example.", "example."));
}

#[tokio::test]
async fn unresolvable_nameservers_are_kept_and_logged() {
    let world = FakeInternet::new()
        .ns("broken.test.", &["ns1.broken.test.", "ghost.nowhere.test."])
        .a("ns1.broken.test.", &[Ipv4Addr::new(192, 0, 2, 53)])
        .a("www.broken.test.", &[Ipv4Addr::new(192, 0, 2, 80)]);
    let resolver = Resolver::new(world, SharedCache::new(), settings());

    let resolution = resolver.resolve(&names(&["www.broken.test."])).await.unwrap();

    let zone = resolution.zone(&domain("broken.test.")).unwrap();
    assert_eq!(vec![domain("ns1.broken.test.")], zone.resolved_nameserver_names());
    assert_eq!(
        Some(FailureKind::DomainNonExistent),
        zone.unresolved_nameservers()
            .get(&domain("ghost.nowhere.test."))
            .map(|f| f.kind)
    );
    assert!(has_error(
        &resolution,
        "ghost.nowhere.test.",
        FailureKind::DomainNonExistent
    ));
    assert_eq!(
        Some(&[domain("broken.test.")].into_iter().collect::<BTreeSet<_>>()),
        resolution.nameservers.get(&domain("ghost.nowhere.test."))
    );
}

#[tokio::test]
async fn zones_depend_on_their_nameservers_zones() {
    let world = hosted_world();
    let resolver = Resolver::new(world, SharedCache::new(), settings());

    let resolution = resolver.resolve(&names(&["www.example.com."])).await.unwrap();

    assert_eq!(
        vec![domain("dns.net."), domain("example.com.")],
        zone_names(&resolution)
    );
    assert!(depends_on(&resolution, "example.com.", "dns.net."));
    assert!(depends_on(&resolution, "www.example.com.", "example.com."));
    assert!(!resolution.dependencies.contains_key(&domain("dns.net.")));
    assert_eq!(
        Some(
            &[domain("dns.net."), domain("example.com.")]
                .into_iter()
                .collect::<BTreeSet<_>>()
        ),
        resolution.nameservers.get(&domain("ns1.dns.net."))
    );
}

#[tokio::test]
async fn aliases_merge_into_the_zone_they_reach() {
    let world = hosted_world();
    let resolver = Resolver::new(world, SharedCache::new(), settings());

    let resolution = resolver
        .resolve(&names(&["chain.example.com."]))
        .await
        .unwrap();

    let zone = resolution.zone(&domain("example.net.")).unwrap();
    assert_eq!(
        &[domain("alias.example.com."), domain("chain.example.com.")]
            .into_iter()
            .collect::<BTreeSet<_>>(),
        zone.aliases()
    );
    assert_eq!(
        Some(&domain("alias.example.com.")),
        resolution.aliases.get(&domain("chain.example.com."))
    );
    assert!(depends_on(&resolution, "chain.example.com.", "example.com."));
    assert!(depends_on(&resolution, "chain.example.com.", "example.net."));
    assert!(resolution.errors.is_empty());
    assert!(resolution
        .zones
        .windows(2)
        .all(|pair| pair[0].name() < pair[1].name()));
}

#[tokio::test]
async fn alias_loops_are_logged() {
    let world = example_world()
        .cname("loop1.example.", "loop2.example.")
        .cname("loop2.example.", "loop1.example.");
    let resolver = Resolver::new(world, SharedCache::new(), settings());

    let resolution = resolver.resolve(&names(&["loop1.example."])).await.unwrap();

    assert!(has_error(&resolution, "loop1.example.", FailureKind::UnknownReason));
    assert_eq!(vec![domain("example.")], zone_names(&resolution));
}

#[tokio::test]
async fn forked_aliases_fail_only_their_name() {
    let world = example_world().forked_cname("weird.example.", &["x.example.", "y.example."]);
    let cache = SharedCache::new();
    let resolver = Resolver::new(world, cache.clone(), settings());

    let resolution = resolver
        .resolve(&names(&["a.example.", "weird.example."]))
        .await
        .unwrap();

    assert!(has_error(&resolution, "weird.example.", FailureKind::UnknownReason));
    assert!(depends_on(&resolution, "a.example.", "example."));
    assert_eq!(vec![domain("example.")], zone_names(&resolution));
    assert!(cache
        .lookup_first(&domain("weird.example."), RecordKind::CNAME)
        .is_none());
}

#[tokio::test]
async fn forked_aliases_in_the_cache_fail_only_their_name() {
    let world = example_world();
    let cache = SharedCache::new();
    cache.add_entry(ResourceRecord::with_names(
        domain("weird.example."),
        RecordKind::CNAME,
        &[domain("x.example."), domain("y.example.")],
    ));
    let resolver = Resolver::new(world.clone(), cache, settings());

    let resolution = resolver
        .resolve(&names(&["a.example.", "weird.example."]))
        .await
        .unwrap();

    assert!(has_error(&resolution, "weird.example.", FailureKind::UnknownReason));
    assert!(depends_on(&resolution, "a.example.", "example."));
    assert_eq!(0, world.query_count("weird.example.", RecordKind::CNAME));
}

#[tokio::test]
async fn mail_exchangers_are_collected_when_asked() {
    let world = hosted_world();
    let settings = ResolverSettings {
        collect_mail_exchangers: true,
        ..settings()
    };
    let resolver = Resolver::new(world, SharedCache::new(), settings);

    let resolution = resolver.resolve(&names(&["example.com."])).await.unwrap();

    let path = resolution
        .mail_exchangers
        .get(&domain("example.com."))
        .unwrap();
    assert_eq!(vec![domain("mail.example.net.")], path.exchanges());
    assert!(depends_on(&resolution, "example.com.", "example.net."));
    assert!(depends_on(&resolution, "example.com.", "dns.net."));
    assert!(resolution.zone(&domain("example.net.")).is_some());
}

#[tokio::test]
async fn mail_exchangers_are_not_collected_by_default() {
    let world = hosted_world();
    let resolver = Resolver::new(world.clone(), SharedCache::new(), settings());

    let resolution = resolver.resolve(&names(&["example.com."])).await.unwrap();

    assert!(resolution.mail_exchangers.is_empty());
    assert_eq!(0, world.query_count("example.com.", RecordKind::MX));
}

#[tokio::test]
async fn lookup_goes_to_the_network_once() {
    let world = hosted_world();
    let resolver = Resolver::new(world.clone(), SharedCache::new(), settings());

    for _ in 0..2 {
        match resolver
            .lookup(&domain("chain.example.com."), RecordKind::NS)
            .await
        {
            Ok(Ok(Path::NS(path))) => {
                assert_eq!(2, path.aliases().len());
                assert_eq!(&domain("example.net."), path.canonical_name());
                assert_eq!(vec![domain("ns.example.net.")], path.nameservers());
            }
            other => panic!("expected an NS path, got {other:?}"),
        }
    }

    assert_eq!(1, world.total_queries());
    assert_eq!(1, resolver.metrics().cache_hits);
    assert_eq!(1, resolver.metrics().cache_misses);
}

#[tokio::test]
async fn lookup_classifies_negative_answers() {
    let world = hosted_world();
    let resolver = Resolver::new(world, SharedCache::new(), settings());

    let no_answer = resolver
        .lookup(&domain("www.example.com."), RecordKind::MX)
        .await
        .unwrap();
    let non_existent = resolver
        .lookup(&domain("nope.example.com."), RecordKind::A)
        .await
        .unwrap();

    assert_eq!(
        Some(FailureKind::NoAnswer),
        no_answer.err().map(|f| f.kind)
    );
    assert_eq!(
        Some(FailureKind::DomainNonExistent),
        non_existent.err().map(|f| f.kind)
    );
}
