mod common;

use std::sync::Arc;

use trellis_core::config::ResolverConfig;
use trellis_core::dependency::scope;
use trellis_resolver::error::ResolveError;
use trellis_resolver::resolver::Resolver;

use common::*;

/// app -> a -> lib:1.0
/// app -> b (runtime) -> lib:2.0 -> extra
/// app -> c -> d -> lib:0.5
fn repository() -> MemoryRepository {
    MemoryRepository::new()
        .with(
            "com.example:app:1",
            vec![
                dep("org.a:a:1"),
                dep_scoped("org.b:b:1", scope::RUNTIME),
                dep("org.c:c:1"),
            ],
        )
        .with("org.a:a:1", vec![dep("org.lib:lib:1.0")])
        .with("org.b:b:1", vec![dep("org.lib:lib:2.0")])
        .with("org.c:c:1", vec![dep("org.d:d:1")])
        .with("org.d:d:1", vec![dep("org.lib:lib:0.5")])
        .with("org.lib:lib:0.5", vec![])
        .with("org.lib:lib:1.0", vec![])
        .with("org.lib:lib:2.0", vec![dep("org.extra:extra:1")])
        .with("org.extra:extra:1", vec![])
}

fn resolver(config: &ResolverConfig) -> Resolver {
    Resolver::new(
        Arc::new(repository()),
        Arc::new(MemoryVersions::new()),
        config,
    )
}

fn coordinates(resolution: &trellis_resolver::resolver::Resolution) -> Vec<String> {
    resolution
        .artifacts
        .iter()
        .map(|a| a.artifact.to_string())
        .collect()
}

#[tokio::test]
async fn nearest_first_declared_by_default() {
    let resolution = resolver(&ResolverConfig::default())
        .resolve(request("com.example:app:1"))
        .await
        .unwrap();

    assert_eq!(
        coordinates(&resolution),
        vec![
            "org.a:a:jar:1",
            "org.lib:lib:jar:1.0",
            "org.b:b:jar:1",
            "org.c:c:jar:1",
            "org.d:d:jar:1",
        ]
    );
    assert_eq!(resolution.conflicts.len(), 2);
    let reasons: Vec<&str> = resolution
        .conflicts
        .conflicts
        .iter()
        .map(|c| c.reason.as_str())
        .collect();
    assert!(reasons.contains(&"nearest wins (depth 2 vs 3)"));

    let tree = resolution.root.print_tree(None);
    assert!(tree.contains("org.lib:lib:jar:2.0 (omitted for conflict with 1.0)"));
    assert!(!tree.contains("org.extra"));
}

#[tokio::test]
async fn highest_version_tie_break_from_config() {
    let config = ResolverConfig::parse_toml("[conflicts]\ntie-break = \"highest-version\"\n").unwrap();
    let resolution = resolver(&config)
        .resolve(request("com.example:app:1"))
        .await
        .unwrap();

    assert_eq!(
        coordinates(&resolution),
        vec![
            "org.a:a:jar:1",
            "org.b:b:jar:1",
            "org.lib:lib:jar:2.0",
            "org.extra:extra:jar:1",
            "org.c:c:jar:1",
            "org.d:d:jar:1",
        ]
    );

    let lib = resolution
        .artifacts
        .iter()
        .find(|a| a.artifact.artifact_id() == "lib")
        .unwrap();
    assert_eq!(lib.scope, "runtime");

    // The loser below `a` takes the winner's scope.
    let loser = &resolution.root.children[0].children[0];
    assert_eq!(loser.winner.as_ref().unwrap().scope, "runtime");
}

#[tokio::test]
async fn paths_lead_to_the_winner() {
    let resolution = resolver(&ResolverConfig::default())
        .resolve(request("com.example:app:1"))
        .await
        .unwrap();

    let path: Vec<&str> = resolution
        .root
        .find_path("org.lib:lib")
        .unwrap()
        .iter()
        .map(|n| n.artifact().artifact_id())
        .collect();
    assert_eq!(path, vec!["app", "a", "lib"]);
}

#[tokio::test]
async fn collection_failures_surface_with_the_partial_graph() {
    let repository = repository().with_invalid("org.d:d:1");
    let resolver = Resolver::new(
        Arc::new(repository),
        Arc::new(MemoryVersions::new()),
        &ResolverConfig::default(),
    );

    let err = resolver
        .resolve(request("com.example:app:1"))
        .await
        .unwrap_err();
    let ResolveError::Collection(collection) = err else {
        panic!("expected a collection error");
    };
    assert_eq!(collection.failures.len(), 1);
    assert_eq!(collection.root.children.len(), 3);
    assert!(collection.root.children[2].children[0].failure.is_some());
}

#[test]
fn resolver_uses_the_standard_pipeline() {
    let resolver = resolver(&ResolverConfig::default());
    assert_eq!(
        resolver.pipeline().names(),
        vec!["conflict-marker", "conflict-resolver", "context-refiner"]
    );
}
