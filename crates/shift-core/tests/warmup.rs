use pretty_assertions::assert_eq;
use shift_core::{FixError, FixerConfig, MigrationError, SimpleFix};
use shift_dynamic::Value;
use shift_test_utils::*;
use tokio::runtime::Handle;

const ALL_TYPES: [&str; 5] = ["Player", "Shape", "Board", "Inventory", "Tree"];

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn warmup_precomputes_load_paths_to_latest() {
    init_tracing();
    let (fixer, warmup) = game_builder(FixerConfig::default())
        .build_optimized(ALL_TYPES, &Handle::current())
        .unwrap();
    warmup.await.unwrap();

    // four source versions with fixes ahead of them, five types in each
    let stats = fixer.cache_stats();
    assert_eq!(stats.cached_results, 20);
    assert_eq!(stats.hits, 0);

    let out = fixer.update("Tree", deep_tree(3), V0, V4).unwrap();
    assert_eq!(out, deep_tree_long(3));
    let out = fixer
        .update("Inventory", Value::List(vec![entry("a", 1)]), V2, V4)
        .unwrap();
    assert_eq!(out, Value::List(vec![entry("a", 1_i64)]));

    let stats = fixer.cache_stats();
    assert_eq!((stats.hits, stats.cached_results), (2, 20));
}

#[tokio::test]
async fn fixer_is_usable_before_warmup_finishes() {
    let (fixer, warmup) = game_builder(FixerConfig::default())
        .build_optimized(["Player"], &Handle::current())
        .unwrap();
    let out = fixer
        .update("Player", Value::map([("name", Value::from("Alice"))]), V0, V1)
        .unwrap();
    assert_eq!(out, Value::map([("displayName", Value::from("Alice"))]));
    warmup.await.unwrap();
}

#[tokio::test]
async fn warmup_ignores_types_missing_from_a_schema() {
    let (fixer, warmup) = game_builder(FixerConfig::default())
        .build_optimized(["Dragon", "Player"], &Handle::current())
        .unwrap();
    warmup.await.unwrap();
    assert_eq!(fixer.cache_stats().cached_results, 4);
}

#[tokio::test]
async fn warmup_reports_the_failing_fix() {
    let mut builder = game_builder(FixerConfig::default());
    builder.add_fix(SimpleFix::new("broken", V2, |_| {
        Err(FixError::invalid("broken", "always fails"))
    }));
    let (_fixer, warmup) = builder
        .build_optimized(["Player"], &Handle::current())
        .unwrap();
    let err = warmup.await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Fix(FixError::Invalid { ref fix, .. }) if fix == "broken"
    ));
}
