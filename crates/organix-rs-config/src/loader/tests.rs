use super::discovery::{CONFIG_DIR, CONFIG_FILE};
use super::*;
use crate::{IntentConfig, MemoryConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_layer(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that never read the real home directory.
fn isolated(cwd: &Path) -> LayeredConfigOptions {
    LayeredConfigOptions {
        user_config_path: None,
        ..LayeredConfigOptions::new(cwd)
    }
}

#[test]
fn empty_document_yields_defaults() {
    let config = OrganixConfig::load_from_str("{}").expect("config");
    assert_eq!(config, OrganixConfig::default());
    assert_eq!(config.memory.protect_importance, 4);
    assert_eq!(config.coordinator.fallback_agent, "general");
    assert_eq!(
        config.coordinator.routes.get("blockchain").map(String::as_str),
        Some("blockchain")
    );
}

#[test]
fn unknown_keys_are_rejected_with_their_path() {
    let err = OrganixConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey { key, .. } if key == "unexpected"));

    let err = OrganixConfig::load_from_str("{ memory: { relevance: { speed: 1 } } }").unwrap_err();
    assert_eq!(err.to_string(), "config: unknown key `memory.relevance.speed`");
}

#[test]
fn malformed_json5_is_a_syntax_error() {
    let err = OrganixConfig::load_from_str("{ memory: ").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { .. }));
}

#[test]
fn range_checks_run_after_decoding() {
    let cases = [
        ("{ memory: { protect_importance: 9 } }", "memory.protect_importance"),
        (
            "{ memory: { relevance: { similarity_weight: 0, recency_weight: 0, importance_weight: 0 } } }",
            "memory.relevance",
        ),
        ("{ coordinator: { retry: { max_attempts: 0 } } }", "coordinator.retry.max_attempts"),
        (
            "{ coordinator: { retry: { max_attempts: 4000000000 } } }",
            "coordinator.retry.max_attempts",
        ),
        ("{ coordinator: { fallback_agent: \"  \" } }", "coordinator.fallback_agent"),
        ("{ intent: { min_confidence: 1.5 } }", "intent.min_confidence"),
    ];
    for (document, expected_key) in cases {
        match OrganixConfig::load_from_str(document) {
            Err(ConfigError::BadValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("{document}: expected a bad value, got {other:?}"),
        }
    }
}

#[test]
fn null_access_count_disables_protection() {
    let config = OrganixConfig::load_from_str("{ memory: { protect_access_count: null } }")
        .expect("config");
    assert_eq!(config.memory.protect_access_count, None);
}

#[test]
fn repo_layer_beats_cwd_which_beats_project() {
    let temp = TempDir::new().expect("tmp");
    let project = temp.path().join("project");
    fs::create_dir_all(project.join(".git")).expect("git");
    let cwd = project.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    write_layer(
        &project.join(CONFIG_FILE),
        "{ memory: { max_age_days: 10, cache_capacity: 3 } }",
    );
    write_layer(&cwd.join(CONFIG_FILE), "{ memory: { max_age_days: 20 } }");
    write_layer(
        &project.join(CONFIG_DIR).join(CONFIG_FILE),
        "{ memory: { max_age_days: 40 } }",
    );

    let layered = OrganixConfig::load_layered_with_options(isolated(&cwd)).expect("load");
    assert_eq!(layered.config.memory.max_age_days, 40);
    assert_eq!(layered.config.memory.cache_capacity, 3);
    let sources = layered
        .layers
        .iter()
        .map(|layer| layer.source)
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Repo
        ]
    );
}

#[test]
fn runtime_layer_overrides_user_layer() {
    let temp = TempDir::new().expect("tmp");
    let user = temp.path().join("user.json5");
    write_layer(&user, "{ coordinator: { fallback_agent: \"researcher\" } }");
    let runtime = temp.path().join("runtime.json5");
    write_layer(&runtime, "{ coordinator: { fallback_agent: \"coder\" } }");

    let options = LayeredConfigOptions {
        user_config_path: Some(user),
        ..isolated(temp.path())
    }
    .with_runtime_path(&runtime);
    let layered = OrganixConfig::load_layered_with_options(options).expect("load");
    assert_eq!(layered.config.coordinator.fallback_agent, "coder");
    assert_eq!(layered.layers.len(), 2);
}

#[test]
fn missing_runtime_file_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated(temp.path()).with_runtime_path(temp.path().join("absent.json5"));
    let err = OrganixConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn bad_layer_names_its_origin() {
    let temp = TempDir::new().expect("tmp");
    let runtime = temp.path().join("runtime.json5");
    write_layer(&runtime, "{ tools: { timeout_ms: \"soon\" } }");
    let options = isolated(temp.path()).with_runtime_path(&runtime);
    let message = OrganixConfig::load_layered_with_options(options)
        .unwrap_err()
        .to_string();
    assert!(message.starts_with("runtime("), "{message}");
    assert!(message.contains("`tools.timeout_ms` must be a non-negative integer"), "{message}");
}

#[test]
fn builder_replaces_whole_sections() {
    let config = OrganixConfig::builder()
        .intent(IntentConfig {
            min_confidence: 0.2,
        })
        .build();
    assert_eq!(config.intent.min_confidence, 0.2);
    assert_eq!(config.memory, MemoryConfig::default());
}
