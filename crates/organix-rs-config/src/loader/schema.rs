//! Shape check for a single config layer.
//!
//! Layers are partial, so every key is optional; a key that is present must
//! be known and hold a value of the declared shape. Ranges are checked later
//! on the merged config.

use crate::ConfigError;
use serde_json::Value;

/// Declared shape of one config value.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Section(&'static [(&'static str, Shape)]),
    Text,
    Flag,
    Count,
    /// Count that may be `null` to disable the feature.
    OptionalCount,
    Number,
    TextList,
    /// Object with free-form keys and text values.
    TextMap,
}

const RELEVANCE: &[(&str, Shape)] = &[
    ("similarity_weight", Shape::Number),
    ("recency_weight", Shape::Number),
    ("importance_weight", Shape::Number),
    ("recency_half_life_days", Shape::Number),
    ("min_similarity", Shape::Number),
];

const MEMORY: &[(&str, Shape)] = &[
    ("path", Shape::Text),
    ("max_age_days", Shape::Count),
    ("protect_importance", Shape::Count),
    ("protect_access_count", Shape::OptionalCount),
    ("max_prune_per_call", Shape::Count),
    ("cache_capacity", Shape::Count),
    ("cache_ttl_secs", Shape::Count),
    ("embedding_dimensions", Shape::Count),
    ("relevance", Shape::Section(RELEVANCE)),
];

const INTENT: &[(&str, Shape)] = &[("min_confidence", Shape::Number)];

const RETRY: &[(&str, Shape)] = &[
    ("max_attempts", Shape::Count),
    ("initial_backoff_ms", Shape::Count),
    ("multiplier", Shape::Number),
];

const COORDINATOR: &[(&str, Shape)] = &[
    ("fallback_agent", Shape::Text),
    ("synthesizer_agent", Shape::Text),
    ("collaboration_agents", Shape::TextList),
    ("routes", Shape::TextMap),
    ("auto_collaborate", Shape::Flag),
    ("context_limit", Shape::Count),
    ("turn_importance", Shape::Count),
    ("collaboration_importance", Shape::Count),
    ("synthesis_excerpt_chars", Shape::Count),
    ("llm_timeout_ms", Shape::Count),
    ("memory_timeout_ms", Shape::Count),
    ("retry", Shape::Section(RETRY)),
];

const TOOLS: &[(&str, Shape)] = &[("timeout_ms", Shape::Count)];

const ROOT: &[(&str, Shape)] = &[
    ("$schema", Shape::Text),
    ("memory", Shape::Section(MEMORY)),
    ("intent", Shape::Section(INTENT)),
    ("coordinator", Shape::Section(COORDINATOR)),
    ("tools", Shape::Section(TOOLS)),
];

/// Check `value` against the config schema. `layer` names the origin in
/// error messages.
pub(super) fn check_layer(value: &Value, layer: &str) -> Result<(), ConfigError> {
    check(value, Shape::Section(ROOT), layer, "")
}

fn check(value: &Value, shape: Shape, layer: &str, key: &str) -> Result<(), ConfigError> {
    let expected = match (shape, value) {
        (Shape::Section(fields), Value::Object(map)) => {
            for (name, child) in map {
                let child_key = dotted(key, name);
                let Some((_, child_shape)) = fields.iter().find(|(field, _)| field == name) else {
                    return Err(ConfigError::UnknownKey {
                        layer: layer.to_string(),
                        key: child_key,
                    });
                };
                check(child, *child_shape, layer, &child_key)?;
            }
            return Ok(());
        }
        (Shape::TextList, Value::Array(items)) => {
            return match items.iter().position(|item| !item.is_string()) {
                Some(index) => Err(ConfigError::bad_value(
                    layer,
                    &format!("{key}[{index}]"),
                    "must be a string",
                )),
                None => Ok(()),
            };
        }
        (Shape::TextMap, Value::Object(map)) => {
            return match map.iter().find(|(_, target)| !target.is_string()) {
                Some((name, _)) => Err(ConfigError::bad_value(
                    layer,
                    &dotted(key, name),
                    "must be a string",
                )),
                None => Ok(()),
            };
        }
        (Shape::Text, Value::String(_))
        | (Shape::Flag, Value::Bool(_))
        | (Shape::OptionalCount, Value::Null)
        | (Shape::Number, Value::Number(_)) => return Ok(()),
        (Shape::Count | Shape::OptionalCount, Value::Number(number)) if number.is_u64() => {
            return Ok(());
        }
        (Shape::Section(_) | Shape::TextMap, _) => "an object",
        (Shape::TextList, _) => "an array of strings",
        (Shape::Text, _) => "a string",
        (Shape::Flag, _) => "a boolean",
        (Shape::Count, _) => "a non-negative integer",
        (Shape::OptionalCount, _) => "a non-negative integer or null",
        (Shape::Number, _) => "a number",
    };
    let key = if key.is_empty() { "<root>" } else { key };
    Err(ConfigError::bad_value(layer, key, format!("must be {expected}")))
}

fn dotted(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::check_layer;
    use crate::ConfigError;
    use serde_json::json;

    #[test]
    fn accepts_partial_layers() {
        check_layer(&json!({}), "test").expect("empty");
        check_layer(
            &json!({
                "memory": { "relevance": { "min_similarity": 0.1 }, "protect_access_count": null },
                "coordinator": { "routes": { "poetry": "poet" }, "collaboration_agents": ["a"] }
            }),
            "test",
        )
        .expect("partial");
    }

    #[test]
    fn names_the_offending_key() {
        let jitter = json!({ "coordinator": { "retry": { "jitter": 1 } } });
        match check_layer(&jitter, "cwd").unwrap_err() {
            ConfigError::UnknownKey { layer, key } => {
                assert_eq!((layer.as_str(), key.as_str()), ("cwd", "coordinator.retry.jitter"));
            }
            other => panic!("expected an unknown key, got {other:?}"),
        }

        let mixed = json!({ "coordinator": { "collaboration_agents": ["a", 3] } });
        let err = check_layer(&mixed, "cwd").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cwd: `coordinator.collaboration_agents[1]` must be a string"
        );

        let err = check_layer(&json!({ "memory": { "max_age_days": -1 } }), "cwd").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cwd: `memory.max_age_days` must be a non-negative integer"
        );
        assert!(check_layer(&json!([1]), "cwd").is_err());
    }
}
