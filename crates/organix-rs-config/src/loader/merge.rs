use serde_json::Value;

/// Apply `layer` on top of `base`. Objects merge key by key; any other value
/// in the layer, arrays included, replaces what was there.
pub(super) fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::overlay;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sections_merge_and_lists_replace() {
        let mut merged = json!({
            "memory": { "max_age_days": 30, "cache_capacity": 10 },
            "coordinator": { "collaboration_agents": ["a", "b"] }
        });
        overlay(
            &mut merged,
            json!({
                "memory": { "max_age_days": 7 },
                "coordinator": { "collaboration_agents": ["c"] }
            }),
        );
        assert_eq!(
            merged,
            json!({
                "memory": { "max_age_days": 7, "cache_capacity": 10 },
                "coordinator": { "collaboration_agents": ["c"] }
            })
        );
    }
}
