//! Rendering recalled memory into a prompt context block.

use chrono::SecondsFormat;
use organix_rs_memory::{MemoryRecord, ScoredMemory};

const CONTEXT_HEADER: &str = "Context from previous interactions:";
const EXCERPT_CHARS: usize = 100;

/// First `max` characters of `text`, with an ellipsis when cut.
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Render recalled records as a context block, `None` when there are none.
pub(crate) fn format_context(records: &[ScoredMemory]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let mut block = String::from(CONTEXT_HEADER);
    for scored in records {
        block.push('\n');
        block.push_str(&render_line(&scored.record));
    }
    Some(block)
}

/// Append a context block to a query, separated by a blank line.
pub(crate) fn augment_query(query: &str, context: &str) -> String {
    format!("{query}\n\n{context}")
}

fn render_line(record: &MemoryRecord) -> String {
    let timestamp = record
        .created_at
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    match record.metadata_str("type") {
        Some("user_query" | "agent_query" | "collaborative_query") => {
            format!("User asked ({timestamp}): {}", record.content)
        }
        Some(
            "agent_response" | "assistant_response" | "collaborative_response" | "tool_response",
        ) => {
            format!(
                "Assistant responded ({timestamp}): {}",
                excerpt(&record.content, EXCERPT_CHARS)
            )
        }
        Some(category) => format!(
            "Related information ({category}): {}",
            excerpt(&record.content, EXCERPT_CHARS)
        ),
        None => format!(
            "Related information ({}): {}",
            record.kind,
            excerpt(&record.content, EXCERPT_CHARS)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{augment_query, excerpt, format_context};
    use chrono::{TimeZone, Utc};
    use organix_rs_memory::{Importance, MemoryKind, MemoryRecord, Metadata, ScoredMemory};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn scored(kind: MemoryKind, content: &str, category: Option<&str>) -> ScoredMemory {
        let created = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("date");
        let mut metadata = Metadata::new();
        if let Some(category) = category {
            metadata.insert("type".to_string(), json!(category));
        }
        ScoredMemory {
            record: MemoryRecord {
                id: Uuid::new_v4(),
                kind,
                content: content.to_string(),
                metadata,
                importance: Importance::new(3).expect("importance"),
                created_at: created,
                last_accessed_at: created,
                updated_at: None,
                access_count: 0,
                embedding: Vec::new(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("exact", 5), "exact");
    }

    #[test]
    fn context_lines_follow_record_category() {
        let long_answer = "a".repeat(150);
        let records = vec![
            scored(MemoryKind::Episodic, "what is rust?", Some("agent_query")),
            scored(MemoryKind::Episodic, &long_answer, Some("agent_response")),
            scored(MemoryKind::Procedural, "used list_files", Some("tool_usage")),
            scored(MemoryKind::Semantic, "rust is a language", None),
        ];
        let block = format_context(&records).expect("context");
        let lines = block.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Context from previous interactions:");
        assert_eq!(lines[1], "User asked (2024-03-01T12:00:00Z): what is rust?");
        assert_eq!(
            lines[2],
            format!("Assistant responded (2024-03-01T12:00:00Z): {}...", "a".repeat(100))
        );
        assert_eq!(lines[3], "Related information (tool_usage): used list_files");
        assert_eq!(lines[4], "Related information (semantic): rust is a language");
    }

    #[test]
    fn no_records_means_no_context() {
        assert_eq!(format_context(&[]), None);
        assert_eq!(augment_query("q", "ctx"), "q\n\nctx");
    }
}
