//! Pattern-based intent classification.
//!
//! Each label owns one or more case-insensitive patterns. A label's strength
//! is the number of pattern matches divided by the word count of the input,
//! clamped to `[0, 1]`. The strongest label becomes the primary intent when
//! it exceeds the configured minimum.

use crate::error::CoreError;
use log::{debug, warn};
use organix_rs_config::IntentConfig;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::BTreeMap;

pub const QUESTION: &str = "question";
pub const COMMAND: &str = "command";
pub const CHAT: &str = "chat";
pub const FEEDBACK: &str = "feedback";
pub const BLOCKCHAIN: &str = "blockchain";
pub const WEB_SEARCH: &str = "web_search";
pub const AGENT_ACTION: &str = "agent_action";
pub const MCP: &str = "mcp";
pub const REASONING: &str = "reasoning";

/// Labels that map to a specialist rather than a conversational style.
pub const DOMAIN_INTENTS: [&str; 4] = [BLOCKCHAIN, WEB_SEARCH, MCP, REASONING];

const DEFAULT_PATTERNS: [(&str, &str); 9] = [
    (
        QUESTION,
        r"\b(?:who|what|when|where|why|how|is|are|can|could|would|should|do|does|did)\b.+\?",
    ),
    (
        COMMAND,
        r"\b(?:please|can you|would you|i want|i need|make|create|show|find|get|search|help)\b",
    ),
    (
        CHAT,
        r"\b(?:hi|hello|hey|howdy|greetings|good morning|good afternoon|good evening)\b",
    ),
    (
        FEEDBACK,
        r"\b(?:thanks|thank you|good|great|excellent|awesome|terrible|bad|poor|not good|not helpful)\b",
    ),
    (
        BLOCKCHAIN,
        r"\b(?:solana|sol|phantom|wallet|blockchain|crypto|nfts?|tokens?|transactions?|eth|ethereum|bitcoin|btc|balance)\b",
    ),
    (
        WEB_SEARCH,
        r"\b(?:search|find|look up|google|information about|latest|news|current)\b",
    ),
    (AGENT_ACTION, r"\b(?:run|execute|perform|start|activate)\b"),
    (
        MCP,
        r"\b(?:mcp|model context protocol|tool integration|composio)\b",
    ),
    (
        REASONING,
        r"\b(?:complex|reasoning|agi|cognitive|think|analy[sz]e)\b",
    ),
];

/// Outcome of classifying one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub text: String,
    /// Strongest label, if it exceeded the minimum confidence.
    pub primary_intent: Option<String>,
    /// Strength of the primary intent, 0 when there is none.
    pub confidence: f32,
    /// Every label with at least one match and its strength.
    pub detected_intents: BTreeMap<String, f32>,
}

impl IntentResult {
    /// Detected labels whose strength exceeds `threshold`.
    pub fn intents_above(&self, threshold: f32) -> Vec<&str> {
        self.detected_intents
            .iter()
            .filter(|(_, strength)| **strength > threshold)
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

#[derive(Debug, Clone)]
struct IntentLabel {
    label: String,
    patterns: Vec<Regex>,
}

/// Deterministic classifier over an ordered pattern table.
///
/// Ties between equally strong labels go to the label registered first.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    labels: Vec<IntentLabel>,
    min_confidence: f32,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::from_config(&IntentConfig::default())
    }
}

impl IntentClassifier {
    /// Classifier with the built-in label table.
    pub fn new(min_confidence: f32) -> Self {
        let mut classifier = Self::empty(min_confidence);
        for (label, pattern) in DEFAULT_PATTERNS {
            if let Err(err) = classifier.register(label, &[pattern]) {
                warn!("skipping built-in intent (label={}, error={})", label, err);
            }
        }
        classifier
    }

    pub fn from_config(config: &IntentConfig) -> Self {
        Self::new(config.min_confidence)
    }

    /// Classifier with no labels; every input is unclassified.
    pub fn empty(min_confidence: f32) -> Self {
        Self {
            labels: Vec::new(),
            min_confidence,
        }
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Add patterns for a label. Patterns for an existing label are appended
    /// and the label keeps its tie-break position.
    pub fn register(&mut self, label: &str, patterns: &[&str]) -> Result<(), CoreError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(CoreError::Validation("intent label is empty".to_string()));
        }
        let compiled = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| {
                        CoreError::Validation(format!("invalid pattern for {label}: {err}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match self.labels.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => entry.patterns.extend(compiled),
            None => self.labels.push(IntentLabel {
                label: label.to_string(),
                patterns: compiled,
            }),
        }
        debug!("registered intent patterns (label={})", label);
        Ok(())
    }

    /// Registered labels in tie-break order.
    pub fn labels(&self) -> Vec<&str> {
        self.labels.iter().map(|entry| entry.label.as_str()).collect()
    }

    /// Classify free text. Total over all inputs: empty or unmatched text
    /// yields no primary intent and confidence 0.
    pub fn classify(&self, text: &str) -> IntentResult {
        let words = text.split_whitespace().count();
        let mut detected = BTreeMap::new();
        let mut primary: Option<(&str, f32)> = None;

        if words > 0 {
            for entry in &self.labels {
                let matches = entry
                    .patterns
                    .iter()
                    .map(|pattern| pattern.find_iter(text).count())
                    .sum::<usize>();
                if matches == 0 {
                    continue;
                }
                let strength = (matches as f32 / words as f32).clamp(0.0, 1.0);
                detected.insert(entry.label.clone(), strength);
                if primary.is_none_or(|(_, best)| strength > best) {
                    primary = Some((entry.label.as_str(), strength));
                }
            }
        }

        let (primary_intent, confidence) = match primary {
            Some((label, strength)) if strength > self.min_confidence => {
                (Some(label.to_string()), strength)
            }
            _ => (None, 0.0),
        };
        IntentResult {
            text: text.to_string(),
            primary_intent,
            confidence,
            detected_intents: detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BLOCKCHAIN, DEFAULT_PATTERNS, IntentClassifier, QUESTION};
    use crate::error::CoreError;
    use pretty_assertions::assert_eq;

    #[test]
    fn built_in_table_compiles() {
        let classifier = IntentClassifier::default();
        assert_eq!(classifier.labels().len(), DEFAULT_PATTERNS.len());
        assert_eq!(classifier.labels()[0], QUESTION);
    }

    #[test]
    fn wallet_balance_question_is_blockchain() {
        let result = IntentClassifier::default().classify("What is my SOL balance?");
        assert_eq!(result.primary_intent.as_deref(), Some(BLOCKCHAIN));
        assert!(result.confidence > 0.05);
        assert_eq!(result.detected_intents[BLOCKCHAIN], 0.4);
        assert_eq!(result.detected_intents[QUESTION], 0.2);
    }

    #[test]
    fn empty_and_unmatched_text_is_unclassified() {
        let classifier = IntentClassifier::default();
        for text in ["", "   ", "zebra quantum lattice"] {
            let result = classifier.classify(text);
            assert_eq!(result.primary_intent, None);
            assert_eq!(result.confidence, 0.0);
        }
        assert!(classifier.classify("").detected_intents.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classifier = IntentClassifier::default();
        assert_eq!(
            classifier.classify("HELLO THERE").primary_intent.as_deref(),
            Some("chat")
        );
    }

    #[test]
    fn ties_go_to_first_registered_label() {
        let mut classifier = IntentClassifier::empty(0.0);
        classifier.register("alpha", &[r"\bping\b"]).expect("alpha");
        classifier.register("beta", &[r"\bping\b"]).expect("beta");
        let result = classifier.classify("ping");
        assert_eq!(result.primary_intent.as_deref(), Some("alpha"));
        assert_eq!(result.detected_intents.len(), 2);
    }

    #[test]
    fn threshold_suppresses_weak_matches() {
        let classifier = IntentClassifier::new(0.5);
        let result = classifier.classify("hello from a rather long and winding sentence");
        assert_eq!(result.primary_intent, None);
        assert!(result.detected_intents.contains_key("chat"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let mut classifier = IntentClassifier::empty(0.0);
        let err = classifier.register("broken", &["(unclosed"]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(classifier.register(" ", &["x"]).is_err());
        assert!(classifier.labels().is_empty());
    }

    #[test]
    fn extra_patterns_extend_existing_label() {
        let mut classifier = IntentClassifier::default();
        classifier
            .register(BLOCKCHAIN, &[r"\bstaking\b"])
            .expect("extend");
        assert_eq!(classifier.labels().len(), DEFAULT_PATTERNS.len());
        assert_eq!(
            classifier.classify("staking").primary_intent.as_deref(),
            Some(BLOCKCHAIN)
        );
    }
}
