//! Signal mapper
//!
//! Maps a single raw event to zero or more signal candidates. Pure classifier:
//! no store access, no side effects, never fails. Scoring and capping are the
//! aggregator's job; the mapper only attaches each signal's base score.

use crate::config::{contains_any, IntentConfig};
use crate::types::{EventType, RawEvent, SignalCandidate, SignalType};
use std::collections::HashMap;

/// Pure raw event → signal candidate classifier
pub struct SignalMapper {
    config: IntentConfig,
}

impl SignalMapper {
    pub fn new(config: IntentConfig) -> Self {
        Self { config }
    }

    /// Classify a raw event into candidates. Returns an empty vec when no
    /// rule matches; one event can yield multiple signals in principle.
    pub fn map(&self, event: &RawEvent) -> Vec<SignalCandidate> {
        match event.event_type {
            EventType::ChatMessage => self.map_chat(event),
            EventType::Click | EventType::ModalOpen | EventType::AccordionExpand => {
                self.map_content_interaction(event)
            }
            EventType::VariantChange => self.map_variant_change(event),
            EventType::Scroll => self.map_scroll(event),
            EventType::Revisit => vec![self.candidate(SignalType::Revisit, false, HashMap::new())],
            EventType::ExitIntent => {
                vec![self.candidate(SignalType::ExitHesitation, false, HashMap::new())]
            }
            // chat_open carries no classifiable content
            EventType::ChatOpen => Vec::new(),
        }
    }

    /// Chat text: explicit fit query beats a generic question indicator.
    fn map_chat(&self, event: &RawEvent) -> Vec<SignalCandidate> {
        let text = event.element_text.as_deref();
        if contains_any(text, &self.config.keywords.fit) {
            return vec![self.candidate(
                SignalType::ExplicitQuery,
                true,
                text_metadata("fit", text),
            )];
        }
        if contains_any(text, &self.config.keywords.question) {
            return vec![self.candidate(
                SignalType::QuestionIndicator,
                false,
                text_metadata("question", text),
            )];
        }
        Vec::new()
    }

    /// Content interactions are keyword-classified in fixed priority order:
    /// fit → usage → returns → reviews. First match wins; fit intent outranks
    /// all other categories by policy.
    fn map_content_interaction(&self, event: &RawEvent) -> Vec<SignalCandidate> {
        let text = event.element_text.as_deref();
        let keywords = &self.config.keywords;

        let matched = if contains_any(text, &keywords.fit) {
            Some((SignalType::SizeContentInteraction, "fit"))
        } else if contains_any(text, &keywords.usage) {
            Some((SignalType::UsageContentInteraction, "usage"))
        } else if contains_any(text, &keywords.returns) {
            Some((SignalType::ReturnRiskCheck, "return"))
        } else if contains_any(text, &keywords.review) {
            Some((SignalType::ReviewFitInteraction, "review"))
        } else {
            None
        };

        match matched {
            Some((signal_type, category)) => {
                vec![self.candidate(signal_type, false, text_metadata(category, text))]
            }
            None => Vec::new(),
        }
    }

    /// Any variant selection is an exploration signal; the aggregator caps
    /// repeated occurrences.
    fn map_variant_change(&self, event: &RawEvent) -> Vec<SignalCandidate> {
        let mut metadata = HashMap::new();
        for key in ["variant_id", "from_variant"] {
            if let Some(value) = event.metadata.get(key) {
                metadata.insert(key.to_string(), value.clone());
            }
        }
        vec![self.candidate(SignalType::VariantExploration, false, metadata)]
    }

    /// High engagement requires deep scroll AND meaningful time on page.
    /// Both thresholds must be met; fast scrollers produce nothing.
    fn map_scroll(&self, event: &RawEvent) -> Vec<SignalCandidate> {
        let scroll_pct = metadata_number(event, "scroll_pct");
        let time_on_page = metadata_number(event, "time_on_page");

        if scroll_pct >= self.config.scroll_depth_pct && time_on_page >= self.config.time_on_page_sec
        {
            let mut metadata = HashMap::new();
            metadata.insert("scroll_pct".to_string(), scroll_pct.into());
            metadata.insert("time_on_page".to_string(), time_on_page.into());
            return vec![self.candidate(SignalType::HighEngagement, false, metadata)];
        }
        Vec::new()
    }

    fn candidate(
        &self,
        signal_type: SignalType,
        is_explicit: bool,
        metadata: HashMap<String, serde_json::Value>,
    ) -> SignalCandidate {
        SignalCandidate {
            signal_type,
            score_value: self.config.score_for(signal_type),
            is_explicit,
            metadata,
        }
    }
}

/// Audit metadata for keyword-classified signals
fn text_metadata(category: &str, text: Option<&str>) -> HashMap<String, serde_json::Value> {
    let mut metadata = HashMap::new();
    metadata.insert("matched_category".to_string(), category.into());
    if let Some(text) = text {
        metadata.insert("element_text".to_string(), text.into());
    }
    metadata
}

/// Read a numeric metadata field; missing or non-numeric reads as 0
fn metadata_number(event: &RawEvent, key: &str) -> f64 {
    event
        .metadata
        .get(key)
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}
