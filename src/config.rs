//! Pipeline configuration
//!
//! Every policy constant the pipeline depends on lives here: per-signal base
//! scores, the variant cap, window durations, confidence thresholds, the combo
//! floor, and the keyword dictionaries. Components receive an [`IntentConfig`]
//! at construction; the algorithms never hardcode policy values.

use crate::types::SignalType;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive lower bounds mapping a score to a confidence level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub medium: i32,
    pub strong: i32,
    pub very_strong: i32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            medium: 4,
            strong: 7,
            very_strong: 10,
        }
    }
}

/// Keyword dictionaries used to classify element text.
///
/// All matching is case-insensitive substring match. Absent text never
/// matches and never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordLists {
    pub fit: Vec<String>,
    pub usage: Vec<String>,
    pub returns: Vec<String>,
    pub review: Vec<String>,
    pub question: Vec<String>,
}

impl Default for KeywordLists {
    fn default() -> Self {
        Self {
            fit: to_strings(&[
                "size",
                "fit",
                "fits",
                "fitting",
                "measurement",
                "measurements",
                "dimension",
                "dimensions",
                "sizing",
                "size guide",
                "size chart",
                "how it fits",
                "true to size",
            ]),
            usage: to_strings(&[
                "how to use",
                "how to wear",
                "instructions",
                "usage",
                "care",
                "maintain",
                "maintenance",
                "works with",
                "compatible",
                "suitable for",
                "recommended for",
                "best for",
            ]),
            returns: to_strings(&[
                "return",
                "returns",
                "exchange",
                "refund",
                "send back",
                "return policy",
                "free return",
                "easy return",
            ]),
            review: to_strings(&[
                "review",
                "reviews",
                "rating",
                "ratings",
                "runs small",
                "runs large",
                "true to size",
                "fits large",
                "fits small",
                "customer review",
            ]),
            question: to_strings(&[
                "?",
                "which",
                "what size",
                "how do i know",
                "should i",
                "will this fit",
                "does this",
                "not sure",
                "unsure",
                "help me choose",
            ]),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Returns true if `text` contains any of the keywords.
/// Case-insensitive, substring match.
pub fn contains_any(text: Option<&str>, keywords: &[String]) -> bool {
    let Some(text) = text else {
        return false;
    };
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw.as_str()))
}

/// Full policy configuration for the intent pipeline.
///
/// Defaults carry the production values; deployments tune per environment by
/// loading a JSON override via [`IntentConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Base score per signal type
    pub scores: BTreeMap<SignalType, i32>,
    /// Maximum VARIANT_EXPLORATION signals counted per rolling window
    pub variant_exploration_cap: u32,
    /// Rolling scoring window in seconds
    pub rolling_window_secs: i64,
    /// Combo rule window in seconds (explicit + primary co-occurrence)
    pub combo_window_secs: i64,
    /// Score thresholds per confidence level
    pub thresholds: ConfidenceThresholds,
    /// Minimum score applied when the combo rule fires
    pub combo_minimum_score: i32,
    /// Minimum scroll depth (percent) for a high-engagement signal
    pub scroll_depth_pct: f64,
    /// Minimum time on page (seconds) for a high-engagement signal
    pub time_on_page_sec: f64,
    /// Keyword dictionaries per category
    pub keywords: KeywordLists,
}

impl Default for IntentConfig {
    fn default() -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(SignalType::SizeContentInteraction, 4);
        scores.insert(SignalType::UsageContentInteraction, 3);
        scores.insert(SignalType::ReviewFitInteraction, 4);
        scores.insert(SignalType::ReturnRiskCheck, 2);
        scores.insert(SignalType::VariantExploration, 2);
        scores.insert(SignalType::HighEngagement, 1);
        scores.insert(SignalType::Revisit, 1);
        scores.insert(SignalType::ExitHesitation, 1);
        scores.insert(SignalType::ExplicitQuery, 5);
        scores.insert(SignalType::QuestionIndicator, 1);

        Self {
            scores,
            variant_exploration_cap: 2,
            rolling_window_secs: 10 * 60,
            combo_window_secs: 5 * 60,
            thresholds: ConfidenceThresholds::default(),
            combo_minimum_score: 7,
            scroll_depth_pct: 80.0,
            time_on_page_sec: 120.0,
            keywords: KeywordLists::default(),
        }
    }
}

impl IntentConfig {
    /// Base score for a signal type; unknown types contribute nothing
    pub fn score_for(&self, signal_type: SignalType) -> i32 {
        self.scores.get(&signal_type).copied().unwrap_or(0)
    }

    /// Rolling scoring window as a duration
    pub fn rolling_window(&self) -> Duration {
        Duration::seconds(self.rolling_window_secs)
    }

    /// Combo rule window as a duration
    pub fn combo_window(&self) -> Duration {
        Duration::seconds(self.combo_window_secs)
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
