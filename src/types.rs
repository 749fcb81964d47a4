//! Core types for the fitintent pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw events, mapped signal candidates, persisted normalized signals,
//! per-session intent state, and the append-only transition audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Behavioral event categories accepted from the ingestion boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Click,
    ModalOpen,
    AccordionExpand,
    VariantChange,
    Scroll,
    Revisit,
    ExitIntent,
    ChatOpen,
    ChatMessage,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::ModalOpen => "modal_open",
            EventType::AccordionExpand => "accordion_expand",
            EventType::VariantChange => "variant_change",
            EventType::Scroll => "scroll",
            EventType::Revisit => "revisit",
            EventType::ExitIntent => "exit_intent",
            EventType::ChatOpen => "chat_open",
            EventType::ChatMessage => "chat_message",
        }
    }
}

/// A validated raw event from the ingestion boundary.
///
/// Immutable once created. The ingestion layer guarantees required fields are
/// present and well-typed before the pipeline sees the event; the pipeline
/// never re-validates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Raw event identifier, referenced by every signal the event yields
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Event category
    pub event_type: EventType,
    /// Session this event belongs to
    pub session_id: String,
    /// When the event occurred on the client
    pub timestamp: DateTime<Utc>,
    /// Visible text of the interacted element, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    /// Element kind (button, link, tab), if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Page URL at event time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    /// Page classification (product, collection, cart)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    /// Product in view, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Variant in view, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    /// Open metadata map (scroll depth, time on page, variant ids)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Normalized signal classifications derived from raw events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    // Primary signals - strong standalone intent indicators
    SizeContentInteraction,
    UsageContentInteraction,
    ReviewFitInteraction,
    ReturnRiskCheck,
    VariantExploration,

    // Supporting signals - low weight
    HighEngagement,
    Revisit,
    ExitHesitation,

    // Chat signals
    ExplicitQuery,
    QuestionIndicator,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::SizeContentInteraction => "SIZE_CONTENT_INTERACTION",
            SignalType::UsageContentInteraction => "USAGE_CONTENT_INTERACTION",
            SignalType::ReviewFitInteraction => "REVIEW_FIT_INTERACTION",
            SignalType::ReturnRiskCheck => "RETURN_RISK_CHECK",
            SignalType::VariantExploration => "VARIANT_EXPLORATION",
            SignalType::HighEngagement => "HIGH_ENGAGEMENT",
            SignalType::Revisit => "REVISIT",
            SignalType::ExitHesitation => "EXIT_HESITATION",
            SignalType::ExplicitQuery => "EXPLICIT_QUERY",
            SignalType::QuestionIndicator => "QUESTION_INDICATOR",
        }
    }

    /// Whether this type belongs to the primary subset used by the combo rule
    pub fn is_primary(&self) -> bool {
        matches!(
            self,
            SignalType::SizeContentInteraction
                | SignalType::UsageContentInteraction
                | SignalType::ReviewFitInteraction
                | SignalType::ReturnRiskCheck
        )
    }
}

/// A signal produced by the mapper, not yet persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCandidate {
    /// Signal classification
    pub signal_type: SignalType,
    /// Base score contribution
    pub score_value: i32,
    /// True only for explicit chat queries
    pub is_explicit: bool,
    /// Audit context (matched category, element text, thresholds)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A persisted, append-only normalized signal fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSignal {
    /// Signal identifier
    pub id: Uuid,
    /// Session the signal belongs to
    pub session_id: String,
    /// Raw event the signal was derived from
    pub raw_event_id: Uuid,
    /// Signal classification
    pub signal_type: SignalType,
    /// Base score contribution
    pub score_value: i32,
    /// True only for explicit chat queries
    pub is_explicit: bool,
    /// When the signal was detected
    pub detected_at: DateTime<Utc>,
    /// Audit context carried over from the candidate
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Ordinal confidence level derived from the window score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Medium,
    Strong,
    VeryStrong,
}

impl Confidence {
    /// Ordinal rank in the fixed order none < medium < strong < very_strong
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::None => 0,
            Confidence::Medium => 1,
            Confidence::Strong => 2,
            Confidence::VeryStrong => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::None => "none",
            Confidence::Medium => "medium",
            Confidence::Strong => "strong",
            Confidence::VeryStrong => "very_strong",
        }
    }

    /// Parse a confidence label. Unknown labels yield `None` so that callers
    /// can treat them as non-upgrades instead of failing.
    pub fn parse(label: &str) -> Option<Confidence> {
        match label {
            "none" => Some(Confidence::None),
            "medium" => Some(Confidence::Medium),
            "strong" => Some(Confidence::Strong),
            "very_strong" => Some(Confidence::VeryStrong),
            _ => None,
        }
    }
}

/// Mutable per-session intent state, one row per session.
///
/// Invariants (enforced by [`crate::state::merge_state`]):
/// - `confidence` never decreases across the lifetime of a session
/// - `explicit_detected` is a one-way latch
/// - `first_detected_at` is set exactly once, when the session first leaves
///   the `none` level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentState {
    /// Session this state belongs to
    pub session_id: String,
    /// Current window score (may drop as signals age out)
    pub score: i32,
    /// Current confidence level (monotonically non-decreasing)
    pub confidence: Confidence,
    /// Whether an explicit query was ever seen for this session
    pub explicit_detected: bool,
    /// When the session first left the `none` level
    pub first_detected_at: Option<DateTime<Utc>>,
    /// When the state was last recomputed
    pub last_updated_at: DateTime<Utc>,
    /// Top 3 signal types by frequency in the current window
    pub top_signals: Vec<SignalType>,
}

/// Append-only audit record of an upward confidence movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceTransition {
    /// Session the transition belongs to
    pub session_id: String,
    /// Level before the transition
    pub from_confidence: Confidence,
    /// Level after the transition
    pub to_confidence: Confidence,
    /// Score (post combo rule) at transition time
    pub score_at_transition: i32,
    /// Last signal mapped from the event that caused the write
    pub triggering_signal: SignalType,
    /// When the transition was recorded
    pub transitioned_at: DateTime<Utc>,
}

/// Result of folding the rolling window for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAggregate {
    /// Capped score over the rolling window
    pub score: i32,
    /// Top 3 signal types by frequency (ties keep first-appearance order)
    pub top_signals: Vec<SignalType>,
    /// Any explicit signal in the window
    pub explicit_detected: bool,
    /// Any primary-subset signal inside the shorter combo window
    pub has_recent_primary_signal: bool,
    /// Uncapped occurrence counts per type, in first-appearance order
    pub frequency: Vec<(SignalType, u32)>,
}

/// Per-type rollup of a session's full signal history (read view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub signal_type: SignalType,
    /// How many times the signal fired
    pub event_count: u32,
    /// Total score contributed across all occurrences
    pub total_score: i32,
    /// Whether any occurrence carried the explicit flag
    pub any_explicit: bool,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}
