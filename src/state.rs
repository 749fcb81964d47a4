//! Intent state merge
//!
//! [`IntentState`] rows are only constructed through [`merge_state`], so the
//! latch and monotonicity invariants are enforced in one place and are unit
//! testable without a store:
//!
//! - `explicit_detected` is a one-way latch
//! - persisted confidence never ranks below the prior level, even when the
//!   current window maps lower
//! - `first_detected_at` is stamped once, when the session first leaves
//!   `none`, and preserved verbatim thereafter

use crate::types::{Confidence, IntentState, SignalType};
use chrono::{DateTime, Utc};

/// The freshly evaluated inputs for one merge step
#[derive(Debug, Clone)]
pub struct StateInput {
    pub session_id: String,
    /// Window score after the combo rule
    pub score: i32,
    /// Confidence resolved from the score
    pub confidence: Confidence,
    /// Explicit flag already latched against the prior state
    pub explicit_detected: bool,
    pub top_signals: Vec<SignalType>,
    pub now: DateTime<Utc>,
}

/// Merge the prior persisted state (if any) with a fresh evaluation.
pub fn merge_state(prior: Option<&IntentState>, incoming: StateInput) -> IntentState {
    let prior_confidence = prior.map(|p| p.confidence).unwrap_or(Confidence::None);
    let prior_explicit = prior.map(|p| p.explicit_detected).unwrap_or(false);
    let prior_first_detected = prior.and_then(|p| p.first_detected_at);

    let confidence = incoming.confidence.max(prior_confidence);

    let first_detected_at = match prior_first_detected {
        Some(at) => Some(at),
        None if confidence != Confidence::None => Some(incoming.now),
        None => None,
    };

    IntentState {
        session_id: incoming.session_id,
        score: incoming.score,
        confidence,
        explicit_detected: incoming.explicit_detected || prior_explicit,
        first_detected_at,
        last_updated_at: incoming.now,
        top_signals: incoming.top_signals,
    }
}
