//! Confidence resolution
//!
//! Pure functions mapping a window score to an ordinal confidence level and
//! deciding whether a level change is an upward, audit-worthy transition.
//!
//! Confidence only moves upward in V1: score decay as the window slides is
//! computed but never reflected downward in persisted state, and never
//! logged. That policy lives in [`crate::state::merge_state`] and the
//! transition gate here.

use crate::config::ConfidenceThresholds;
use crate::types::Confidence;

/// Map a score to a confidence level using inclusive lower bounds;
/// the highest matching threshold wins.
pub fn score_to_confidence(score: i32, thresholds: &ConfidenceThresholds) -> Confidence {
    if score >= thresholds.very_strong {
        Confidence::VeryStrong
    } else if score >= thresholds.strong {
        Confidence::Strong
    } else if score >= thresholds.medium {
        Confidence::Medium
    } else {
        Confidence::None
    }
}

/// True only for a strictly upward movement. This is the sole gate for
/// writing a transition record.
pub fn is_upgrade(from: Confidence, to: Confidence) -> bool {
    to.rank() > from.rank()
}

/// Label-based variant for data read back from external snapshots.
/// Unrecognized labels are treated as non-upgrades rather than errors.
pub fn is_upgrade_labels(from: &str, to: &str) -> bool {
    match (Confidence::parse(from), Confidence::parse(to)) {
        (Some(from), Some(to)) => is_upgrade(from, to),
        _ => false,
    }
}
