//! Rolling-window score aggregation
//!
//! Folds every signal recorded for a session inside the trailing rolling
//! window into a capped score plus auxiliary facts: the uncapped per-type
//! frequency table, the explicit-intent flag, and whether a primary signal
//! occurred inside the shorter combo window. Reads only; safe to call
//! repeatedly with identical results for the same stored signals and `now`.

use crate::config::IntentConfig;
use crate::store::SessionScope;
use crate::types::{NormalizedSignal, SignalType, WindowAggregate};
use chrono::{DateTime, Utc};

/// Number of signal types reported in `top_signals`
const TOP_SIGNALS_LIMIT: usize = 3;

/// Read-only rolling-window scorer
pub struct ScoreAggregator {
    config: IntentConfig,
}

impl ScoreAggregator {
    pub fn new(config: IntentConfig) -> Self {
        Self { config }
    }

    /// Read the session's signals inside the rolling window and fold them.
    pub fn aggregate(&self, scope: &dyn SessionScope, now: DateTime<Utc>) -> WindowAggregate {
        let cutoff = now - self.config.rolling_window();
        let signals = scope.signals_since(cutoff);
        self.fold(&signals, now)
    }

    /// Pure fold over chronologically ordered window signals.
    pub fn fold(&self, signals: &[NormalizedSignal], now: DateTime<Utc>) -> WindowAggregate {
        let mut score = 0;
        let mut variant_count = 0u32;
        let mut explicit_detected = false;
        let mut has_recent_primary_signal = false;
        // First-appearance order matters: ties in the top-signals sort are
        // broken by the order a type first showed up.
        let mut frequency: Vec<(SignalType, u32)> = Vec::new();
        let combo_cutoff = now - self.config.combo_window();

        for signal in signals {
            if signal.is_explicit {
                explicit_detected = true;
            }

            // Variant exploration only scores while under the per-window cap;
            // instances past the cap are silently skipped.
            if signal.signal_type == SignalType::VariantExploration {
                if variant_count < self.config.variant_exploration_cap {
                    score += signal.score_value;
                    variant_count += 1;
                }
            } else {
                score += signal.score_value;
            }

            // Frequency counts are never capped.
            match frequency
                .iter_mut()
                .find(|(signal_type, _)| *signal_type == signal.signal_type)
            {
                Some((_, count)) => *count += 1,
                None => frequency.push((signal.signal_type, 1)),
            }

            if signal.signal_type.is_primary() && signal.detected_at > combo_cutoff {
                has_recent_primary_signal = true;
            }
        }

        let top_signals = top_signals(&frequency);

        WindowAggregate {
            score,
            top_signals,
            explicit_detected,
            has_recent_primary_signal,
            frequency,
        }
    }
}

/// Top types by count, descending; stable sort keeps first-appearance order
/// for equal counts.
fn top_signals(frequency: &[(SignalType, u32)]) -> Vec<SignalType> {
    let mut ranked = frequency.to_vec();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(TOP_SIGNALS_LIMIT)
        .map(|(signal_type, _)| signal_type)
        .collect()
}
