//! Persistence boundary
//!
//! The pipeline talks to its store through two narrow traits. [`SessionScope`]
//! is the per-session unit-of-work surface the orchestrator reads and writes
//! within; [`IntentStore`] hands out scopes and exposes the read-only views
//! downstream consumers use. The contract an implementation must honor:
//!
//! - `with_session` runs the closure under a per-session exclusive scope, so
//!   the read-modify-write over one session's aggregate state is serialized
//!   relative to other writers for that session
//! - all writes made inside the scope commit together on `Ok` and are
//!   discarded together on `Err` (failure atomicity, no partial writes)
//! - distinct sessions may proceed fully in parallel
//!
//! [`MemoryStore`] is the in-process implementation, with JSON snapshots for
//! carrying state across runs.

use crate::error::IntentError;
use crate::types::{ConfidenceTransition, IntentState, NormalizedSignal, SignalBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Unit-of-work surface over one session's records
pub trait SessionScope {
    /// Append a normalized signal (append-only, never updated)
    fn insert_signal(&mut self, signal: NormalizedSignal);

    /// Signals with `detected_at` strictly after `cutoff`, chronological
    fn signals_since(&self, cutoff: DateTime<Utc>) -> Vec<NormalizedSignal>;

    /// The session's current intent state, if any
    fn state(&self) -> Option<IntentState>;

    /// Upsert the session's intent state
    fn put_state(&mut self, state: IntentState);

    /// Append a confidence transition record
    fn push_transition(&mut self, transition: ConfidenceTransition);
}

/// Store handing out per-session exclusive scopes plus read-only views
pub trait IntentStore {
    /// Run `f` within an exclusive, failure-atomic scope for `session_id`.
    fn with_session<T, F>(&self, session_id: &str, f: F) -> Result<T, IntentError>
    where
        F: FnOnce(&mut dyn SessionScope) -> Result<T, IntentError>;

    /// Current intent state for a session
    fn intent_state(&self, session_id: &str) -> Result<Option<IntentState>, IntentError>;

    /// Full transition history, chronological
    fn transitions(&self, session_id: &str) -> Result<Vec<ConfidenceTransition>, IntentError>;

    /// Per-type rollup of the session's full signal history, ordered by
    /// total score contribution then occurrence count, descending
    fn signal_breakdown(&self, session_id: &str) -> Result<Vec<SignalBreakdown>, IntentError>;

    /// Most recent signals, newest first, for drill-down and debugging
    fn recent_signals(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedSignal>, IntentError>;
}

/// Everything persisted for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionRecords {
    signals: Vec<NormalizedSignal>,
    state: Option<IntentState>,
    transitions: Vec<ConfidenceTransition>,
}

/// In-process store. Each session's records sit behind their own mutex, so
/// same-session processing serializes while distinct sessions run in
/// parallel. Units of work stage a working copy and swap it in on success.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionRecords>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with any recorded data
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Session ids currently present, sorted
    pub fn session_ids(&self) -> Vec<String> {
        match self.sessions.lock() {
            Ok(sessions) => {
                let mut ids: Vec<String> = sessions.keys().cloned().collect();
                ids.sort();
                ids
            }
            Err(_) => Vec::new(),
        }
    }

    /// Serialize the full store contents to JSON
    pub fn to_json(&self) -> Result<String, IntentError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| IntentError::StoreError("store map lock poisoned".to_string()))?;

        let mut snapshot: BTreeMap<String, SessionRecords> = BTreeMap::new();
        for (session_id, records) in sessions.iter() {
            let records = records
                .lock()
                .map_err(|_| IntentError::SessionLockPoisoned(session_id.clone()))?;
            snapshot.insert(session_id.clone(), records.clone());
        }
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Load a store from a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, IntentError> {
        let snapshot: BTreeMap<String, SessionRecords> = serde_json::from_str(json)?;
        let sessions = snapshot
            .into_iter()
            .map(|(session_id, records)| (session_id, Arc::new(Mutex::new(records))))
            .collect();
        Ok(Self {
            sessions: Mutex::new(sessions),
        })
    }

    fn session_entry(&self, session_id: &str) -> Result<Arc<Mutex<SessionRecords>>, IntentError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| IntentError::StoreError("store map lock poisoned".to_string()))?;
        Ok(sessions
            .entry(session_id.to_string())
            .or_default()
            .clone())
    }

    /// Existing entry without creating one; reads on unknown sessions stay
    /// side-effect free.
    fn existing_entry(&self, session_id: &str) -> Result<Option<Arc<Mutex<SessionRecords>>>, IntentError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| IntentError::StoreError("store map lock poisoned".to_string()))?;
        Ok(sessions.get(session_id).cloned())
    }
}

impl IntentStore for MemoryStore {
    fn with_session<T, F>(&self, session_id: &str, f: F) -> Result<T, IntentError>
    where
        F: FnOnce(&mut dyn SessionScope) -> Result<T, IntentError>,
    {
        let entry = self.session_entry(session_id)?;
        let mut records = entry
            .lock()
            .map_err(|_| IntentError::SessionLockPoisoned(session_id.to_string()))?;

        // Stage writes on a working copy; commit only on success.
        let mut working = records.clone();
        let result = f(&mut MemoryScope {
            records: &mut working,
        });
        if result.is_ok() {
            *records = working;
        }
        result
    }

    fn intent_state(&self, session_id: &str) -> Result<Option<IntentState>, IntentError> {
        match self.existing_entry(session_id)? {
            Some(entry) => {
                let records = entry
                    .lock()
                    .map_err(|_| IntentError::SessionLockPoisoned(session_id.to_string()))?;
                Ok(records.state.clone())
            }
            None => Ok(None),
        }
    }

    fn transitions(&self, session_id: &str) -> Result<Vec<ConfidenceTransition>, IntentError> {
        match self.existing_entry(session_id)? {
            Some(entry) => {
                let records = entry
                    .lock()
                    .map_err(|_| IntentError::SessionLockPoisoned(session_id.to_string()))?;
                let mut transitions = records.transitions.clone();
                transitions.sort_by_key(|t| t.transitioned_at);
                Ok(transitions)
            }
            None => Ok(Vec::new()),
        }
    }

    fn signal_breakdown(&self, session_id: &str) -> Result<Vec<SignalBreakdown>, IntentError> {
        let Some(entry) = self.existing_entry(session_id)? else {
            return Ok(Vec::new());
        };
        let records = entry
            .lock()
            .map_err(|_| IntentError::SessionLockPoisoned(session_id.to_string()))?;

        let mut breakdown: Vec<SignalBreakdown> = Vec::new();
        for signal in &records.signals {
            match breakdown
                .iter_mut()
                .find(|b| b.signal_type == signal.signal_type)
            {
                Some(row) => {
                    row.event_count += 1;
                    row.total_score += signal.score_value;
                    row.any_explicit |= signal.is_explicit;
                    row.first_seen_at = row.first_seen_at.min(signal.detected_at);
                    row.last_seen_at = row.last_seen_at.max(signal.detected_at);
                }
                None => breakdown.push(SignalBreakdown {
                    signal_type: signal.signal_type,
                    event_count: 1,
                    total_score: signal.score_value,
                    any_explicit: signal.is_explicit,
                    first_seen_at: signal.detected_at,
                    last_seen_at: signal.detected_at,
                }),
            }
        }

        breakdown.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then(b.event_count.cmp(&a.event_count))
        });
        Ok(breakdown)
    }

    fn recent_signals(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedSignal>, IntentError> {
        let Some(entry) = self.existing_entry(session_id)? else {
            return Ok(Vec::new());
        };
        let records = entry
            .lock()
            .map_err(|_| IntentError::SessionLockPoisoned(session_id.to_string()))?;

        let mut signals = records.signals.clone();
        signals.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        signals.truncate(limit);
        Ok(signals)
    }
}

/// Scope over a staged working copy of one session's records
struct MemoryScope<'a> {
    records: &'a mut SessionRecords,
}

impl SessionScope for MemoryScope<'_> {
    fn insert_signal(&mut self, signal: NormalizedSignal) {
        self.records.signals.push(signal);
    }

    fn signals_since(&self, cutoff: DateTime<Utc>) -> Vec<NormalizedSignal> {
        let mut signals: Vec<NormalizedSignal> = self
            .records
            .signals
            .iter()
            .filter(|s| s.detected_at > cutoff)
            .cloned()
            .collect();
        signals.sort_by_key(|s| s.detected_at);
        signals
    }

    fn state(&self) -> Option<IntentState> {
        self.records.state.clone()
    }

    fn put_state(&mut self, state: IntentState) {
        self.records.state = Some(state);
    }

    fn push_transition(&mut self, transition: ConfidenceTransition) {
        self.records.transitions.push(transition);
    }
}
