//! fitintent - Session-level purchase-intent scoring engine
//!
//! fitintent converts a stream of per-visitor behavioral events into a
//! session-level purchase-intent confidence label through a deterministic
//! pipeline: signal mapping → rolling-window aggregation → confidence
//! resolution → state merge, all inside one per-session atomic unit of work.
//!
//! ## Modules
//!
//! - **mapper**: pure raw event → signal classification
//! - **aggregator**: rolling-window scoring with caps and combo facts
//! - **resolver**: score → confidence level, upgrade gating
//! - **engine**: per-event orchestration against a store
//! - **store**: persistence boundary traits and the in-memory store

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod resolver;
pub mod state;
pub mod store;
pub mod types;

pub use aggregator::ScoreAggregator;
pub use config::{ConfidenceThresholds, IntentConfig, KeywordLists};
pub use engine::{EventOutcome, IntentEngine};
pub use error::IntentError;
pub use mapper::SignalMapper;
pub use store::{IntentStore, MemoryStore, SessionScope};
pub use types::{
    Confidence, ConfidenceTransition, EventType, IntentState, NormalizedSignal, RawEvent,
    SignalBreakdown, SignalCandidate, SignalType, WindowAggregate,
};

/// Engine version embedded in CLI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for emitted records
pub const PRODUCER_NAME: &str = "fitintent";
