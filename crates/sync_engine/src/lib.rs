//! # Sync Engine
//!
//! Gateway side of the predictive synchronization protocol.
//!
//! Responsibilities:
//! - Classify transport lines (reading / ping / malformed)
//! - Roll the predictor forward, update it from real readings
//! - Clock-sync replies and periodic standalone estimates
//! - Threshold / heartbeat transmission policy and its edge mirror
//!
//! ## Example
//!
//! ```ignore
//! use sync_engine::{ProtocolRunner, RunnerSettings, SyncEngine, SystemClock};
//!
//! let clock = SystemClock::new(protocol.utc_offset_minutes)?;
//! let engine = SyncEngine::new(predictor, &protocol, clock.now());
//! let runner = ProtocolRunner::new(
//!     connector,
//!     clock,
//!     engine,
//!     event_tx,
//!     shutdown_rx,
//!     RunnerSettings::from_protocol(&protocol),
//! );
//! let report = runner.run().await?;
//! ```

mod classifier;
mod clock;
mod edge;
mod engine;
mod policy;
mod runner;

pub use classifier::{LineClassifier, LineKind, MalformedReason};
pub use clock::{Clock, ManualClock, SystemClock};
pub use edge::{BaselineMode, EdgeMirror};
pub use engine::{clock_reply, EngineStats, LineOutcome, ProtocolState, SyncEngine};
pub use policy::{decide, trigger_reason, Decision, PolicyState, Verdict};
pub use runner::{ProtocolRunner, RunReport, RunnerSettings, StopReason};
