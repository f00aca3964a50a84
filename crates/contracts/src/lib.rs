//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the gateway.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Capture times are local wall-clock `DateTime<FixedOffset>` (configured UTC offset)
//! - `time_fraction` is seconds since local midnight / 86400, always in `[0, 1)`
//! - Clock-sync replies sent to the sensor are UTC epoch seconds

mod audit;
mod blueprint;
mod error;
mod event;
mod model;
mod reading;
mod sink;
mod transport;

pub use audit::*;
pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use model::*;
pub use reading::*;
pub use sink::*;
pub use transport::*;
