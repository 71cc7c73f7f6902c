//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the parking syncer:
//! vendor records, context-store wire shapes, configuration blueprint,
//! error taxonomy and the two I/O seams (`SensorApi`, `EntityStore`).
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are `chrono::DateTime<Utc>`
//! - Per-spot event order is ascending by timestamp; nothing is promised across spots

mod blueprint;
mod entity;
mod error;
mod model;
mod sink;
mod source;
mod sync;

pub use blueprint::*;
pub use entity::*;
pub use error::*;
pub use model::*;
pub use sink::{EntityStore, LocalEntityStore};
pub use source::{LocalSensorApi, SensorApi};
pub use sync::*;
