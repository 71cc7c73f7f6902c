//! # Ingestion
//!
//! Parking sensor API access.
//!
//! Responsibilities:
//! - Log in and hold the session token
//! - List projects / zones / devices / spots / parkings
//! - Fetch per-spot occupancy events over a clamped window
//! - Throttle every request through a shared token bucket
//! - Degrade failed event fetches to empty results
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::SensorApi;
//! use ingestion::SensorApiClient;
//!
//! let client = SensorApiClient::login(&blueprint.sensor_api).await?;
//! for (project_id, _) in client.projects().await? {
//!     let spots = client.spots(&project_id).await?;
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockSensorApi;
//!
//! let api = MockSensorApi::new().with_project(project).with_spot("1", spot);
//! ```

mod client;
mod metrics;
mod mock;
mod rate_limiter;
mod window;

// Re-exports
pub use client::{SensorApiClient, IDENTITY_HEADER};
pub use metrics::{FetchMetrics, FetchMetricsSnapshot};
pub use mock::{EventQuery, MockSensorApi};
pub use rate_limiter::TokenBucket;
pub use window::{FetchWindow, MAX_FETCH_WINDOW_DAYS};
