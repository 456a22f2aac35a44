//! Activity Flux - activity aggregation and presentation core
//!
//! Flux turns daily and weekly activity data into what a fitness dashboard
//! shows through a deterministic pipeline: repository fetch → aggregation
//! (goal progress, weekly statistics) → presentation (chart series, labels,
//! units) → dashboard encoding.
//!
//! ## Modules
//!
//! - **Compute**: [`aggregation`] and [`presentation`] are pure and never log
//! - **Data access**: [`repository`] (REST client, fallback data), [`retry`], [`config`]
//! - **State**: [`state`] holds per-screen load state and discards superseded fetches
//! - **Outer surfaces**: [`pipeline`] (JSON in/out), [`ffi`] (C ABI), `aflux` CLI

pub mod aggregation;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod presentation;
pub mod profile;
pub mod repository;
pub mod retry;
pub mod state;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{FallbackPolicy, RepositoryConfig};
pub use encoder::{DashboardEncoder, DashboardPayload};
pub use error::{ActivityError, ComputeError, FetchError};
pub use pipeline::{
    daily_json_to_dashboard, weekly_json_to_dashboard, weekly_statistics_json, ActivityProcessor,
};
pub use repository::{ActivityRepository, GoalUpdate, ReqwestActivityRepository, SampleRepository};
pub use state::{ActivityDashboard, LoadState};
pub use types::{DailyActivitySample, MetricKind, Sourced, WeeklySeries};

/// Library version embedded in dashboard payloads
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for dashboard payloads
pub const PRODUCER_NAME: &str = "activity-flux";
