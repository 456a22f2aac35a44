//! Activity repositories
//!
//! A repository supplies raw daily samples, weekly series and the user profile.
//! Implementations return every failure to the caller; substituting sample data
//! is a caller decision (see [`fallback::with_fallback`]).

pub mod fallback;
mod http;
pub mod wire;

pub use fallback::SampleRepository;
pub use http::ReqwestActivityRepository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::profile::UserProfile;
use crate::types::{DailyActivitySample, MetricKind, WeeklySeries};

/// New goal value for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalUpdate {
    #[serde(rename = "type")]
    pub metric: MetricKind,
    pub value: f64,
}

/// Source of activity data
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Today's sample with its goals
    async fn get_daily_activity(&self) -> Result<DailyActivitySample, FetchError>;

    /// The most recent days, oldest first
    async fn get_weekly_activity(&self) -> Result<WeeklySeries, FetchError>;

    async fn update_goal(&self, update: GoalUpdate) -> Result<(), FetchError>;

    async fn get_profile(&self) -> Result<UserProfile, FetchError>;

    /// Store a profile and return the stored version
    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, FetchError>;
}
