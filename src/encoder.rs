//! Dashboard encoding
//!
//! Stamps daily and weekly views with producer and provenance metadata and
//! serializes them as the JSON handed to a view layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::presentation::{DailyView, WeeklyView};
use crate::types::{DataOrigin, Sourced};
use crate::{PRODUCER_NAME, VERSION};

/// Current dashboard payload schema version
pub const DASHBOARD_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardProvenance {
    /// Fallback if any section was built from fallback data
    pub origin: DataOrigin,
    pub computed_at_utc: String,
}

/// One screen's view together with where its data came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSection<V> {
    pub origin: DataOrigin,
    pub view: V,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub schema_version: String,
    pub producer: DashboardProducer,
    pub provenance: DashboardProvenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<DashboardSection<DailyView>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly: Option<DashboardSection<WeeklyView>>,
}

/// Encoder for dashboard payloads
pub struct DashboardEncoder {
    instance_id: String,
}

impl Default for DashboardEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardEncoder {
    /// Create an encoder with a fresh instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode the available views. At least one section is required.
    pub fn encode(
        &self,
        daily: Option<&Sourced<DailyView>>,
        weekly: Option<&Sourced<WeeklyView>>,
    ) -> Result<DashboardPayload, ComputeError> {
        self.encode_at(daily, weekly, Utc::now())
    }

    fn encode_at(
        &self,
        daily: Option<&Sourced<DailyView>>,
        weekly: Option<&Sourced<WeeklyView>>,
        computed_at: DateTime<Utc>,
    ) -> Result<DashboardPayload, ComputeError> {
        if daily.is_none() && weekly.is_none() {
            return Err(ComputeError::EmptyInput(
                "dashboard needs a daily or weekly view".to_string(),
            ));
        }

        let origin = [
            daily.map(|d| &d.origin),
            weekly.map(|w| &w.origin),
        ]
        .into_iter()
        .flatten()
        .find(|o| matches!(o, DataOrigin::Fallback { .. }))
        .cloned()
        .unwrap_or(DataOrigin::Live);

        Ok(DashboardPayload {
            schema_version: DASHBOARD_SCHEMA_VERSION.to_string(),
            producer: DashboardProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: DashboardProvenance {
                origin,
                computed_at_utc: computed_at.to_rfc3339(),
            },
            daily: daily.map(section),
            weekly: weekly.map(section),
        })
    }

    /// Encode to a pretty JSON string
    pub fn encode_to_json(
        &self,
        daily: Option<&Sourced<DailyView>>,
        weekly: Option<&Sourced<WeeklyView>>,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(daily, weekly)?;
        serde_json::to_string_pretty(&payload).map_err(ComputeError::JsonError)
    }
}

fn section<V: Clone>(sourced: &Sourced<V>) -> DashboardSection<V> {
    DashboardSection {
        origin: sourced.origin.clone(),
        view: sourced.data.clone(),
    }
}
