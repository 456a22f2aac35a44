//! User profile and goal editing
//!
//! The profile owns the user's daily goals. Edits arrive as raw form text in a
//! [`ProfileDraft`] and are merged onto the stored profile.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::types::MetricKind;

/// Daily goals configured on a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSet {
    pub steps: u32,
    pub calories: u32,
    #[serde(rename = "distance")]
    pub distance_km: f64,
    pub active_minutes: u32,
}

impl GoalSet {
    pub fn get(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Steps => self.steps as f64,
            MetricKind::Calories => self.calories as f64,
            MetricKind::Distance => self.distance_km,
            MetricKind::ActiveMinutes => self.active_minutes as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub notifications: bool,
}

/// Stored user profile, in the shape the REST API exchanges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub age: u32,
    /// Centimetres
    #[serde(rename = "height")]
    pub height_cm: f64,
    /// Kilograms
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    pub goals: GoalSet,
    pub preferences: Preferences,
}

/// Raw text of the profile edit form.
///
/// `None` leaves the field untouched. Numeric text that does not parse to a
/// positive number also keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub age: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub step_goal: Option<String>,
    pub calorie_goal: Option<String>,
    pub notifications: Option<bool>,
}

impl ProfileDraft {
    /// Merge the draft onto `profile`, rejecting a blank name
    pub fn apply(&self, profile: &UserProfile) -> Result<UserProfile, ComputeError> {
        let name = match &self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(ComputeError::InvalidValue("Name cannot be empty".into()));
            }
            Some(name) => name.clone(),
            None => profile.name.clone(),
        };

        let mut goals = profile.goals.clone();
        goals.steps = parse_positive_int(self.step_goal.as_deref()).unwrap_or(goals.steps);
        goals.calories =
            parse_positive_int(self.calorie_goal.as_deref()).unwrap_or(goals.calories);

        Ok(UserProfile {
            id: profile.id.clone(),
            name,
            age: parse_positive_int(self.age.as_deref()).unwrap_or(profile.age),
            height_cm: parse_positive_float(self.height.as_deref()).unwrap_or(profile.height_cm),
            weight_kg: parse_positive_float(self.weight.as_deref()).unwrap_or(profile.weight_kg),
            goals,
            preferences: Preferences {
                notifications: self
                    .notifications
                    .unwrap_or(profile.preferences.notifications),
            },
        })
    }
}

fn parse_positive_int(text: Option<&str>) -> Option<u32> {
    text.and_then(|t| t.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

fn parse_positive_float(text: Option<&str>) -> Option<f64> {
    text.and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}
