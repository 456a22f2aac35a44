//! Built-in sample data and the fallback policy
//!
//! The sample data is what the dashboard shows when a fetch fails and the
//! caller chose [`FallbackPolicy::Substitute`]. It is always tagged as
//! fallback so the view can mark it stale.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use super::{ActivityRepository, GoalUpdate};
use crate::config::FallbackPolicy;
use crate::error::FetchError;
use crate::profile::{GoalSet, Preferences, UserProfile};
use crate::types::{DailyActivitySample, MetricKind, Sourced, WeeklySeries};

const WEEKLY_STEPS: [f64; 7] = [5235.0, 7629.0, 9123.0, 4531.0, 8752.0, 6421.0, 7432.0];
const WEEKLY_CALORIES: [f64; 7] = [328.0, 421.0, 485.0, 275.0, 461.0, 352.0, 385.0];
const WEEKLY_DISTANCE_KM: [f64; 7] = [3.6, 5.4, 6.5, 3.2, 6.1, 4.5, 5.2];
const WEEKLY_ACTIVE_MINUTES: [f64; 7] = [42.0, 65.0, 78.0, 35.0, 72.0, 51.0, 58.0];

/// Sample day: 7432/10000 steps, 385/500 kcal, 5.2/7 km, 58/60 min
pub fn fallback_daily_sample(today: NaiveDate) -> DailyActivitySample {
    DailyActivitySample {
        date: today,
        steps: 7432,
        step_goal: 10000,
        calories: 385,
        calorie_goal: 500,
        distance_km: 5.2,
        distance_goal_km: 7.0,
        active_minutes: 58,
        active_minutes_goal: 60,
    }
}

/// Sample week: the seven days ending `today`
pub fn fallback_weekly_series(today: NaiveDate) -> WeeklySeries {
    let dates: [NaiveDate; 7] =
        std::array::from_fn(|i| today - Duration::days(6 - i as i64));

    WeeklySeries::from_week(
        dates,
        WEEKLY_STEPS,
        WEEKLY_CALORIES,
        WEEKLY_DISTANCE_KM,
        WEEKLY_ACTIVE_MINUTES,
    )
}

pub fn fallback_profile() -> UserProfile {
    UserProfile {
        id: "1".to_string(),
        name: "Alex Johnson".to_string(),
        age: 32,
        height_cm: 175.0,
        weight_kg: 68.0,
        goals: GoalSet {
            steps: 10000,
            calories: 500,
            distance_km: 7.0,
            active_minutes: 60,
        },
        preferences: Preferences {
            notifications: true,
        },
    }
}

/// Apply the fallback policy to a fetch result.
///
/// Success is tagged live. A failure either becomes sample data tagged with the
/// failure reason, or is returned unchanged.
pub fn with_fallback<T, F>(
    result: Result<T, FetchError>,
    policy: FallbackPolicy,
    fallback: F,
) -> Result<Sourced<T>, FetchError>
where
    F: FnOnce() -> T,
{
    match (result, policy) {
        (Ok(data), _) => Ok(Sourced::live(data)),
        (Err(e), FallbackPolicy::Substitute) => {
            tracing::warn!(error = %e, "fetch failed, showing fallback data");
            Ok(Sourced::fallback(fallback(), e.to_string()))
        }
        (Err(e), FallbackPolicy::Propagate) => {
            tracing::warn!(error = %e, "fetch failed");
            Err(e)
        }
    }
}

/// In-memory repository serving the sample data.
///
/// Goal and profile updates are kept, so it behaves like a small mock backend.
pub struct SampleRepository {
    today: NaiveDate,
    daily: Mutex<DailyActivitySample>,
    profile: Mutex<UserProfile>,
}

impl SampleRepository {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            daily: Mutex::new(fallback_daily_sample(today)),
            profile: Mutex::new(fallback_profile()),
        }
    }
}

fn poisoned<T>(_: T) -> FetchError {
    FetchError::Network("sample repository lock poisoned".to_string())
}

#[async_trait]
impl ActivityRepository for SampleRepository {
    async fn get_daily_activity(&self) -> Result<DailyActivitySample, FetchError> {
        Ok(self.daily.lock().map_err(poisoned)?.clone())
    }

    async fn get_weekly_activity(&self) -> Result<WeeklySeries, FetchError> {
        Ok(fallback_weekly_series(self.today))
    }

    async fn update_goal(&self, update: GoalUpdate) -> Result<(), FetchError> {
        if !update.value.is_finite() || update.value <= 0.0 {
            return Err(FetchError::Server {
                status: 422,
                message: format!("goal must be positive, got {}", update.value),
            });
        }

        let mut daily = self.daily.lock().map_err(poisoned)?;
        let mut profile = self.profile.lock().map_err(poisoned)?;
        match update.metric {
            MetricKind::Steps => {
                daily.step_goal = update.value.round() as u32;
                profile.goals.steps = daily.step_goal;
            }
            MetricKind::Calories => {
                daily.calorie_goal = update.value.round() as u32;
                profile.goals.calories = daily.calorie_goal;
            }
            MetricKind::Distance => {
                daily.distance_goal_km = update.value;
                profile.goals.distance_km = update.value;
            }
            MetricKind::ActiveMinutes => {
                daily.active_minutes_goal = update.value.round() as u32;
                profile.goals.active_minutes = daily.active_minutes_goal;
            }
        }
        Ok(())
    }

    async fn get_profile(&self) -> Result<UserProfile, FetchError> {
        Ok(self.profile.lock().map_err(poisoned)?.clone())
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, FetchError> {
        let mut stored = self.profile.lock().map_err(poisoned)?;
        *stored = profile.clone();
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataOrigin;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_fallback_week_ends_today() {
        let series = fallback_weekly_series(today());
        assert_eq!(series.len(), 7);
        assert_eq!(series.dates()[6], today());
        assert_eq!(
            series.dates()[0],
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
    }

    #[test]
    fn test_fallback_sample_is_valid() {
        assert!(fallback_daily_sample(today()).validate().is_ok());
    }

    #[test]
    fn test_with_fallback_substitutes_and_marks() {
        let result: Result<u32, FetchError> = Err(FetchError::Network("refused".into()));
        let sourced = with_fallback(result, FallbackPolicy::Substitute, || 7).unwrap();
        assert_eq!(sourced.data, 7);
        assert_eq!(
            sourced.origin,
            DataOrigin::Fallback {
                reason: "network error: refused".to_string()
            }
        );
    }

    #[test]
    fn test_with_fallback_propagates() {
        let result: Result<u32, FetchError> = Err(FetchError::Server {
            status: 500,
            message: "boom".into(),
        });
        let outcome = with_fallback(result, FallbackPolicy::Propagate, || 7);
        assert_eq!(outcome.unwrap_err().status(), Some(500));
    }

    #[test]
    fn test_with_fallback_tags_success_live() {
        let sourced = with_fallback(Ok(3), FallbackPolicy::Substitute, || 7).unwrap();
        assert_eq!(sourced.data, 3);
        assert!(!sourced.is_stale());
    }

    #[tokio::test]
    async fn test_sample_repository_applies_goal_updates() {
        let repo = SampleRepository::new(today());
        repo.update_goal(GoalUpdate {
            metric: MetricKind::Steps,
            value: 12000.0,
        })
        .await
        .unwrap();

        let daily = repo.get_daily_activity().await.unwrap();
        assert_eq!(daily.step_goal, 12000);
        assert_eq!(repo.get_profile().await.unwrap().goals.steps, 12000);

        let rejected = repo
            .update_goal(GoalUpdate {
                metric: MetricKind::Calories,
                value: 0.0,
            })
            .await;
        assert_eq!(rejected.unwrap_err().status(), Some(422));
    }
}
