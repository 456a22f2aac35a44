//! Core types for the Activity Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw samples from the repository, derived progress and statistics,
//! and the provenance marker that tells the view whether data is live.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ComputeError;

/// Number of tracked metrics, and the fixed denominator of the daily completion score.
/// Adding a metric to [`MetricKind`] must update this constant.
pub const GOAL_COUNT: usize = 4;

/// One of the four tracked activity quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Steps,
    Calories,
    Distance,
    ActiveMinutes,
}

impl MetricKind {
    /// All metrics in display order
    pub const ALL: [MetricKind; GOAL_COUNT] = [
        MetricKind::Steps,
        MetricKind::Calories,
        MetricKind::Distance,
        MetricKind::ActiveMinutes,
    ];

    /// Wire identifier, as used by the goal update endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Steps => "steps",
            MetricKind::Calories => "calories",
            MetricKind::Distance => "distance",
            MetricKind::ActiveMinutes => "activeMinutes",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKind::Steps => "Steps",
            MetricKind::Calories => "Calories",
            MetricKind::Distance => "Distance",
            MetricKind::ActiveMinutes => "Active Minutes",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "steps" => Ok(MetricKind::Steps),
            "calories" => Ok(MetricKind::Calories),
            "distance" => Ok(MetricKind::Distance),
            "activeminutes" => Ok(MetricKind::ActiveMinutes),
            _ => Err(ComputeError::UnknownMetric(s.to_string())),
        }
    }
}

/// One day's recorded activity plus that day's goals.
///
/// Every goal must be positive. Deserialization enforces this; a sample built
/// field by field should be checked with [`DailyActivitySample::validate`]
/// before it reaches the aggregation functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedDailyActivitySample")]
pub struct DailyActivitySample {
    pub date: NaiveDate,
    pub steps: u32,
    pub step_goal: u32,
    /// Kilocalories burned
    pub calories: u32,
    pub calorie_goal: u32,
    pub distance_km: f64,
    pub distance_goal_km: f64,
    pub active_minutes: u32,
    pub active_minutes_goal: u32,
}

#[derive(Deserialize)]
struct UncheckedDailyActivitySample {
    date: NaiveDate,
    steps: u32,
    step_goal: u32,
    calories: u32,
    calorie_goal: u32,
    distance_km: f64,
    distance_goal_km: f64,
    active_minutes: u32,
    active_minutes_goal: u32,
}

impl TryFrom<UncheckedDailyActivitySample> for DailyActivitySample {
    type Error = ComputeError;

    fn try_from(raw: UncheckedDailyActivitySample) -> Result<Self, Self::Error> {
        let sample = DailyActivitySample {
            date: raw.date,
            steps: raw.steps,
            step_goal: raw.step_goal,
            calories: raw.calories,
            calorie_goal: raw.calorie_goal,
            distance_km: raw.distance_km,
            distance_goal_km: raw.distance_goal_km,
            active_minutes: raw.active_minutes,
            active_minutes_goal: raw.active_minutes_goal,
        };
        sample.validate()?;
        Ok(sample)
    }
}

impl DailyActivitySample {
    /// Recorded value for a metric
    pub fn current(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Steps => self.steps as f64,
            MetricKind::Calories => self.calories as f64,
            MetricKind::Distance => self.distance_km,
            MetricKind::ActiveMinutes => self.active_minutes as f64,
        }
    }

    /// Goal for a metric
    pub fn goal(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Steps => self.step_goal as f64,
            MetricKind::Calories => self.calorie_goal as f64,
            MetricKind::Distance => self.distance_goal_km,
            MetricKind::ActiveMinutes => self.active_minutes_goal as f64,
        }
    }

    /// Check that every goal is positive and every value is a finite, non-negative number
    pub fn validate(&self) -> Result<(), ComputeError> {
        for metric in MetricKind::ALL {
            let goal = self.goal(metric);
            if !goal.is_finite() || goal <= 0.0 {
                return Err(ComputeError::InvalidGoal(goal));
            }
            let current = self.current(metric);
            if !current.is_finite() || current < 0.0 {
                return Err(ComputeError::InvalidValue(format!(
                    "{metric} must be a non-negative number, got {current}"
                )));
            }
        }
        Ok(())
    }
}

/// Seven (or more generally N) index-aligned days of per-metric values.
///
/// Fields are private so the alignment invariant holds for every instance:
/// each metric sequence and the label list have exactly `dates.len()` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedWeeklySeries")]
pub struct WeeklySeries {
    dates: Vec<NaiveDate>,
    /// Short day labels as the source named the days ("Mon")
    labels: Vec<String>,
    steps: Vec<f64>,
    calories: Vec<f64>,
    distance_km: Vec<f64>,
    active_minutes: Vec<f64>,
}

#[derive(Deserialize)]
struct UncheckedWeeklySeries {
    dates: Vec<NaiveDate>,
    #[serde(default)]
    labels: Option<Vec<String>>,
    steps: Vec<f64>,
    calories: Vec<f64>,
    distance_km: Vec<f64>,
    active_minutes: Vec<f64>,
}

impl TryFrom<UncheckedWeeklySeries> for WeeklySeries {
    type Error = ComputeError;

    fn try_from(raw: UncheckedWeeklySeries) -> Result<Self, Self::Error> {
        let series = WeeklySeries::new(
            raw.dates,
            raw.steps,
            raw.calories,
            raw.distance_km,
            raw.active_minutes,
        )?;
        match raw.labels {
            Some(labels) => series.with_labels(labels),
            None => Ok(series),
        }
    }
}

/// Weekday abbreviation of a date ("Mon")
fn weekday_label(date: &NaiveDate) -> String {
    date.format("%a").to_string()
}

impl WeeklySeries {
    /// Build a series, rejecting sequences whose length differs from `dates`
    pub fn new(
        dates: Vec<NaiveDate>,
        steps: Vec<f64>,
        calories: Vec<f64>,
        distance_km: Vec<f64>,
        active_minutes: Vec<f64>,
    ) -> Result<Self, ComputeError> {
        let expected = dates.len();
        for (metric, values) in [
            (MetricKind::Steps, &steps),
            (MetricKind::Calories, &calories),
            (MetricKind::Distance, &distance_km),
            (MetricKind::ActiveMinutes, &active_minutes),
        ] {
            if values.len() != expected {
                return Err(ComputeError::MisalignedSeries {
                    metric: metric.to_string(),
                    expected,
                    found: values.len(),
                });
            }
        }

        Ok(Self {
            labels: dates.iter().map(weekday_label).collect(),
            dates,
            steps,
            calories,
            distance_km,
            active_minutes,
        })
    }

    /// Replace the derived weekday labels with the ones the source supplied
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self, ComputeError> {
        if labels.len() != self.dates.len() {
            return Err(ComputeError::MisalignedSeries {
                metric: "labels".to_string(),
                expected: self.dates.len(),
                found: labels.len(),
            });
        }
        self.labels = labels;
        Ok(self)
    }

    /// Build a seven-day series; fixed-size arrays make it aligned by construction
    pub fn from_week(
        dates: [NaiveDate; 7],
        steps: [f64; 7],
        calories: [f64; 7],
        distance_km: [f64; 7],
        active_minutes: [f64; 7],
    ) -> Self {
        Self {
            labels: dates.iter().map(weekday_label).collect(),
            dates: dates.to_vec(),
            steps: steps.to_vec(),
            calories: calories.to_vec(),
            distance_km: distance_km.to_vec(),
            active_minutes: active_minutes.to_vec(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Day labels, index-aligned with [`WeeklySeries::dates`]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The sequence backing a metric
    pub fn values(&self, metric: MetricKind) -> &[f64] {
        match metric {
            MetricKind::Steps => &self.steps,
            MetricKind::Calories => &self.calories,
            MetricKind::Distance => &self.distance_km,
            MetricKind::ActiveMinutes => &self.active_minutes,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Progress towards a single goal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// current / goal, capped at 1.0
    pub ratio: f64,
    /// Amount still missing, never negative
    pub remaining: f64,
}

impl GoalProgress {
    pub fn is_complete(&self) -> bool {
        self.ratio >= 1.0
    }

    /// Ratio as a rounded percentage (0-100)
    pub fn percentage(&self) -> u32 {
        (self.ratio * 100.0).round() as u32
    }
}

/// Progress of one metric within a daily sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricProgress {
    pub metric: MetricKind,
    pub current: f64,
    pub goal: f64,
    pub progress: GoalProgress,
}

/// Per-metric progress for one day plus the completion score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub metrics: Vec<MetricProgress>,
    /// Number of metrics whose goal was reached (0-4)
    pub goals_achieved: usize,
    /// goals_achieved / GOAL_COUNT
    pub completion: f64,
}

impl DailyProgress {
    pub fn metric(&self, metric: MetricKind) -> Option<&MetricProgress> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

/// Aggregates of one metric over a weekly series. `average` is never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStatistics {
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Earliest index holding `max`
    pub best_day_index: usize,
}

/// Where a piece of displayed data came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    /// Substituted sample data; the view must mark it as unavailable or stale
    Fallback { reason: String },
}

/// Data tagged with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub data: T,
    pub origin: DataOrigin,
}

impl<T> Sourced<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            origin: DataOrigin::Live,
        }
    }

    pub fn fallback(data: T, reason: impl Into<String>) -> Self {
        Self {
            data,
            origin: DataOrigin::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.origin, DataOrigin::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_metric_from_str_variants() {
        assert_eq!("steps".parse::<MetricKind>().unwrap(), MetricKind::Steps);
        assert_eq!(
            "activeMinutes".parse::<MetricKind>().unwrap(),
            MetricKind::ActiveMinutes
        );
        assert_eq!(
            "active_minutes".parse::<MetricKind>().unwrap(),
            MetricKind::ActiveMinutes
        );
        assert_eq!("Distance".parse::<MetricKind>().unwrap(), MetricKind::Distance);
        assert!(matches!(
            "heart_rate".parse::<MetricKind>(),
            Err(ComputeError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_metric_serde_uses_wire_names() {
        let json = serde_json::to_string(&MetricKind::ActiveMinutes).unwrap();
        assert_eq!(json, "\"activeMinutes\"");
        let parsed: MetricKind = serde_json::from_str("\"calories\"").unwrap();
        assert_eq!(parsed, MetricKind::Calories);
    }

    #[test]
    fn test_weekly_series_rejects_misaligned() {
        let result = WeeklySeries::new(
            vec![day(1), day(2)],
            vec![1.0, 2.0],
            vec![1.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
        );
        match result {
            Err(ComputeError::MisalignedSeries {
                metric,
                expected,
                found,
            }) => {
                assert_eq!(metric, "calories");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected misalignment error, got {other:?}"),
        }
    }

    #[test]
    fn test_weekly_series_deserialize_checks_alignment() {
        let json = r#"{
            "dates": ["2024-01-01"],
            "steps": [1.0, 2.0],
            "calories": [1.0],
            "distance_km": [1.0],
            "active_minutes": [1.0]
        }"#;
        assert!(serde_json::from_str::<WeeklySeries>(json).is_err());
    }

    #[test]
    fn test_sample_validate_rejects_zero_goal() {
        let sample = DailyActivitySample {
            date: day(15),
            steps: 100,
            step_goal: 0,
            calories: 10,
            calorie_goal: 500,
            distance_km: 1.0,
            distance_goal_km: 7.0,
            active_minutes: 5,
            active_minutes_goal: 60,
        };
        assert!(matches!(
            sample.validate(),
            Err(ComputeError::InvalidGoal(g)) if g == 0.0
        ));
    }

    #[test]
    fn test_weekly_series_labels_default_to_weekday() {
        let series = WeeklySeries::new(
            vec![day(1), day(2)],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
        )
        .unwrap();
        assert_eq!(series.labels(), &["Mon".to_string(), "Tue".to_string()]);

        let relabelled = series.clone().with_labels(vec!["Sun".into(), "Mon".into()]).unwrap();
        assert_eq!(relabelled.labels()[0], "Sun");
        assert!(matches!(
            series.with_labels(vec!["Sun".into()]),
            Err(ComputeError::MisalignedSeries { .. })
        ));
    }

    #[test]
    fn test_sample_deserialize_rejects_zero_goal() {
        let json = r#"{
            "date": "2024-01-15",
            "steps": 100, "step_goal": 0,
            "calories": 10, "calorie_goal": 500,
            "distance_km": 1.0, "distance_goal_km": 7.0,
            "active_minutes": 5, "active_minutes_goal": 60
        }"#;
        let err = serde_json::from_str::<DailyActivitySample>(json).unwrap_err();
        assert!(err.to_string().contains("Invalid goal"));

        let valid = json.replace("\"step_goal\": 0", "\"step_goal\": 10000");
        let sample: DailyActivitySample = serde_json::from_str(&valid).unwrap();
        assert_eq!(sample.step_goal, 10000);
    }

    #[test]
    fn test_sourced_origin() {
        let live = Sourced::live(1);
        assert!(!live.is_stale());
        let stale = Sourced::fallback(1, "network error: refused");
        assert!(stale.is_stale());
        let json = serde_json::to_value(&stale.origin).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(json["reason"], "network error: refused");
    }
}
