//! REST wire format
//!
//! Responses arrive wrapped in `{ "data": ..., "status": ..., "message": ... }`.
//! Payload field names are camelCase; dates come as `YYYY-MM-DD`, RFC 3339
//! timestamps, or locale labels such as `"Mon, Oct 12"`.

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::presentation::short_label;
use crate::types::{DailyActivitySample, WeeklySeries};

/// Response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Daily activity payload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivityDto {
    pub date: String,
    pub steps: f64,
    pub step_goal: f64,
    pub calories: f64,
    pub calorie_goal: f64,
    pub distance: f64,
    pub distance_goal: f64,
    pub active_minutes: f64,
    pub active_minutes_goal: f64,
}

/// Weekly activity payload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyActivityDto {
    pub dates: Vec<String>,
    pub steps: Vec<f64>,
    pub calories: Vec<f64>,
    pub distance: Vec<f64>,
    pub active_minutes: Vec<f64>,
}

impl DailyActivityDto {
    /// Convert to a validated sample. `anchor` resolves year-less dates.
    pub fn into_sample(self, anchor: NaiveDate) -> Result<DailyActivitySample, ComputeError> {
        let sample = DailyActivitySample {
            date: parse_day(&self.date, anchor)?,
            steps: to_count(self.steps, "steps")?,
            step_goal: to_count(self.step_goal, "stepGoal")?,
            calories: to_count(self.calories, "calories")?,
            calorie_goal: to_count(self.calorie_goal, "calorieGoal")?,
            distance_km: self.distance,
            distance_goal_km: self.distance_goal,
            active_minutes: to_count(self.active_minutes, "activeMinutes")?,
            active_minutes_goal: to_count(self.active_minutes_goal, "activeMinutesGoal")?,
        };
        sample.validate()?;
        Ok(sample)
    }
}

impl From<&DailyActivitySample> for DailyActivityDto {
    fn from(sample: &DailyActivitySample) -> Self {
        Self {
            date: sample.date.format("%Y-%m-%d").to_string(),
            steps: sample.steps as f64,
            step_goal: sample.step_goal as f64,
            calories: sample.calories as f64,
            calorie_goal: sample.calorie_goal as f64,
            distance: sample.distance_km,
            distance_goal: sample.distance_goal_km,
            active_minutes: sample.active_minutes as f64,
            active_minutes_goal: sample.active_minutes_goal as f64,
        }
    }
}

impl WeeklyActivityDto {
    /// Convert to an aligned series. `anchor` resolves year-less dates.
    pub fn into_series(self, anchor: NaiveDate) -> Result<WeeklySeries, ComputeError> {
        let dates = self
            .dates
            .iter()
            .map(|raw| parse_day(raw, anchor))
            .collect::<Result<Vec<_>, _>>()?;

        for (name, values) in [
            ("steps", &self.steps),
            ("calories", &self.calories),
            ("distance", &self.distance),
            ("activeMinutes", &self.active_minutes),
        ] {
            if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(ComputeError::InvalidValue(format!(
                    "{name} contains {bad}, expected non-negative numbers"
                )));
            }
        }

        // Locale labels keep the weekday the source named; other formats derive it
        let labels = self
            .dates
            .iter()
            .zip(&dates)
            .map(|(raw, date)| {
                if raw.contains(',') {
                    short_label(raw).to_string()
                } else {
                    date.format("%a").to_string()
                }
            })
            .collect();

        WeeklySeries::new(
            dates,
            self.steps,
            self.calories,
            self.distance,
            self.active_minutes,
        )?
        .with_labels(labels)
    }
}

impl From<&WeeklySeries> for WeeklyActivityDto {
    fn from(series: &WeeklySeries) -> Self {
        use crate::types::MetricKind;

        Self {
            dates: series
                .dates()
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect(),
            steps: series.values(MetricKind::Steps).to_vec(),
            calories: series.values(MetricKind::Calories).to_vec(),
            distance: series.values(MetricKind::Distance).to_vec(),
            active_minutes: series.values(MetricKind::ActiveMinutes).to_vec(),
        }
    }
}

/// Parse a daily payload, with or without the response envelope
pub fn parse_daily_json(raw_json: &str, anchor: NaiveDate) -> Result<DailyActivitySample, ComputeError> {
    let dto: DailyActivityDto = unwrap_envelope(raw_json)?;
    dto.into_sample(anchor)
}

/// Parse a weekly payload, with or without the response envelope
pub fn parse_weekly_json(raw_json: &str, anchor: NaiveDate) -> Result<WeeklySeries, ComputeError> {
    let dto: WeeklyActivityDto = unwrap_envelope(raw_json)?;
    dto.into_series(anchor)
}

fn unwrap_envelope<T: serde::de::DeserializeOwned>(raw_json: &str) -> Result<T, ComputeError> {
    let mut value: serde_json::Value = serde_json::from_str(raw_json)?;
    let payload = match value.get_mut("data") {
        Some(data) if data.is_object() => data.take(),
        _ => value,
    };
    Ok(serde_json::from_value(payload)?)
}

/// Parse a calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 (the date in the timestamp's own offset) and
/// locale labels such as `"Mon, Oct 12"`. A locale label carries no year, so it
/// resolves to the latest matching day that is not after `anchor`.
pub fn parse_day(raw: &str, anchor: NaiveDate) -> Result<NaiveDate, ComputeError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Some((_weekday, month_day)) = raw.split_once(',') {
        let month_day = month_day.trim();
        for year in [anchor.year(), anchor.year() - 1] {
            if let Ok(date) =
                NaiveDate::parse_from_str(&format!("{month_day} {year}"), "%b %d %Y")
            {
                if date <= anchor {
                    return Ok(date);
                }
            }
        }
    }

    Err(ComputeError::DateParseError(format!(
        "unrecognised date '{raw}'"
    )))
}

fn to_count(value: f64, field: &str) -> Result<u32, ComputeError> {
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(ComputeError::InvalidValue(format!(
            "{field} must be a non-negative count, got {value}"
        )));
    }
    Ok(value.round() as u32)
}
