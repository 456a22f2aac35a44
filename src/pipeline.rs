//! Pipeline orchestration
//!
//! JSON-in / JSON-out entry points used by the CLI and the FFI layer.
//! Stages: wire decode → aggregation → presentation → dashboard encoding.

use chrono::{Local, NaiveDate};

use crate::aggregation::{compute_weekly_statistics, daily_progress};
use crate::encoder::DashboardEncoder;
use crate::error::ComputeError;
use crate::presentation::{chart_view, daily_view, weekly_summary_view, DailyView, WeeklyView};
use crate::repository::wire::{parse_daily_json, parse_weekly_json};
use crate::types::{DailyActivitySample, MetricKind, Sourced, WeeklySeries};

/// Daily screen view for a sample
pub fn build_daily_view(sample: &DailyActivitySample) -> Result<DailyView, ComputeError> {
    let progress = daily_progress(sample)?;
    Ok(daily_view(&progress))
}

/// Weekly screen view (chart, statistics, summary) for one metric
pub fn build_weekly_view(
    series: &WeeklySeries,
    metric: MetricKind,
) -> Result<WeeklyView, ComputeError> {
    let statistics = compute_weekly_statistics(series, metric)?;
    let summary = weekly_summary_view(series, &statistics, metric)?;
    Ok(WeeklyView {
        chart: chart_view(series, metric),
        statistics,
        summary,
    })
}

/// Convert a daily activity payload to a dashboard JSON payload.
///
/// Accepts the REST envelope or the bare payload. Year-less dates resolve
/// against today's local date.
pub fn daily_json_to_dashboard(raw_json: &str) -> Result<String, ComputeError> {
    ActivityProcessor::new().daily_dashboard(raw_json)
}

/// Convert a weekly activity payload to a dashboard JSON payload for `metric`
pub fn weekly_json_to_dashboard(raw_json: &str, metric: MetricKind) -> Result<String, ComputeError> {
    ActivityProcessor::new().weekly_dashboard(raw_json, metric)
}

/// Weekly statistics of `metric` as JSON
pub fn weekly_statistics_json(raw_json: &str, metric: MetricKind) -> Result<String, ComputeError> {
    ActivityProcessor::new().weekly_statistics(raw_json, metric)
}

/// Reusable processor with a fixed encoder identity and optional anchor day.
pub struct ActivityProcessor {
    encoder: DashboardEncoder,
    anchor: Option<NaiveDate>,
}

impl Default for ActivityProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityProcessor {
    pub fn new() -> Self {
        Self {
            encoder: DashboardEncoder::new(),
            anchor: None,
        }
    }

    /// Resolve year-less dates against `anchor` instead of today
    pub fn with_anchor_date(mut self, anchor: NaiveDate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_encoder(mut self, encoder: DashboardEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    fn anchor(&self) -> NaiveDate {
        self.anchor.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn daily_view(&self, raw_json: &str) -> Result<DailyView, ComputeError> {
        let sample = parse_daily_json(raw_json, self.anchor())?;
        build_daily_view(&sample)
    }

    pub fn weekly_view(&self, raw_json: &str, metric: MetricKind) -> Result<WeeklyView, ComputeError> {
        let series = parse_weekly_json(raw_json, self.anchor())?;
        build_weekly_view(&series, metric)
    }

    pub fn daily_dashboard(&self, raw_json: &str) -> Result<String, ComputeError> {
        let view = Sourced::live(self.daily_view(raw_json)?);
        self.encoder.encode_to_json(Some(&view), None)
    }

    pub fn weekly_dashboard(&self, raw_json: &str, metric: MetricKind) -> Result<String, ComputeError> {
        let view = Sourced::live(self.weekly_view(raw_json, metric)?);
        self.encoder.encode_to_json(None, Some(&view))
    }

    pub fn weekly_statistics(&self, raw_json: &str, metric: MetricKind) -> Result<String, ComputeError> {
        let series = parse_weekly_json(raw_json, self.anchor())?;
        let stats = compute_weekly_statistics(&series, metric)?;
        serde_json::to_string_pretty(&stats).map_err(ComputeError::JsonError)
    }
}
