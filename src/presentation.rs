//! Presentation adapter
//!
//! Maps raw series and aggregated values into display-ready structures: chart
//! datasets, formatted labels and unit suffixes. Nothing here computes business
//! values; every number shown comes from [`crate::aggregation`] or the raw data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::types::{DailyProgress, MetricKind, WeeklySeries, WeeklyStatistics, GOAL_COUNT};

/// Chart dataset for one metric of a weekly series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// Day labels as the source named them, index-aligned with `values`
    pub labels: Vec<String>,
    /// Raw values, no unit conversion
    pub values: Vec<f64>,
}

/// Chart dataset plus the axis settings a renderer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartView {
    pub metric: MetricKind,
    pub title: String,
    pub series: ChartSeries,
    /// Axis tick text per value ("7.4k" for steps), index-aligned with `series.values`
    pub y_labels: Vec<String>,
    pub y_axis_suffix: String,
    pub decimal_places: usize,
}

/// Formatted weekly summary grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummaryView {
    pub metric: MetricKind,
    pub total: String,
    pub average: String,
    pub best_day: String,
    pub best_day_label: String,
    pub min: String,
}

/// One row of the daily goals list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalLineView {
    pub metric: MetricKind,
    pub name: String,
    /// e.g. "5.2km / 7km"
    pub values_label: String,
    pub ratio: f64,
    pub completed: bool,
}

/// Step progress card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgressView {
    pub percentage: u32,
    pub ratio: f64,
    pub steps: String,
    pub goal: String,
    pub remaining: String,
}

/// Summary card for a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCardView {
    pub metric: MetricKind,
    pub title: String,
    pub value: String,
    pub unit: String,
    pub ratio: f64,
}

/// Everything the daily screen shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyView {
    pub date: NaiveDate,
    pub step_progress: StepProgressView,
    pub cards: Vec<ActivityCardView>,
    /// e.g. "2/4"
    pub score_label: String,
    pub completion: f64,
    pub goals: Vec<GoalLineView>,
}

/// Everything the weekly screen shows for the selected metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyView {
    pub chart: ChartView,
    pub statistics: WeeklyStatistics,
    pub summary: WeeklySummaryView,
}

/// Unit suffix shown next to weekly values. Steps carry no unit.
pub fn unit_suffix(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::Steps => "",
        MetricKind::Calories => "kcal",
        MetricKind::Distance => "km",
        MetricKind::ActiveMinutes => "min",
    }
}

/// Unit printed under an activity card value
pub fn card_unit(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::Steps => "steps",
        other => unit_suffix(other),
    }
}

/// Decimal places used when displaying a metric
pub fn decimal_places(metric: MetricKind) -> usize {
    match metric {
        MetricKind::Distance => 1,
        _ => 0,
    }
}

/// Y-axis suffix: the unit with a leading space, or nothing
pub fn y_axis_suffix(metric: MetricKind) -> String {
    with_leading_space(unit_suffix(metric))
}

pub fn chart_title(metric: MetricKind) -> String {
    format!("Weekly {}", metric.display_name())
}

/// Format a value for display.
///
/// `decimal_places` overrides the metric default (1 for distance, 0 otherwise).
/// Integer output is rounded half away from zero and grouped with commas.
pub fn format_value(value: f64, metric: MetricKind, decimal_places: Option<usize>) -> String {
    let places = decimal_places.unwrap_or_else(|| self::decimal_places(metric));
    format_number(value, places)
}

/// Format with fixed decimals and thousands separators
pub fn format_number(value: f64, places: usize) -> String {
    let fixed = if places == 0 {
        format!("{:.0}", value.round())
    } else {
        format!("{value:.places$}")
    };
    group_thousands(&fixed)
}

/// Format like a locale number: grouped, up to three fractional digits, no trailing zeros
pub fn format_plain(value: f64) -> String {
    let fixed = format!("{value:.3}");
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    group_thousands(trimmed)
}

/// Y-axis tick label. Step counts above 1000 are abbreviated ("7.4k").
pub fn format_axis_label(value: f64, metric: MetricKind) -> String {
    if metric == MetricKind::Steps && value > 1000.0 {
        return format!("{:.1}k", value / 1000.0);
    }
    let places = decimal_places(metric);
    if places == 0 {
        format!("{:.0}", value.round())
    } else {
        format!("{value:.places$}")
    }
}

/// Keep the text before the first comma of a locale date label ("Mon, Oct 12" → "Mon")
pub fn short_label(raw: &str) -> &str {
    raw.split(',').next().unwrap_or(raw).trim()
}

/// Chart dataset for the selected metric
pub fn to_chart_series(series: &WeeklySeries, metric: MetricKind) -> ChartSeries {
    ChartSeries {
        labels: series.labels().to_vec(),
        values: series.values(metric).to_vec(),
    }
}

/// Chart dataset with title and axis settings
pub fn chart_view(series: &WeeklySeries, metric: MetricKind) -> ChartView {
    ChartView {
        metric,
        title: chart_title(metric),
        y_labels: series
            .values(metric)
            .iter()
            .map(|v| format_axis_label(*v, metric))
            .collect(),
        series: to_chart_series(series, metric),
        y_axis_suffix: y_axis_suffix(metric),
        decimal_places: decimal_places(metric),
    }
}

/// Formatted summary grid for weekly statistics.
///
/// Only the average honours the distance decimal; totals and extremes are
/// rounded integers.
pub fn weekly_summary_view(
    series: &WeeklySeries,
    stats: &WeeklyStatistics,
    metric: MetricKind,
) -> Result<WeeklySummaryView, ComputeError> {
    let best_label = series.labels().get(stats.best_day_index).ok_or_else(|| {
        ComputeError::InvalidValue(format!(
            "best day index {} outside a {}-day series",
            stats.best_day_index,
            series.len()
        ))
    })?;
    let unit = with_leading_space(unit_suffix(metric));

    Ok(WeeklySummaryView {
        metric,
        total: format!("{}{unit}", format_number(stats.total, 0)),
        average: format!("{}{unit}", format_value(stats.average, metric, None)),
        best_day: format!("{}{unit}", format_number(stats.max, 0)),
        best_day_label: best_label.clone(),
        min: format!("{}{unit}", format_number(stats.min, 0)),
    })
}

/// Cards, step progress and goal list for a day
pub fn daily_view(progress: &DailyProgress) -> DailyView {
    let mut cards = Vec::with_capacity(progress.metrics.len());
    let mut goals = Vec::with_capacity(progress.metrics.len());
    let mut step_progress = None;

    for item in &progress.metrics {
        let line_unit = match item.metric {
            MetricKind::Distance | MetricKind::ActiveMinutes => unit_suffix(item.metric),
            _ => "",
        };

        cards.push(ActivityCardView {
            metric: item.metric,
            title: card_title(item.metric).to_string(),
            value: format_plain(item.current),
            unit: card_unit(item.metric).to_string(),
            ratio: item.progress.ratio,
        });

        goals.push(GoalLineView {
            metric: item.metric,
            name: item.metric.display_name().to_string(),
            values_label: format!(
                "{}{line_unit} / {}{line_unit}",
                format_plain(item.current),
                format_plain(item.goal)
            ),
            ratio: item.progress.ratio,
            completed: item.progress.is_complete(),
        });

        if item.metric == MetricKind::Steps {
            step_progress = Some(StepProgressView {
                percentage: item.progress.percentage(),
                ratio: item.progress.ratio,
                steps: format_plain(item.current),
                goal: format_plain(item.goal),
                remaining: format_plain(item.progress.remaining),
            });
        }
    }

    DailyView {
        date: progress.date,
        step_progress: step_progress.unwrap_or(StepProgressView {
            percentage: 0,
            ratio: 0.0,
            steps: "0".to_string(),
            goal: "0".to_string(),
            remaining: "0".to_string(),
        }),
        cards,
        score_label: format!("{}/{}", progress.goals_achieved, GOAL_COUNT),
        completion: progress.completion,
        goals,
    }
}

fn card_title(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::ActiveMinutes => "Active Time",
        other => other.display_name(),
    }
}

fn with_leading_space(unit: &str) -> String {
    if unit.is_empty() {
        String::new()
    } else {
        format!(" {unit}")
    }
}

/// Insert commas into the integer part of a formatted decimal number
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0" is not a meaningful display value
    let sign = if grouped.chars().all(|c| c == '0' || c == ',')
        && frac_part.map_or(true, |f| f.chars().all(|c| c == '0'))
    {
        ""
    } else {
        sign
    };

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{compute_weekly_statistics, daily_progress};
    use crate::repository::fallback::{fallback_daily_sample, fallback_weekly_series};
    use pretty_assertions::assert_eq;

    fn anchor() -> NaiveDate {
        // A Sunday, so the fallback week runs Monday to Sunday
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_unit_suffixes() {
        assert_eq!(unit_suffix(MetricKind::Distance), "km");
        assert_eq!(unit_suffix(MetricKind::Steps), "");
        assert_eq!(unit_suffix(MetricKind::Calories), "kcal");
        assert_eq!(unit_suffix(MetricKind::ActiveMinutes), "min");
        assert_eq!(y_axis_suffix(MetricKind::Calories), " kcal");
        assert_eq!(y_axis_suffix(MetricKind::Steps), "");
    }

    #[test]
    fn test_format_value_defaults() {
        assert_eq!(format_value(7017.571428, MetricKind::Steps, None), "7,018");
        assert_eq!(format_value(4.928571, MetricKind::Distance, None), "4.9");
        assert_eq!(format_value(384.5, MetricKind::Calories, None), "385");
        assert_eq!(format_value(1234567.0, MetricKind::Steps, None), "1,234,567");
        assert_eq!(format_value(5.25, MetricKind::Steps, Some(2)), "5.25");
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(format_plain(7432.0), "7,432");
        assert_eq!(format_plain(5.2), "5.2");
        assert_eq!(format_plain(7.0), "7");
        assert_eq!(format_plain(0.0), "0");
        assert_eq!(format_plain(1234.5678), "1,234.568");
    }

    #[test]
    fn test_axis_labels() {
        assert_eq!(format_axis_label(7432.0, MetricKind::Steps), "7.4k");
        assert_eq!(format_axis_label(1000.0, MetricKind::Steps), "1000");
        assert_eq!(format_axis_label(6.5, MetricKind::Distance), "6.5");
        assert_eq!(format_axis_label(1500.0, MetricKind::Calories), "1500");
    }

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("Mon, Oct 12"), "Mon");
        assert_eq!(short_label("Tue"), "Tue");
    }

    #[test]
    fn test_chart_series_uses_raw_values() {
        let series = fallback_weekly_series(anchor());
        let chart = to_chart_series(&series, MetricKind::Distance);

        assert_eq!(
            chart.labels,
            vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        );
        assert_eq!(chart.values, vec![3.6, 5.4, 6.5, 3.2, 6.1, 4.5, 5.2]);
    }

    #[test]
    fn test_chart_view_metadata() {
        let series = fallback_weekly_series(anchor());
        let view = chart_view(&series, MetricKind::ActiveMinutes);
        assert_eq!(view.title, "Weekly Active Minutes");
        assert_eq!(view.y_axis_suffix, " min");
        assert_eq!(view.decimal_places, 0);
    }

    #[test]
    fn test_chart_view_axis_labels_abbreviate_steps() {
        let series = fallback_weekly_series(anchor());
        let view = chart_view(&series, MetricKind::Steps);
        assert_eq!(
            view.y_labels,
            vec!["5.2k", "7.6k", "9.1k", "4.5k", "8.8k", "6.4k", "7.4k"]
        );
        assert_eq!(view.series.values[0], 5235.0);

        let distance = chart_view(&series, MetricKind::Distance);
        assert_eq!(distance.y_labels[2], "6.5");
    }

    #[test]
    fn test_weekly_summary_view_steps() {
        let series = fallback_weekly_series(anchor());
        let stats = compute_weekly_statistics(&series, MetricKind::Steps).unwrap();
        let view = weekly_summary_view(&series, &stats, MetricKind::Steps).unwrap();

        assert_eq!(
            view,
            WeeklySummaryView {
                metric: MetricKind::Steps,
                total: "49,123".to_string(),
                average: "7,018".to_string(),
                best_day: "9,123".to_string(),
                best_day_label: "Wed".to_string(),
                min: "4,531".to_string(),
            }
        );
    }

    #[test]
    fn test_weekly_summary_view_distance() {
        let series = fallback_weekly_series(anchor());
        let stats = compute_weekly_statistics(&series, MetricKind::Distance).unwrap();
        let view = weekly_summary_view(&series, &stats, MetricKind::Distance).unwrap();

        assert!(view.total.ends_with(" km"));
        assert_eq!(view.average, "4.9 km");
        assert_eq!(view.best_day, "7 km");
        assert_eq!(view.min, "3 km");
    }

    #[test]
    fn test_daily_view_from_fallback() {
        let sample = fallback_daily_sample(anchor());
        let progress = daily_progress(&sample).unwrap();
        let view = daily_view(&progress);

        assert_eq!(view.score_label, "0/4");
        assert_eq!(view.completion, 0.0);
        assert_eq!(view.step_progress.percentage, 74);
        assert_eq!(view.step_progress.steps, "7,432");
        assert_eq!(view.step_progress.goal, "10,000");
        assert_eq!(view.step_progress.remaining, "2,568");

        let labels: Vec<&str> = view.goals.iter().map(|g| g.values_label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["7,432 / 10,000", "385 / 500", "5.2km / 7km", "58min / 60min"]
        );
        assert!(view.goals.iter().all(|g| !g.completed));

        let titles: Vec<&str> = view.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Steps", "Calories", "Distance", "Active Time"]);
        assert_eq!(view.cards[0].unit, "steps");
    }
}
