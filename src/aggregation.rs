//! Activity aggregation
//!
//! Pure functions deriving metrics from raw samples:
//! - Goal progress ratios and remaining amounts
//! - Goal-completion counts for a day
//! - Weekly statistics (total, average, min, max, best day)

use crate::error::ComputeError;
use crate::types::{
    DailyActivitySample, DailyProgress, GoalProgress, MetricKind, MetricProgress, WeeklySeries,
    WeeklyStatistics, GOAL_COUNT,
};

/// Progress of `current` towards `goal`.
///
/// Rejects a goal that is not strictly positive and finite, and a current value
/// that is negative or not finite, instead of producing NaN or infinity.
pub fn compute_progress(current: f64, goal: f64) -> Result<GoalProgress, ComputeError> {
    if !goal.is_finite() || goal <= 0.0 {
        return Err(ComputeError::InvalidGoal(goal));
    }
    if !current.is_finite() || current < 0.0 {
        return Err(ComputeError::InvalidValue(format!(
            "current value must be a non-negative number, got {current}"
        )));
    }

    let ratio = if current >= goal {
        1.0
    } else {
        (current / goal).min(1.0)
    };

    Ok(GoalProgress {
        ratio,
        remaining: (goal - current).max(0.0),
    })
}

/// Number of metrics in the sample whose value reached its goal (0-4).
///
/// Expects a sample that passed [`DailyActivitySample::validate`]. A metric
/// whose goal is not positive is never counted as achieved.
pub fn count_goals_achieved(sample: &DailyActivitySample) -> usize {
    MetricKind::ALL
        .iter()
        .filter(|metric| {
            let goal = sample.goal(**metric);
            goal > 0.0 && sample.current(**metric) >= goal
        })
        .count()
}

/// Completion score: achieved goals over the fixed metric count
pub fn goal_completion(sample: &DailyActivitySample) -> f64 {
    count_goals_achieved(sample) as f64 / GOAL_COUNT as f64
}

/// Per-metric progress for a whole day
pub fn daily_progress(sample: &DailyActivitySample) -> Result<DailyProgress, ComputeError> {
    let metrics = MetricKind::ALL
        .iter()
        .map(|&metric| {
            let current = sample.current(metric);
            let goal = sample.goal(metric);
            Ok(MetricProgress {
                metric,
                current,
                goal,
                progress: compute_progress(current, goal)?,
            })
        })
        .collect::<Result<Vec<_>, ComputeError>>()?;

    let goals_achieved = count_goals_achieved(sample);

    Ok(DailyProgress {
        date: sample.date,
        metrics,
        goals_achieved,
        completion: goals_achieved as f64 / GOAL_COUNT as f64,
    })
}

/// Weekly statistics for one metric of a series
pub fn compute_weekly_statistics(
    series: &WeeklySeries,
    metric: MetricKind,
) -> Result<WeeklyStatistics, ComputeError> {
    let values = series.values(metric);
    if values.is_empty() {
        return Err(ComputeError::EmptyInput(format!(
            "weekly {metric} series has no days"
        )));
    }
    summarize(values)
}

/// Total, mean, extremes and the earliest index of the maximum of a sequence
pub fn summarize(values: &[f64]) -> Result<WeeklyStatistics, ComputeError> {
    let (&first, rest) = values
        .split_first()
        .ok_or_else(|| ComputeError::EmptyInput("cannot summarize an empty sequence".into()))?;

    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ComputeError::InvalidValue(format!(
            "sequence contains a non-finite value: {bad}"
        )));
    }

    let mut total = first;
    let mut max = first;
    let mut min = first;
    let mut best_day_index = 0;

    for (offset, &value) in rest.iter().enumerate() {
        total += value;
        // Strict comparison keeps the earliest day on ties
        if value > max {
            max = value;
            best_day_index = offset + 1;
        }
        if value < min {
            min = value;
        }
    }

    Ok(WeeklyStatistics {
        total,
        average: total / values.len() as f64,
        max,
        min,
        best_day_index,
    })
}
