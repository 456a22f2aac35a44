//! Display state for the activity screens
//!
//! Each data source moves Idle → Loading → Ready | Failed and can be refreshed
//! again at any time. Refreshes are numbered: a fetch that completes after a
//! newer refresh was issued is discarded, so the last *issued* refresh wins
//! rather than the last one to finish.
//!
//! A refresh is split in two so the fetch does not borrow the dashboard:
//! `begin_*_refresh` marks the source loading and returns a detached future,
//! and `apply_*` records what that future produced. Any number of fetches may
//! be in flight at once; `refresh_*` runs both halves back to back.

use std::future::Future;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::config::FallbackPolicy;
use crate::error::{ActivityError, ComputeError, FetchError};
use crate::pipeline::{build_daily_view, build_weekly_view};
use crate::presentation::{DailyView, WeeklyView};
use crate::profile::{ProfileDraft, UserProfile};
use crate::repository::fallback::{
    fallback_daily_sample, fallback_profile, fallback_weekly_series, with_fallback,
};
use crate::repository::{ActivityRepository, GoalUpdate};
use crate::types::{DailyActivitySample, MetricKind, Sourced, WeeklySeries};

/// Loading state of one data source
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(FetchError),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Handle for one issued refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// Result of a detached fetch, tagged with the refresh that issued it
#[derive(Debug)]
pub struct Fetched<T> {
    pub ticket: RefreshTicket,
    pub result: Result<T, FetchError>,
}

/// A data source with monotonic request sequencing
#[derive(Debug, Clone)]
pub struct DataSource<T> {
    state: LoadState<Sourced<T>>,
    issued: u64,
}

impl<T> Default for DataSource<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            issued: 0,
        }
    }
}

impl<T> DataSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState<Sourced<T>> {
        &self.state
    }

    pub fn data(&self) -> Option<&Sourced<T>> {
        self.state.data()
    }

    /// Start a refresh; any ticket issued earlier becomes stale
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        self.state = LoadState::Loading;
        RefreshTicket(self.issued)
    }

    /// Whether `ticket` belongs to the most recent refresh
    pub fn is_current(&self, ticket: RefreshTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Record the outcome of a refresh. Returns false, leaving state untouched,
    /// when a newer refresh was issued after `ticket`.
    pub fn complete(
        &mut self,
        ticket: RefreshTicket,
        outcome: Result<Sourced<T>, FetchError>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding superseded fetch"
            );
            return false;
        }
        self.state = match outcome {
            Ok(data) => LoadState::Ready(data),
            Err(e) => LoadState::Failed(e),
        };
        true
    }
}

/// State holder for the daily, weekly and profile screens.
///
/// Owns the repository and the display state; the view layer reads views from
/// it and calls the refresh and update commands explicitly.
pub struct ActivityDashboard<R> {
    repository: Arc<R>,
    policy: FallbackPolicy,
    selected_metric: MetricKind,
    today: Option<NaiveDate>,
    daily: DataSource<DailyActivitySample>,
    weekly: DataSource<WeeklySeries>,
    profile: DataSource<UserProfile>,
}

impl<R: ActivityRepository + 'static> ActivityDashboard<R> {
    pub fn new(repository: R, policy: FallbackPolicy) -> Self {
        Self {
            repository: Arc::new(repository),
            policy,
            selected_metric: MetricKind::Steps,
            today: None,
            daily: DataSource::new(),
            weekly: DataSource::new(),
            profile: DataSource::new(),
        }
    }

    /// Fix the day fallback data is generated for
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn selected_metric(&self) -> MetricKind {
        self.selected_metric
    }

    pub fn select_metric(&mut self, metric: MetricKind) {
        self.selected_metric = metric;
    }

    pub fn daily(&self) -> &LoadState<Sourced<DailyActivitySample>> {
        self.daily.state()
    }

    pub fn weekly(&self) -> &LoadState<Sourced<WeeklySeries>> {
        self.weekly.state()
    }

    pub fn profile(&self) -> &LoadState<Sourced<UserProfile>> {
        self.profile.state()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Mark daily data loading and return the fetch, detached from `self`
    pub fn begin_daily_refresh(
        &mut self,
    ) -> impl Future<Output = Fetched<DailyActivitySample>> + Send + 'static {
        let ticket = self.daily.begin_refresh();
        let repository = Arc::clone(&self.repository);
        async move {
            let result = repository.get_daily_activity().await;
            Fetched { ticket, result }
        }
    }

    /// Mark weekly data loading and return the fetch, detached from `self`
    pub fn begin_weekly_refresh(
        &mut self,
    ) -> impl Future<Output = Fetched<WeeklySeries>> + Send + 'static {
        let ticket = self.weekly.begin_refresh();
        let repository = Arc::clone(&self.repository);
        async move {
            let result = repository.get_weekly_activity().await;
            Fetched { ticket, result }
        }
    }

    pub fn begin_profile_refresh(
        &mut self,
    ) -> impl Future<Output = Fetched<UserProfile>> + Send + 'static {
        let ticket = self.profile.begin_refresh();
        let repository = Arc::clone(&self.repository);
        async move {
            let result = repository.get_profile().await;
            Fetched { ticket, result }
        }
    }

    /// Record a daily fetch. Returns false when a newer refresh superseded it.
    pub fn apply_daily(&mut self, fetched: Fetched<DailyActivitySample>) -> bool {
        let today = self.today();
        let outcome = with_fallback(fetched.result, self.policy, || fallback_daily_sample(today));
        self.daily.complete(fetched.ticket, outcome)
    }

    /// Record a weekly fetch. Returns false when a newer refresh superseded it.
    pub fn apply_weekly(&mut self, fetched: Fetched<WeeklySeries>) -> bool {
        let today = self.today();
        let outcome = with_fallback(fetched.result, self.policy, || fallback_weekly_series(today));
        self.weekly.complete(fetched.ticket, outcome)
    }

    pub fn apply_profile(&mut self, fetched: Fetched<UserProfile>) -> bool {
        let outcome = with_fallback(fetched.result, self.policy, fallback_profile);
        self.profile.complete(fetched.ticket, outcome)
    }

    /// Refetch the daily sample. Returns whether the result was applied.
    pub async fn refresh_daily(&mut self) -> bool {
        let fetched = self.begin_daily_refresh().await;
        self.apply_daily(fetched)
    }

    /// Refetch the weekly series. Returns whether the result was applied.
    pub async fn refresh_weekly(&mut self) -> bool {
        let fetched = self.begin_weekly_refresh().await;
        self.apply_weekly(fetched)
    }

    pub async fn refresh_profile(&mut self) -> bool {
        let fetched = self.begin_profile_refresh().await;
        self.apply_profile(fetched)
    }

    /// Refetch daily and weekly data concurrently
    pub async fn refresh_all(&mut self) {
        tracing::info!("refreshing daily and weekly activity");
        let (daily, weekly) = tokio::join!(self.begin_daily_refresh(), self.begin_weekly_refresh());
        self.apply_daily(daily);
        self.apply_weekly(weekly);
    }

    /// Send a new goal. Failures are returned, never swallowed.
    ///
    /// The daily sample is not patched locally; refresh to see the new goal.
    pub async fn update_goal(&self, metric: MetricKind, value: f64) -> Result<(), ActivityError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ComputeError::InvalidGoal(value).into());
        }
        self.repository
            .update_goal(GoalUpdate { metric, value })
            .await
            .map_err(|e| {
                tracing::warn!(%metric, value, error = %e, "goal update failed");
                ActivityError::from(e)
            })
    }

    /// Merge a draft onto the loaded profile and store it
    pub async fn save_profile(&mut self, draft: &ProfileDraft) -> Result<UserProfile, ActivityError> {
        let current = self.profile.data().ok_or_else(|| {
            ComputeError::InvalidValue("profile must be loaded before editing".into())
        })?;
        let updated = draft.apply(&current.data)?;

        let stored = self.repository.update_profile(&updated).await.map_err(|e| {
            tracing::warn!(error = %e, "profile update failed");
            ActivityError::from(e)
        })?;

        let ticket = self.profile.begin_refresh();
        self.profile.complete(ticket, Ok(Sourced::live(stored.clone())));
        Ok(stored)
    }

    /// Daily screen view, if daily data is loaded
    pub fn daily_view(&self) -> Result<Option<Sourced<DailyView>>, ComputeError> {
        self.daily
            .data()
            .map(|sourced| {
                build_daily_view(&sourced.data).map(|data| Sourced {
                    data,
                    origin: sourced.origin.clone(),
                })
            })
            .transpose()
    }

    /// Weekly screen view for the selected metric, if weekly data is loaded
    pub fn weekly_view(&self) -> Result<Option<Sourced<WeeklyView>>, ComputeError> {
        self.weekly
            .data()
            .map(|sourced| {
                build_weekly_view(&sourced.data, self.selected_metric).map(|data| Sourced {
                    data,
                    origin: sourced.origin.clone(),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SampleRepository;
    use crate::types::DataOrigin;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    /// Repository that fails every call with a fixed error and records goal updates
    struct FailingRepository {
        error: FetchError,
        updates: Mutex<Vec<GoalUpdate>>,
    }

    impl FailingRepository {
        fn new(error: FetchError) -> Self {
            Self {
                error,
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ActivityRepository for FailingRepository {
        async fn get_daily_activity(&self) -> Result<DailyActivitySample, FetchError> {
            Err(self.error.clone())
        }

        async fn get_weekly_activity(&self) -> Result<WeeklySeries, FetchError> {
            Err(self.error.clone())
        }

        async fn update_goal(&self, update: GoalUpdate) -> Result<(), FetchError> {
            self.updates.lock().unwrap().push(update);
            Err(self.error.clone())
        }

        async fn get_profile(&self) -> Result<UserProfile, FetchError> {
            Err(self.error.clone())
        }

        async fn update_profile(&self, _profile: &UserProfile) -> Result<UserProfile, FetchError> {
            Err(self.error.clone())
        }
    }

    /// Repository whose n-th daily fetch reports n * 1000 steps
    struct CountingRepository {
        calls: AtomicU32,
        today: NaiveDate,
    }

    #[async_trait]
    impl ActivityRepository for CountingRepository {
        async fn get_daily_activity(&self) -> Result<DailyActivitySample, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(DailyActivitySample {
                steps: n * 1000,
                ..fallback_daily_sample(self.today)
            })
        }

        async fn get_weekly_activity(&self) -> Result<WeeklySeries, FetchError> {
            Ok(fallback_weekly_series(self.today))
        }

        async fn update_goal(&self, _update: GoalUpdate) -> Result<(), FetchError> {
            Ok(())
        }

        async fn get_profile(&self) -> Result<UserProfile, FetchError> {
            Ok(fallback_profile())
        }

        async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, FetchError> {
            Ok(profile.clone())
        }
    }

    #[test]
    fn test_superseded_completion_is_discarded() {
        let mut source: DataSource<u32> = DataSource::new();
        assert_eq!(source.state(), &LoadState::Idle);

        let first = source.begin_refresh();
        let second = source.begin_refresh();
        assert!(source.state().is_loading());

        // The newer refresh finishes first
        assert!(source.complete(second, Ok(Sourced::live(2))));
        // The older one arrives late and must not overwrite it
        assert!(!source.complete(first, Ok(Sourced::live(1))));

        assert_eq!(source.data().map(|s| s.data), Some(2));
    }

    #[test]
    fn test_stale_failure_does_not_clobber_ready_data() {
        let mut source: DataSource<u32> = DataSource::new();
        let old = source.begin_refresh();
        let new = source.begin_refresh();
        source.complete(new, Ok(Sourced::live(5)));
        source.complete(old, Err(FetchError::Network("timeout".into())));
        assert_eq!(source.state().error(), None);
        assert_eq!(source.data().map(|s| s.data), Some(5));
    }

    #[test]
    fn test_failure_then_refresh_recovers() {
        let mut source: DataSource<u32> = DataSource::new();
        let t = source.begin_refresh();
        source.complete(t, Err(FetchError::Network("down".into())));
        assert!(source.state().error().is_some());

        let t = source.begin_refresh();
        source.complete(t, Ok(Sourced::live(9)));
        assert_eq!(source.data().map(|s| s.data), Some(9));
    }

    #[tokio::test]
    async fn test_refresh_all_with_live_repository() {
        let mut dashboard =
            ActivityDashboard::new(SampleRepository::new(today()), FallbackPolicy::Propagate);
        dashboard.refresh_all().await;

        let daily = dashboard.daily().data().unwrap();
        assert_eq!(daily.origin, DataOrigin::Live);
        assert_eq!(daily.data.steps, 7432);

        dashboard.select_metric(MetricKind::Calories);
        let weekly = dashboard.weekly_view().unwrap().unwrap();
        assert!(!weekly.is_stale());
        assert_eq!(weekly.data.statistics.max, 485.0);
        assert_eq!(weekly.data.summary.best_day_label, "Wed");
        assert_eq!(weekly.data.chart.title, "Weekly Calories");
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_keep_latest_issued() {
        let repo = CountingRepository {
            calls: AtomicU32::new(0),
            today: today(),
        };
        let mut dashboard = ActivityDashboard::new(repo, FallbackPolicy::Propagate);

        let first = dashboard.begin_daily_refresh();
        let second = dashboard.begin_daily_refresh();
        assert!(dashboard.daily().is_loading());

        // The first issued fetch runs first but is applied last
        let first = first.await;
        let second = second.await;
        assert_eq!(first.result.as_ref().map(|s| s.steps), Ok(1000));

        assert!(dashboard.apply_daily(second));
        assert!(!dashboard.apply_daily(first));
        assert_eq!(dashboard.daily().data().unwrap().data.steps, 2000);

        // A refresh in flight does not block reading or issuing another
        let pending = dashboard.begin_daily_refresh();
        assert!(dashboard.daily_view().unwrap().is_none());
        assert!(dashboard.refresh_daily().await);
        assert_eq!(dashboard.daily().data().unwrap().data.steps, 3000);
        assert!(!dashboard.apply_daily(pending.await));
        assert_eq!(dashboard.daily().data().unwrap().data.steps, 3000);
    }

    #[tokio::test]
    async fn test_failed_fetch_substitutes_marked_fallback() {
        let repo = FailingRepository::new(FetchError::Server {
            status: 502,
            message: "bad gateway".into(),
        });
        let mut dashboard =
            ActivityDashboard::new(repo, FallbackPolicy::Substitute).with_today(today());

        assert!(dashboard.refresh_daily().await);
        let view = dashboard.daily_view().unwrap().unwrap();
        assert!(view.is_stale());
        assert_eq!(view.data.score_label, "0/4");
        assert_eq!(view.data.date, today());
        match &view.origin {
            DataOrigin::Fallback { reason } => assert!(reason.contains("502")),
            DataOrigin::Live => panic!("expected fallback origin"),
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_propagates_when_configured() {
        let repo = FailingRepository::new(FetchError::Network("connection refused".into()));
        let mut dashboard = ActivityDashboard::new(repo, FallbackPolicy::Propagate);

        assert!(dashboard.refresh_weekly().await);
        assert_eq!(
            dashboard.weekly().error(),
            Some(&FetchError::Network("connection refused".into()))
        );
        assert!(dashboard.weekly_view().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_goal_surfaces_failure() {
        let repo = FailingRepository::new(FetchError::Server {
            status: 500,
            message: "oops".into(),
        });
        let dashboard = ActivityDashboard::new(repo, FallbackPolicy::Substitute);

        let result = dashboard.update_goal(MetricKind::Distance, 8.0).await;
        assert!(matches!(result, Err(ActivityError::Fetch(_))));
        assert_eq!(dashboard.repository().updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_goal_rejects_non_positive_value() {
        let repo = FailingRepository::new(FetchError::Network("unused".into()));
        let dashboard = ActivityDashboard::new(repo, FallbackPolicy::Substitute);

        let result = dashboard.update_goal(MetricKind::Steps, 0.0).await;
        assert!(matches!(
            result,
            Err(ActivityError::Compute(ComputeError::InvalidGoal(_)))
        ));
        assert!(dashboard.repository().updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_goal_update_visible_after_refresh() {
        let mut dashboard =
            ActivityDashboard::new(SampleRepository::new(today()), FallbackPolicy::Propagate);
        dashboard.refresh_daily().await;
        dashboard.update_goal(MetricKind::Steps, 7000.0).await.unwrap();

        // Not merged locally
        assert_eq!(dashboard.daily().data().unwrap().data.step_goal, 10000);

        dashboard.refresh_daily().await;
        let view = dashboard.daily_view().unwrap().unwrap();
        assert_eq!(view.data.score_label, "1/4");
    }

    #[tokio::test]
    async fn test_save_profile_requires_loaded_profile() {
        let mut dashboard =
            ActivityDashboard::new(SampleRepository::new(today()), FallbackPolicy::Propagate);
        let draft = ProfileDraft {
            name: Some("Jordan".into()),
            ..Default::default()
        };
        assert!(dashboard.save_profile(&draft).await.is_err());

        dashboard.refresh_profile().await;
        let stored = dashboard.save_profile(&draft).await.unwrap();
        assert_eq!(stored.name, "Jordan");
        assert_eq!(dashboard.profile().data().unwrap().data.name, "Jordan");
        assert_eq!(dashboard.repository().get_profile().await.unwrap().name, "Jordan");
    }
}
