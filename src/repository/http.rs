//! REST implementation of [`ActivityRepository`] using reqwest.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use super::wire::{DailyActivityDto, Envelope, WeeklyActivityDto};
use super::{ActivityRepository, GoalUpdate};
use crate::config::RepositoryConfig;
use crate::error::FetchError;
use crate::profile::UserProfile;
use crate::retry::RetryPolicy;
use crate::types::{DailyActivitySample, WeeklySeries};

/// Longest slice of an error body kept in a [`FetchError::Server`]
const ERROR_BODY_LIMIT: usize = 256;

/// Client for the activity REST API.
#[derive(Clone, Debug)]
pub struct ReqwestActivityRepository {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    /// Reference day for year-less dates; `None` means the local date at fetch time
    anchor: Option<NaiveDate>,
}

impl ReqwestActivityRepository {
    /// Create a client from configuration.
    pub fn new(config: &RepositoryConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
            anchor: None,
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fix the reference day used to resolve locale dates such as "Mon, Oct 12"
    pub fn with_anchor_date(mut self, anchor: NaiveDate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    fn anchor(&self) -> NaiveDate {
        self.anchor.unwrap_or_else(|| Local::now().date_naive())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GET with retries on transient failures
    async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, FetchError> {
        let url = self.url(endpoint);
        let url: &str = &url;
        tracing::debug!(%url, "fetching");
        self.retry
            .retry_async(
                move || self.send::<T>(Method::GET, url, None),
                is_transient,
            )
            .await
    }

    /// Send one request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, FetchError> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.error_from_response(status, resp).await);
        }

        let envelope: Envelope<T> = resp.json().await?;
        if let Some(code) = envelope.status {
            if !(200..300).contains(&code) {
                return Err(FetchError::Server {
                    status: code,
                    message: envelope.message.unwrap_or_default(),
                });
            }
        }
        Ok(envelope.data)
    }

    /// Send one request whose response body is ignored
    async fn send_without_data(
        &self,
        method: Method,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<(), FetchError> {
        let resp = self.client.request(method, url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.error_from_response(status, resp).await);
        }
        Ok(())
    }

    async fn error_from_response(&self, status: StatusCode, resp: reqwest::Response) -> FetchError {
        let body = resp.text().await.unwrap_or_default();
        let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        tracing::warn!(status = status.as_u16(), body = %message, "API response error");
        FetchError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

/// Transport failures, 5xx and 429 are worth another attempt
fn is_transient(e: &FetchError) -> bool {
    match e {
        FetchError::Network(_) => true,
        FetchError::Server { status, .. } => *status >= 500 || *status == 429,
        FetchError::Decode(_) | FetchError::Config(_) => false,
    }
}

#[async_trait]
impl ActivityRepository for ReqwestActivityRepository {
    async fn get_daily_activity(&self) -> Result<DailyActivitySample, FetchError> {
        let dto: DailyActivityDto = self.get_data("/daily-activity").await?;
        Ok(dto.into_sample(self.anchor())?)
    }

    async fn get_weekly_activity(&self) -> Result<WeeklySeries, FetchError> {
        let dto: WeeklyActivityDto = self.get_data("/weekly-activity").await?;
        Ok(dto.into_series(self.anchor())?)
    }

    async fn update_goal(&self, update: GoalUpdate) -> Result<(), FetchError> {
        let body = serde_json::to_value(update).map_err(|e| FetchError::Decode(e.to_string()))?;
        tracing::info!(metric = %update.metric, value = update.value, "updating goal");
        self.send_without_data(Method::POST, &self.url("/update-goal"), &body)
            .await
    }

    async fn get_profile(&self) -> Result<UserProfile, FetchError> {
        self.get_data("/user-profile").await
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, FetchError> {
        let body = serde_json::to_value(profile).map_err(|e| FetchError::Decode(e.to_string()))?;
        tracing::info!(profile_id = %profile.id, "updating profile");
        self.send(Method::PUT, &self.url("/user-profile"), Some(&body))
            .await
    }
}
