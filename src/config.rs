//! Repository configuration read from the environment

use std::str::FromStr;
use std::time::Duration;

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// What the state holder does when a fetch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Show the built-in sample data, marked as fallback
    #[default]
    Substitute,
    /// Surface the failure
    Propagate,
}

impl FromStr for FallbackPolicy {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substitute" | "fallback" => Ok(FallbackPolicy::Substitute),
            "propagate" | "none" => Ok(FallbackPolicy::Propagate),
            other => Err(FetchError::Config(format!(
                "unknown fallback policy '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub fallback: FallbackPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            fallback: FallbackPolicy::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn from_env() -> Result<Self, FetchError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Read configuration through a lookup function, so tests can supply
    /// values without touching the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, FetchError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url = get("ACTIVITY_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FetchError::Config(format!(
                "ACTIVITY_API_BASE_URL must be an http(s) URL, got '{base_url}'"
            )));
        }

        let timeout_secs = match get("ACTIVITY_API_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                FetchError::Config(format!("ACTIVITY_API_TIMEOUT_SECS is not a number: '{v}'"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_retries = match get("ACTIVITY_API_MAX_RETRIES") {
            Some(v) => v.trim().parse::<u32>().map_err(|_| {
                FetchError::Config(format!("ACTIVITY_API_MAX_RETRIES is not a number: '{v}'"))
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        let fallback = match get("ACTIVITY_FALLBACK") {
            Some(v) => v.parse()?,
            None => FallbackPolicy::default(),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults() {
        let cfg = RepositoryConfig::from_env_with(|_| None).expect("cfg");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.fallback, FallbackPolicy::Substitute);
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "ACTIVITY_API_BASE_URL" => Some("https://api.example.com/v1/".into()),
            "ACTIVITY_API_TIMEOUT_SECS" => Some("3".into()),
            "ACTIVITY_API_MAX_RETRIES" => Some("0".into()),
            "ACTIVITY_FALLBACK" => Some("propagate".into()),
            _ => None,
        };
        let cfg = RepositoryConfig::from_env_with(get).expect("cfg");
        assert_eq!(cfg.base_url, "https://api.example.com/v1");
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.fallback, FallbackPolicy::Propagate);
    }

    #[test]
    fn from_env_rejects_bad_values() {
        let bad_url = |k: &str| match k {
            "ACTIVITY_API_BASE_URL" => Some("ftp://example.com".into()),
            _ => None,
        };
        assert!(RepositoryConfig::from_env_with(bad_url).is_err());

        let bad_timeout = |k: &str| match k {
            "ACTIVITY_API_TIMEOUT_SECS" => Some("soon".into()),
            _ => None,
        };
        assert!(RepositoryConfig::from_env_with(bad_timeout).is_err());

        let bad_policy = |k: &str| match k {
            "ACTIVITY_FALLBACK" => Some("maybe".into()),
            _ => None,
        };
        assert!(matches!(
            RepositoryConfig::from_env_with(bad_policy),
            Err(FetchError::Config(_))
        ));
    }
}
