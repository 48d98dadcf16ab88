use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::db::{
    DatabaseConfig, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_CACHE_SIZE_KIB, DEFAULT_MAX_POOL_SIZE,
};
use crate::workflow::TransitionPolicy;

pub const DEFAULT_REVIEW_DUE_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_STATS_RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub database_busy_timeout_ms: u64,
    pub database_cache_size_kib: u32,
    pub transition_policy: TransitionPolicy,
    pub review_due_window_days: i64,
    pub stats_recent_window_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size =
            parse_or(&lookup, "DATABASE_MAX_POOL_SIZE", DEFAULT_MAX_POOL_SIZE)
                .context("DATABASE_MAX_POOL_SIZE must be a positive integer")?;
        let database_busy_timeout_ms = parse_or(
            &lookup,
            "DATABASE_BUSY_TIMEOUT_MS",
            DEFAULT_BUSY_TIMEOUT_MS,
        )
        .context("DATABASE_BUSY_TIMEOUT_MS must be an integer")?;
        let database_cache_size_kib =
            parse_or(&lookup, "DATABASE_CACHE_SIZE_KIB", DEFAULT_CACHE_SIZE_KIB)
                .context("DATABASE_CACHE_SIZE_KIB must be an integer")?;
        let transition_policy = match lookup("WORKFLOW_TRANSITION_POLICY") {
            Some(value) => TransitionPolicy::from_str(&value)
                .map_err(anyhow::Error::msg)
                .context("WORKFLOW_TRANSITION_POLICY must be 'permissive' or 'strict'")?,
            None => TransitionPolicy::default(),
        };
        let review_due_window_days = parse_or(
            &lookup,
            "REVIEW_DUE_WINDOW_DAYS",
            DEFAULT_REVIEW_DUE_WINDOW_DAYS,
        )
        .context("REVIEW_DUE_WINDOW_DAYS must be an integer")?;
        let stats_recent_window_days = parse_or(
            &lookup,
            "STATS_RECENT_WINDOW_DAYS",
            DEFAULT_STATS_RECENT_WINDOW_DAYS,
        )
        .context("STATS_RECENT_WINDOW_DAYS must be an integer")?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            database_busy_timeout_ms,
            database_cache_size_kib,
            transition_policy,
            review_due_window_days,
            stats_recent_window_days,
        })
    }

    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            database_max_pool_size: DEFAULT_MAX_POOL_SIZE,
            database_busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            database_cache_size_kib: DEFAULT_CACHE_SIZE_KIB,
            transition_policy: TransitionPolicy::default(),
            review_due_window_days: DEFAULT_REVIEW_DUE_WINDOW_DAYS,
            stats_recent_window_days: DEFAULT_STATS_RECENT_WINDOW_DAYS,
        }
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_pool_size: self.database_max_pool_size,
            busy_timeout: Duration::from_millis(self.database_busy_timeout_ms),
            cache_size_kib: self.database_cache_size_kib,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => Ok(value.trim().parse()?),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn applies_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "registry.db")])).unwrap();
        assert_eq!(config.database_max_pool_size, DEFAULT_MAX_POOL_SIZE);
        assert_eq!(config.database_busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(config.review_due_window_days, 30);
    }

    #[test]
    fn parses_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", ":memory:"),
            ("DATABASE_MAX_POOL_SIZE", "4"),
            ("WORKFLOW_TRANSITION_POLICY", "strict"),
            ("STATS_RECENT_WINDOW_DAYS", "7"),
        ]))
        .unwrap();
        assert_eq!(config.database_max_pool_size, 4);
        assert_eq!(config.transition_policy, TransitionPolicy::Strict);
        assert_eq!(config.stats_recent_window_days, 7);
        assert_eq!(config.database().busy_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn rejects_malformed_pool_size() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "registry.db"),
            ("DATABASE_MAX_POOL_SIZE", "lots"),
        ]))
        .unwrap_err();
        assert!(format!("{err:#}").contains("DATABASE_MAX_POOL_SIZE"));
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", ":memory:"),
            ("WORKFLOW_TRANSITION_POLICY", "lenient"),
        ]))
        .unwrap_err();
        assert!(format!("{err:#}").contains("WORKFLOW_TRANSITION_POLICY"));
    }
}
