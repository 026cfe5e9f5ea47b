use anyhow::{Context, Result};
use dotenvy::dotenv;
use itunes_client::{RetryPolicy, SearchParams, DEFAULT_RETRYABLE_STATUSES, DEFAULT_SEARCH_URL};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::icons::{Palette, DEFAULT_TARGET_SIZE, MAX_TARGET_SIZE};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub work_dir: PathBuf,
    pub palette: Palette,
    pub target_size: u32,
    pub lookup_url: String,
    pub search_params: SearchParams,
    pub retry_policy: RetryPolicy,
    pub request_timeout: Duration,
    pub item_concurrency: usize,
    /// Command that prints installed app names as JSON.
    pub app_list_command: String,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            work_dir: env::temp_dir().join("icon-server"),
            palette: Palette::default(),
            target_size: DEFAULT_TARGET_SIZE,
            lookup_url: DEFAULT_SEARCH_URL.to_string(),
            search_params: SearchParams::default(),
            retry_policy: RetryPolicy::default(),
            request_timeout: Duration::from_secs(15),
            item_concurrency: 4,
            app_list_command: "system_profiler SPApplicationsDataType -json".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys take defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let palette = Palette {
            icon: parse_or(&get, "ICON_COLOR", defaults.palette.icon)?,
            edge: parse_or(&get, "EDGE_COLOR", defaults.palette.edge)?,
        };

        let target_size: u32 = parse_or(&get, "TARGET_SIZE", defaults.target_size)?;
        if target_size == 0 || target_size > MAX_TARGET_SIZE {
            anyhow::bail!(
                "TARGET_SIZE must be between 1 and {}, got {}",
                MAX_TARGET_SIZE,
                target_size
            );
        }

        let search_params = SearchParams {
            entity: get("LOOKUP_ENTITY").unwrap_or(defaults.search_params.entity),
            media: get("LOOKUP_MEDIA").unwrap_or(defaults.search_params.media),
            country: get("LOOKUP_COUNTRY").unwrap_or(defaults.search_params.country),
            limit: parse_or(&get, "LOOKUP_LIMIT", defaults.search_params.limit)?,
        };

        let retry_policy = RetryPolicy::builder()
            .max_attempts(parse_or(&get, "RETRY_MAX_ATTEMPTS", 3u32)?)
            .base_delay(Duration::from_millis(parse_or(&get, "RETRY_BASE_DELAY_MS", 500u64)?))
            .multiplier(parse_or(&get, "RETRY_MULTIPLIER", 2.0f64)?)
            .jitter(Duration::from_millis(parse_or(&get, "RETRY_JITTER_MS", 250u64)?))
            .retryable_statuses(match get("RETRY_STATUSES") {
                Some(raw) => parse_statuses(&raw)?,
                None => DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
            })
            .build();

        Ok(Self {
            port: parse_or(&get, "PORT", defaults.port)?,
            work_dir: get("WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_dir),
            palette,
            target_size,
            lookup_url: get("LOOKUP_URL").unwrap_or(defaults.lookup_url),
            search_params,
            retry_policy,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 15u64)?),
            item_concurrency: parse_or(&get, "ITEM_CONCURRENCY", defaults.item_concurrency)?
                .max(1),
            app_list_command: get("APP_LIST_COMMAND").unwrap_or(defaults.app_list_command),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn parse_statuses(raw: &str) -> Result<HashSet<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .with_context(|| format!("RETRY_STATUSES contains an invalid status: {}", s))
        })
        .collect()
}
