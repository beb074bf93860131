use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::RetryPolicy;
use crate::platform::Platform;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_file: PathBuf,
    pub scrape: ScrapeConfig,
}

/// Pacing and retry knobs for the fetch engine.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub retry: RetryPolicy,
    /// Post-fetch delay per platform; the primary defense against upstream
    /// rate limiting.
    pub leetcode_delay: Duration,
    pub codechef_delay: Duration,
    pub gfg_delay: Duration,
    /// Extra delay between bulk-upload jobs, regardless of platform.
    pub bulk_delay: Duration,
    /// Hard ceiling on jobs in one bulk upload.
    pub max_bulk_jobs: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            leetcode_delay: Duration::from_millis(1000),
            codechef_delay: Duration::from_millis(2000),
            gfg_delay: Duration::from_millis(1500),
            bulk_delay: Duration::from_millis(2000),
            max_bulk_jobs: 1000,
        }
    }
}

impl ScrapeConfig {
    pub fn platform_delay(&self, platform: Platform) -> Duration {
        match platform {
            Platform::Leetcode => self.leetcode_delay,
            Platform::Codechef => self.codechef_delay,
            Platform::Geeksforgeeks => self.gfg_delay,
        }
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{key} must be a number"))
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{key} must be a number"))
}

/// Per-platform delay: the platform key wins, then the shared
/// `SCRAPE_DELAY_MS`, then the built-in default.
fn env_delay(platform_key: &str, default_ms: u64) -> Result<Duration> {
    let ms = match env::var(platform_key) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("{platform_key} must be a number"))?,
        Err(_) => env_u64("SCRAPE_DELAY_MS", default_ms)?,
    };
    Ok(Duration::from_millis(ms))
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = ScrapeConfig::default();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            data_file: env::var("DATA_FILE")
                .unwrap_or_else(|_| "data/profiles.json".to_string())
                .into(),
            scrape: ScrapeConfig {
                retry: RetryPolicy {
                    max_retries: env_u64("SCRAPE_MAX_RETRIES", 3)? as u32,
                    backoff_base_ms: env_u64("SCRAPE_BACKOFF_BASE_MS", 4000)?,
                    backoff_factor: env_f64("SCRAPE_BACKOFF_FACTOR", 2.0)?,
                },
                leetcode_delay: env_delay(
                    "SCRAPE_LEETCODE_DELAY_MS",
                    defaults.leetcode_delay.as_millis() as u64,
                )?,
                codechef_delay: env_delay(
                    "SCRAPE_CODECHEF_DELAY_MS",
                    defaults.codechef_delay.as_millis() as u64,
                )?,
                gfg_delay: env_delay(
                    "SCRAPE_GFG_DELAY_MS",
                    defaults.gfg_delay.as_millis() as u64,
                )?,
                bulk_delay: Duration::from_millis(env_u64(
                    "BULK_DELAY_MS",
                    defaults.bulk_delay.as_millis() as u64,
                )?),
                max_bulk_jobs: env_u64("BULK_MAX_JOBS", defaults.max_bulk_jobs as u64)? as usize,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ScrapeConfig::default();
        assert_eq!(c.retry.max_retries, 3);
        assert_eq!(c.retry.backoff_base_ms, 4000);
        assert_eq!(c.retry.backoff_factor, 2.0);
        assert_eq!(c.bulk_delay, Duration::from_millis(2000));
        assert_eq!(c.max_bulk_jobs, 1000);
        assert_eq!(
            c.platform_delay(Platform::Leetcode),
            Duration::from_millis(1000)
        );
        assert_eq!(
            c.platform_delay(Platform::Geeksforgeeks),
            Duration::from_millis(1500)
        );
    }
}
