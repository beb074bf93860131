//! Per-platform scrapers and the single-profile fetcher that dispatches to
//! them.

pub mod codechef;
pub mod geeksforgeeks;
pub mod leetcode;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::fetch::transport::BaseTransport;
use crate::platform::Platform;
use crate::record::StatRecord;

/// Metric keys a record for this platform carries.
pub fn metric_keys(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Leetcode => leetcode::METRICS,
        Platform::Codechef => codechef::METRICS,
        Platform::Geeksforgeeks => geeksforgeeks::METRICS,
    }
}

/// Fetches one profile at a time: retries, extraction, fallback, and the
/// post-fetch pacing delay.
pub struct ProfileFetcher {
    transport: Arc<dyn BaseTransport>,
    config: ScrapeConfig,
}

impl ProfileFetcher {
    pub fn new(transport: Arc<dyn BaseTransport>, config: ScrapeConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Fetch one profile. Infallible by design: any terminal error becomes a
    /// failed record so batch callers keep moving. The platform's pacing
    /// delay runs on success and failure alike.
    pub async fn fetch(&self, platform: Platform, username: &str) -> StatRecord {
        let result = match platform {
            Platform::Leetcode => {
                leetcode::fetch(self.transport.as_ref(), &self.config.retry, username).await
            }
            Platform::Codechef => {
                codechef::fetch(self.transport.as_ref(), &self.config.retry, username).await
            }
            Platform::Geeksforgeeks => {
                geeksforgeeks::fetch(self.transport.as_ref(), &self.config.retry, username).await
            }
        };

        let record = match result {
            Ok(record) => {
                debug!(platform = %platform, username, "Profile fetched");
                record
            }
            Err(error) => {
                warn!(platform = %platform, username, %error, "Profile fetch failed");
                StatRecord::failed(username, metric_keys(platform), &error)
            }
        };

        let delay = self.config.platform_delay(platform);
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        record
    }
}
