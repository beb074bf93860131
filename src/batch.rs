//! Sequential batch runner.
//!
//! One job at a time, deliberately: the upstream hosts rate-limit by
//! origin, so parallel fetches would only trade throughput for 429s. The
//! fetcher paces itself; the runner adds the caller's inter-job delay on
//! top when asked to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::platform::Platform;
use crate::record::StatRecord;
use crate::scrape::ProfileFetcher;

/// One unit of fetch work, derived from a roster row and consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    pub platform: Platform,
    pub username: String,
    pub source_url: String,
}

impl FetchJob {
    pub fn from_link(platform: Platform, link: &str) -> Self {
        Self {
            platform,
            username: platform.extract_username(link),
            source_url: link.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Done,
}

/// Drives the fetcher over an ordered job list. Records accumulate in
/// arrival order; a failed job contributes a failed record and the run
/// keeps going. Cancellation is a flag checked between jobs only — an
/// in-flight fetch always completes.
pub struct BatchRunner<'a> {
    fetcher: &'a ProfileFetcher,
    state: RunState,
    cancelled: Arc<AtomicBool>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(fetcher: &'a ProfileFetcher) -> Self {
        Self {
            fetcher,
            state: RunState::Idle,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Flag a caller can keep to stop the run between jobs.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run every job back to back, fetcher pacing only.
    pub async fn run(&mut self, jobs: &[FetchJob]) -> Vec<StatRecord> {
        self.run_paced(jobs, Duration::ZERO, |_, _| {}).await
    }

    /// Run with an extra fixed delay after each job, reporting each
    /// completion to `on_complete` before the delay.
    pub async fn run_paced(
        &mut self,
        jobs: &[FetchJob],
        pace: Duration,
        mut on_complete: impl FnMut(&FetchJob, &StatRecord),
    ) -> Vec<StatRecord> {
        self.state = RunState::Running;
        let mut records = Vec::with_capacity(jobs.len());

        for job in jobs {
            if self.cancelled.load(Ordering::SeqCst) {
                info!(
                    completed = records.len(),
                    remaining = jobs.len() - records.len(),
                    "Batch run cancelled between jobs"
                );
                break;
            }

            let record = self.fetcher.fetch(job.platform, &job.username).await;
            on_complete(job, &record);
            records.push(record);

            if pace > Duration::ZERO {
                tokio::time::sleep(pace).await;
            }
        }

        self.state = RunState::Done;
        records
    }
}
