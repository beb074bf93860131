//! Bulk-ingestion pipeline: roster rows in, freshly fetched roster out,
//! with live progress events along the way.

pub mod sheet;

use tracing::{info, warn};

use crate::batch::{BatchRunner, FetchJob};
use crate::error::IngestError;
use crate::platform::Platform;
use crate::progress::{LogStatus, ProgressEvent, ProgressHub};
use crate::record::{Profile, Roster, StatRecord};
use crate::scrape::ProfileFetcher;

pub use sheet::{parse_roster, parse_sheet, RosterRow};

/// Result of one ingestion run. `roster` replaces whatever was persisted
/// before — replace-all, never merge.
#[derive(Debug)]
pub struct IngestOutcome {
    pub roster: Roster,
    pub row_errors: Vec<String>,
    pub total_jobs: usize,
}

pub struct IngestPipeline<'a> {
    fetcher: &'a ProfileFetcher,
    hub: &'a ProgressHub,
}

struct RowJob {
    row: usize,
    job: FetchJob,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(fetcher: &'a ProfileFetcher, hub: &'a ProgressHub) -> Self {
        Self { fetcher, hub }
    }

    /// Run the whole pipeline over parsed sheet rows.
    ///
    /// The expected job total is computed up front; a roster over the
    /// ceiling is rejected before any network request goes out. Jobs then
    /// run strictly sequentially across the entire batch — every job, on
    /// any platform, is followed by the configured bulk pacing delay.
    pub async fn ingest(&self, rows: &[Vec<String>]) -> Result<IngestOutcome, IngestError> {
        let (accepted, row_errors) = sheet::parse_roster(rows)?;

        let mut jobs = Vec::new();
        for (row_idx, row) in accepted.iter().enumerate() {
            for (platform, link) in &row.links {
                jobs.push(RowJob {
                    row: row_idx,
                    job: FetchJob::from_link(*platform, link),
                });
            }
        }

        let config = self.fetcher.config();
        if jobs.len() > config.max_bulk_jobs {
            warn!(
                expected = jobs.len(),
                limit = config.max_bulk_jobs,
                "Bulk upload rejected before any fetch"
            );
            return Err(IngestError::TooManyJobs {
                expected: jobs.len(),
                limit: config.max_bulk_jobs,
            });
        }

        info!(
            rows = accepted.len(),
            jobs = jobs.len(),
            row_errors = row_errors.len(),
            "Starting bulk ingestion"
        );
        self.hub.publish(ProgressEvent::Reset { total: jobs.len() });

        let fetch_jobs: Vec<FetchJob> = jobs.iter().map(|rj| rj.job.clone()).collect();
        let mut runner = BatchRunner::new(self.fetcher);
        let records = runner
            .run_paced(&fetch_jobs, config.bulk_delay, |job, record| {
                self.hub.publish(job_event(job, record));
            })
            .await;

        let mut roster = Roster::default();
        for (row_job, record) in jobs.iter().zip(records) {
            let row = &accepted[row_job.row];
            let username = record.username.clone();
            roster.platform_mut(row_job.job.platform).push(Profile::new(
                &row.name,
                &row.reg_number,
                &row.dept,
                &row_job.job.source_url,
                &username,
                record,
            ));
        }

        info!(
            profiles = roster.total(),
            failed = roster
                .leetcode
                .iter()
                .chain(&roster.codechef)
                .chain(&roster.geeksforgeeks)
                .filter(|p| p.data.failed)
                .count(),
            "Bulk ingestion finished"
        );

        Ok(IngestOutcome {
            total_jobs: fetch_jobs.len(),
            roster,
            row_errors,
        })
    }

    /// Re-fetch every stored profile on one platform, in order, with the
    /// same pacing and progress events as a bulk run. Profile identity
    /// (id, name, registration number, link) is untouched; only the data
    /// snapshot and `last_updated` move. A failed re-fetch keeps the
    /// profile, with a failed record in place of its data.
    pub async fn refresh(&self, platform: Platform, profiles: &[Profile]) -> Vec<Profile> {
        let jobs: Vec<FetchJob> = profiles
            .iter()
            .map(|p| FetchJob {
                platform,
                username: p.username.clone(),
                source_url: p.profile_link.clone(),
            })
            .collect();

        info!(platform = %platform, jobs = jobs.len(), "Starting platform refresh");
        self.hub.publish(ProgressEvent::Reset { total: jobs.len() });

        let config = self.fetcher.config();
        let mut runner = BatchRunner::new(self.fetcher);
        let records = runner
            .run_paced(&jobs, config.bulk_delay, |job, record| {
                self.hub.publish(job_event(job, record));
            })
            .await;

        profiles
            .iter()
            .zip(records)
            .map(|(profile, record)| {
                let mut updated = profile.clone();
                updated.data = record;
                updated.last_updated = chrono::Utc::now();
                updated
            })
            .collect()
    }
}

/// One progress line per completed job, 404s called out explicitly.
fn job_event(job: &FetchJob, record: &StatRecord) -> ProgressEvent {
    let (status, message) = if !record.failed {
        (
            LogStatus::Success,
            format!("{} {}: fetched", job.platform.label(), job.username),
        )
    } else if record.error_code == Some(404) {
        (
            LogStatus::Error,
            format!(
                "{} {}: profile not found (404)",
                job.platform.label(),
                job.username
            ),
        )
    } else {
        let detail = match record.error_code {
            Some(code) => format!("fetch failed (HTTP {code})"),
            None => "fetch failed".to_string(),
        };
        (
            LogStatus::Error,
            format!("{} {}: {detail}", job.platform.label(), job.username),
        )
    };

    ProgressEvent::Log {
        platform: job.platform,
        username: job.username.clone(),
        status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrapeConfig;
    use crate::fetch::testing::ScriptedTransport;
    use std::sync::Arc;

    fn leetcode_body(username: &str) -> String {
        format!(
            r#"{{"data": {{"matchedUser": {{"username": "{username}",
            "submitStatsGlobal": {{"acSubmissionNum": [
                {{"difficulty": "Easy", "count": 10}}
            ]}}}}}}}}"#
        )
    }

    fn sheet_text(rows: usize) -> String {
        let mut text = String::from("Name,Reg No,LeetCode\n");
        for i in 0..rows {
            text.push_str(&format!(
                "Student{i},10020030040{i},https://leetcode.com/u/s{i}\n"
            ));
        }
        text
    }

    fn pipeline_parts(
        responses: Vec<Result<crate::fetch::RawResponse, crate::fetch::TransportError>>,
    ) -> (Arc<ScriptedTransport>, ProfileFetcher, ProgressHub) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let fetcher = ProfileFetcher::new(transport.clone(), ScrapeConfig::default());
        (transport, fetcher, ProgressHub::new())
    }

    #[tokio::test(start_paused = true)]
    async fn run_emits_reset_then_one_log_per_job() {
        let (_, fetcher, hub) = pipeline_parts(vec![
            ScriptedTransport::ok(200, &leetcode_body("s0")),
            ScriptedTransport::ok(404, ""),
        ]);
        let rows = sheet::parse_rows(&sheet_text(2));
        let outcome = IngestPipeline::new(&fetcher, &hub)
            .ingest(&rows)
            .await
            .unwrap();

        assert_eq!(outcome.total_jobs, 2);
        let (events, _rx) = hub.subscribe();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ProgressEvent::Reset { total: 2 });
        match &events[1] {
            ProgressEvent::Log { status, .. } => assert_eq!(*status, LogStatus::Success),
            other => panic!("expected log, got {other:?}"),
        }
        match &events[2] {
            ProgressEvent::Log { status, message, .. } => {
                assert_eq!(*status, LogStatus::Error);
                assert!(message.contains("not found (404)"));
            }
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn over_ceiling_aborts_before_any_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200,
            &leetcode_body("s0"),
        )]));
        let config = ScrapeConfig {
            max_bulk_jobs: 3,
            ..ScrapeConfig::default()
        };
        let fetcher = ProfileFetcher::new(transport.clone(), config);
        let hub = ProgressHub::new();

        let rows = sheet::parse_rows(&sheet_text(4));
        let err = IngestPipeline::new(&fetcher, &hub)
            .ingest(&rows)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::TooManyJobs {
                expected: 4,
                limit: 3
            }
        ));
        assert_eq!(transport.request_count(), 0);
        // no Reset either: the run never started
        let (events, _) = hub.subscribe();
        assert!(events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn row_errors_do_not_abort_the_run() {
        let mut text = String::from("Name,Reg No,LeetCode\n");
        text.push_str("Alice,100200300401,https://leetcode.com/u/alice\n");
        text.push_str("Bob,12345,https://leetcode.com/u/bob\n"); // bad reg
        let (transport, fetcher, hub) =
            pipeline_parts(vec![ScriptedTransport::ok(200, &leetcode_body("alice"))]);

        let rows = sheet::parse_rows(&text);
        let outcome = IngestPipeline::new(&fetcher, &hub)
            .ingest(&rows)
            .await
            .unwrap();
        assert_eq!(outcome.row_errors.len(), 1);
        assert_eq!(outcome.total_jobs, 1);
        assert_eq!(outcome.roster.leetcode.len(), 1);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_jobs_still_produce_profiles() {
        let (_, fetcher, hub) = pipeline_parts(vec![
            ScriptedTransport::ok(404, ""),
            ScriptedTransport::ok(200, &leetcode_body("s1")),
        ]);
        let rows = sheet::parse_rows(&sheet_text(2));
        let outcome = IngestPipeline::new(&fetcher, &hub)
            .ingest(&rows)
            .await
            .unwrap();

        assert_eq!(outcome.roster.leetcode.len(), 2);
        assert!(outcome.roster.leetcode[0].data.failed);
        assert!(!outcome.roster.leetcode[1].data.failed);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replaces_data_and_keeps_identity() {
        use crate::record::StatValue;
        use crate::scrape::leetcode;

        let stored = vec![
            Profile::new(
                "Student0",
                "100200300400",
                "CSE",
                "https://leetcode.com/u/s0",
                "s0",
                StatRecord::new("s0", leetcode::METRICS),
            ),
            Profile::new(
                "Student1",
                "100200300401",
                "CSE",
                "https://leetcode.com/u/s1",
                "s1",
                StatRecord::new("s1", leetcode::METRICS),
            ),
        ];
        let (transport, fetcher, hub) = pipeline_parts(vec![
            ScriptedTransport::ok(200, &leetcode_body("s0")),
            ScriptedTransport::ok(404, ""),
        ]);

        let updated = IngestPipeline::new(&fetcher, &hub)
            .refresh(Platform::Leetcode, &stored)
            .await;

        assert_eq!(updated.len(), 2);
        assert_eq!(transport.request_count(), 2);
        // identity survives, data is the fresh snapshot
        assert_eq!(updated[0].id, stored[0].id);
        assert_eq!(updated[0].name, "Student0");
        assert_eq!(updated[0].reg_number, "100200300400");
        assert_eq!(
            updated[0].data.get(leetcode::TOTAL),
            Some(&StatValue::Count(10))
        );
        // a profile whose re-fetch 404s stays in the list, marked failed
        assert_eq!(updated[1].id, stored[1].id);
        assert!(updated[1].data.failed);
        assert_eq!(updated[1].data.error_code, Some(404));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_emits_reset_then_one_log_per_profile() {
        let stored = vec![Profile::new(
            "Student0",
            "100200300400",
            "CSE",
            "https://leetcode.com/u/s0",
            "s0",
            StatRecord::new("s0", &["total"]),
        )];
        let (_, fetcher, hub) =
            pipeline_parts(vec![ScriptedTransport::ok(200, &leetcode_body("s0"))]);

        IngestPipeline::new(&fetcher, &hub)
            .refresh(Platform::Leetcode, &stored)
            .await;

        let (events, _rx) = hub.subscribe();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ProgressEvent::Reset { total: 1 });
        match &events[1] {
            ProgressEvent::Log { status, .. } => assert_eq!(*status, LogStatus::Success),
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn profiles_carry_row_fields_and_username() {
        let text = "Name,Reg No,Dept,GFG\nAlice,100200300401,CSE,https://www.geeksforgeeks.org/user/alice/\n";
        let (_, fetcher, hub) = pipeline_parts(vec![ScriptedTransport::ok(
            200,
            r#"{"info": {"totalProblemsSolved": 3}, "solvedStats": {"easy": {"count": 3}}}"#,
        )]);
        let outcome = IngestPipeline::new(&fetcher, &hub)
            .ingest(&sheet::parse_rows(text))
            .await
            .unwrap();

        let profile = &outcome.roster.geeksforgeeks[0];
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.reg_number, "100200300401");
        assert_eq!(profile.dept, "CSE");
        assert_eq!(profile.username, "alice");
        assert_eq!(
            profile.profile_link,
            "https://www.geeksforgeeks.org/user/alice/"
        );
        assert_eq!(outcome.roster.codechef.len(), 0);
    }
}
