//! LeetCode extractor: the public GraphQL endpoint.
//!
//! The total is always recomputed as easy + medium + hard. The payload can
//! carry other difficulty labels ("All" among them); those are ignored, and
//! so is any total the upstream supplies.

use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::transport::{BaseTransport, REQUEST_TIMEOUT};
use crate::fetch::{execute, FetchRequest, RetryPolicy};
use crate::record::{StatRecord, StatValue};

pub const EASY: &str = "easy";
pub const MEDIUM: &str = "medium";
pub const HARD: &str = "hard";
pub const TOTAL: &str = "total";

pub const METRICS: &[&str] = &[EASY, MEDIUM, HARD, TOTAL];

const GRAPHQL_URL: &str = "https://leetcode.com/graphql/";

const USER_PROFILE_QUERY: &str = r#"
query getUserProfile($username: String!) {
  matchedUser(username: $username) {
    username
    submitStatsGlobal {
      acSubmissionNum {
        difficulty
        count
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    errors: Option<Vec<serde_json::Value>>,
    data: Option<GraphqlData>,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    #[serde(rename = "matchedUser")]
    matched_user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
struct MatchedUser {
    username: String,
    #[serde(rename = "submitStatsGlobal")]
    submit_stats_global: Option<SubmitStats>,
}

#[derive(Debug, Deserialize)]
struct SubmitStats {
    #[serde(rename = "acSubmissionNum")]
    ac_submission_num: Vec<DifficultyCount>,
}

#[derive(Debug, Deserialize)]
struct DifficultyCount {
    difficulty: String,
    count: u64,
}

/// Validate the GraphQL envelope and sum the three difficulty buckets.
pub fn extract(_username: &str, body: &str) -> Result<StatRecord, FetchError> {
    let doc: GraphqlResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("invalid GraphQL response: {e}")))?;

    if let Some(errors) = &doc.errors {
        if !errors.is_empty() {
            return Err(FetchError::Parse(format!(
                "GraphQL errors: {}",
                serde_json::Value::Array(errors.clone())
            )));
        }
    }

    let user = doc
        .data
        .and_then(|d| d.matched_user)
        .ok_or(FetchError::NotFound)?;

    let mut easy = 0u64;
    let mut medium = 0u64;
    let mut hard = 0u64;
    if let Some(stats) = &user.submit_stats_global {
        for entry in &stats.ac_submission_num {
            match entry.difficulty.to_lowercase().as_str() {
                "easy" => easy = entry.count,
                "medium" => medium = entry.count,
                "hard" => hard = entry.count,
                // "All" and anything else the upstream invents
                _ => {}
            }
        }
    }

    let mut record = StatRecord::new(&user.username, METRICS);
    record.set(EASY, StatValue::Count(easy));
    record.set(MEDIUM, StatValue::Count(medium));
    record.set(HARD, StatValue::Count(hard));
    record.set(TOTAL, StatValue::Count(easy + medium + hard));
    Ok(record)
}

pub async fn fetch(
    transport: &dyn BaseTransport,
    policy: &RetryPolicy,
    username: &str,
) -> Result<StatRecord, FetchError> {
    let body = serde_json::json!({
        "query": USER_PROFILE_QUERY,
        "variables": { "username": username },
    });
    let response = execute(
        transport,
        &FetchRequest::PostJson {
            url: GRAPHQL_URL,
            body: &body,
        },
        policy,
        REQUEST_TIMEOUT,
    )
    .await?;
    extract(username, &response.body)
}
