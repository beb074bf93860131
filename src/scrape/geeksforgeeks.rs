//! GeeksforGeeks extractor: structured JSON from the community stats API.
//!
//! Missing solved-count buckets mean "none solved" and default to 0;
//! missing score/streak/rating fields mean the profile genuinely has no
//! such value and stay unavailable.

use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::transport::{BaseTransport, REQUEST_TIMEOUT};
use crate::fetch::{execute, FetchRequest, RetryPolicy};
use crate::record::{StatRecord, StatValue};

pub const TOTAL_SOLVED: &str = "totalProblemsSolved";
pub const SCHOOL: &str = "school";
pub const BASIC: &str = "basic";
pub const EASY: &str = "easy";
pub const MEDIUM: &str = "medium";
pub const HARD: &str = "hard";
pub const STREAK: &str = "streak";
pub const CODING_SCORE: &str = "codingScore";
pub const CONTEST_RATING: &str = "contestRating";

pub const METRICS: &[&str] = &[
    TOTAL_SOLVED,
    SCHOOL,
    BASIC,
    EASY,
    MEDIUM,
    HARD,
    STREAK,
    CODING_SCORE,
    CONTEST_RATING,
];

const API_BASE: &str = "https://geeks-for-geeks-api.vercel.app";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    error: Option<serde_json::Value>,
    info: Option<ApiInfo>,
    #[serde(rename = "solvedStats")]
    solved_stats: Option<ApiSolvedStats>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(rename = "codingScore")]
    coding_score: Option<serde_json::Value>,
    #[serde(rename = "totalProblemsSolved")]
    total_problems_solved: Option<u64>,
    #[serde(rename = "currentStreak")]
    current_streak: Option<serde_json::Value>,
    #[serde(rename = "contestRating")]
    contest_rating: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSolvedStats {
    school: Option<ApiBucket>,
    basic: Option<ApiBucket>,
    easy: Option<ApiBucket>,
    medium: Option<ApiBucket>,
    hard: Option<ApiBucket>,
}

#[derive(Debug, Deserialize)]
struct ApiBucket {
    count: Option<u64>,
}

fn bucket_count(bucket: &Option<ApiBucket>) -> u64 {
    bucket.as_ref().and_then(|b| b.count).unwrap_or(0)
}

/// Map the API document onto a record. A top-level `error` field is
/// terminal; the API uses it for unknown users.
pub fn extract(username: &str, body: &str) -> Result<StatRecord, FetchError> {
    let doc: ApiResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("invalid GeeksforGeeks response: {e}")))?;

    if let Some(error) = doc.error {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        if message.to_lowercase().contains("not found") {
            return Err(FetchError::NotFound);
        }
        return Err(FetchError::Parse(message));
    }

    let mut record = StatRecord::new(username, METRICS);

    if let Some(info) = &doc.info {
        record.set(
            TOTAL_SOLVED,
            StatValue::Count(info.total_problems_solved.unwrap_or(0)),
        );
        // A score of 0 is how the API renders "no score yet".
        match info.coding_score.as_ref().and_then(StatValue::from_json_scalar) {
            Some(StatValue::Count(0)) | None => {}
            Some(v) => record.set(CODING_SCORE, v),
        }
        if let Some(streak) = info.current_streak.as_ref().and_then(StatValue::from_json_scalar) {
            record.set(STREAK, streak);
        }
        if let Some(rating) = info.contest_rating.as_ref().and_then(StatValue::from_json_scalar) {
            record.set(CONTEST_RATING, rating);
        }
    } else {
        record.set(TOTAL_SOLVED, StatValue::Count(0));
    }

    let stats = doc.solved_stats.unwrap_or_default();
    record.set(SCHOOL, StatValue::Count(bucket_count(&stats.school)));
    record.set(BASIC, StatValue::Count(bucket_count(&stats.basic)));
    record.set(EASY, StatValue::Count(bucket_count(&stats.easy)));
    record.set(MEDIUM, StatValue::Count(bucket_count(&stats.medium)));
    record.set(HARD, StatValue::Count(bucket_count(&stats.hard)));

    Ok(record)
}

pub async fn fetch(
    transport: &dyn BaseTransport,
    policy: &RetryPolicy,
    username: &str,
) -> Result<StatRecord, FetchError> {
    let url = format!("{API_BASE}/{username}");
    let response = execute(
        transport,
        &FetchRequest::Get { url: &url },
        policy,
        REQUEST_TIMEOUT,
    )
    .await?;
    extract(username, &response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Unavailable;

    #[test]
    fn maps_full_document() {
        let body = r#"{
            "info": {
                "codingScore": 345,
                "totalProblemsSolved": 120,
                "currentStreak": 7,
                "contestRating": 1650
            },
            "solvedStats": {
                "school": {"count": 10},
                "basic": {"count": 30},
                "easy": {"count": 40},
                "medium": {"count": 30},
                "hard": {"count": 10}
            }
        }"#;
        let record = extract("geek", body).unwrap();
        assert_eq!(record.get(TOTAL_SOLVED), Some(&StatValue::Count(120)));
        assert_eq!(record.get(CODING_SCORE), Some(&StatValue::Count(345)));
        assert_eq!(record.get(STREAK), Some(&StatValue::Count(7)));
        assert_eq!(record.get(CONTEST_RATING), Some(&StatValue::Count(1650)));
        assert_eq!(record.get(SCHOOL), Some(&StatValue::Count(10)));
        assert_eq!(record.get(HARD), Some(&StatValue::Count(10)));
    }

    #[test]
    fn absent_buckets_default_to_zero_counts() {
        let body = r#"{"info": {"totalProblemsSolved": 5}, "solvedStats": {"easy": {"count": 5}}}"#;
        let record = extract("geek", body).unwrap();
        assert_eq!(record.get(EASY), Some(&StatValue::Count(5)));
        assert_eq!(record.get(SCHOOL), Some(&StatValue::Count(0)));
        assert_eq!(record.get(HARD), Some(&StatValue::Count(0)));
    }

    #[test]
    fn absent_score_and_rating_stay_unavailable() {
        let body = r#"{"info": {"totalProblemsSolved": 5}, "solvedStats": {}}"#;
        let record = extract("geek", body).unwrap();
        assert_eq!(
            record.get(CODING_SCORE),
            Some(&StatValue::Unavailable(Unavailable::NotOnPage))
        );
        assert_eq!(
            record.get(STREAK),
            Some(&StatValue::Unavailable(Unavailable::NotOnPage))
        );
        assert_eq!(
            record.get(CONTEST_RATING),
            Some(&StatValue::Unavailable(Unavailable::NotOnPage))
        );
    }

    #[test]
    fn zero_streak_is_a_real_value() {
        let body = r#"{"info": {"currentStreak": 0}, "solvedStats": {}}"#;
        let record = extract("geek", body).unwrap();
        assert_eq!(record.get(STREAK), Some(&StatValue::Count(0)));
    }

    #[test]
    fn error_field_is_terminal() {
        let err = extract("ghost", r#"{"error": "Profile Not Found"}"#).unwrap_err();
        assert!(matches!(err, FetchError::NotFound));

        let err = extract("geek", r#"{"error": "upstream exploded"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn garbage_body_is_a_parse_failure() {
        let err = extract("geek", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
