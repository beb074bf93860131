//! CodeChef extractor: pattern matching over the rendered profile page,
//! with a secondary stats API filling in ranks the page didn't yield.
//!
//! The profile page has no stable markup to select on, so the page is
//! reduced to visible text and matched against ordered pattern lists, one
//! list per metric. The first matching pattern wins; listing the
//! rating-section-scoped pattern before the generic one gives it priority.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::transport::{BaseTransport, FALLBACK_TIMEOUT, REQUEST_TIMEOUT};
use crate::fetch::{execute, FetchRequest, RetryPolicy};
use crate::record::{StatRecord, StatValue};

pub const DIVISION: &str = "division";
pub const RATING: &str = "provisionalRating";
pub const GLOBAL_RANK: &str = "globalRank";
pub const COUNTRY_RANK: &str = "countryRank";
pub const PROBLEMS_SOLVED: &str = "totalProblemsSolved";
pub const CONTESTS: &str = "contestsParticipated";

pub const METRICS: &[&str] = &[
    DIVISION,
    RATING,
    GLOBAL_RANK,
    COUNTRY_RANK,
    PROBLEMS_SOLVED,
    CONTESTS,
];

const PROFILE_BASE: &str = "https://www.codechef.com/users";
const FALLBACK_API: &str = "https://api-base-sahil.herokuapp.com/codechef";

lazy_static! {
    static ref DIVISION_PATTERNS: Vec<Regex> = patterns(&[r"(?i)Div\s*(\d+)"]);
    static ref RATING_PATTERNS: Vec<Regex> = patterns(&[
        // Rating-section form first: "1500? ... Provisional Rating"
        r"(?i)(\d{3,4})\?\s*.*?Provisional Rating",
        r"(?i)(\d{3,4})\s*Provisional Rating",
        r"(?i)Rating[:\s]*(\d{3,4})",
    ]);
    static ref GLOBAL_RANK_PATTERNS: Vec<Regex> = patterns(&[
        r"(?i)(\d+)\s*Global Rank",
        r"(?i)Global Rank[:\s]*(\d+)",
    ]);
    static ref COUNTRY_RANK_PATTERNS: Vec<Regex> = patterns(&[r"(?i)(\d+)\s*Country Rank"]);
    static ref PROBLEMS_PATTERNS: Vec<Regex> =
        patterns(&[r"(?i)Total Problems Solved[:\s]*(\d+)"]);
    static ref CONTESTS_PATTERNS: Vec<Regex> = patterns(&[
        r"(?i)No\.\s*of\s*Contests\s*Participated[:\s]*(\d+)",
        r"(?i)Contests\s*Participated[:\s]*(\d+)",
        r"(?i)(\d+)\s*contests?\s*participated",
    ]);
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("static pattern"))
        .collect()
}

/// First capture of the first pattern that matches, in listed order.
fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Visible text of the page body, in document order.
fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").expect("static selector");
    match document.select(&body).next() {
        Some(el) => el.text().collect(),
        None => document.root_element().text().collect(),
    }
}

/// Run the pattern tables against the page. Errors only when nothing at all
/// was recognizable, which means the 200 we got was not a profile page.
pub fn extract(username: &str, html: &str) -> Result<StatRecord, FetchError> {
    let text = page_text(html);
    let mut record = StatRecord::new(username, METRICS);

    if let Some(div) = first_match(&DIVISION_PATTERNS, &text) {
        record.set(DIVISION, StatValue::Text(format!("Div {div}")));
    }
    for (key, table) in [
        (RATING, &*RATING_PATTERNS),
        (GLOBAL_RANK, &*GLOBAL_RANK_PATTERNS),
        (COUNTRY_RANK, &*COUNTRY_RANK_PATTERNS),
        (PROBLEMS_SOLVED, &*PROBLEMS_PATTERNS),
        (CONTESTS, &*CONTESTS_PATTERNS),
    ] {
        if let Some(raw) = first_match(table, &text) {
            if let Ok(n) = raw.parse::<u64>() {
                record.set(key, StatValue::Count(n));
            }
        }
    }

    if METRICS.iter().all(|k| record.is_unavailable(k)) {
        return Err(FetchError::Parse(
            "no recognizable profile data on page".into(),
        ));
    }
    Ok(record)
}

/// Rank/rating values the secondary stats API offered.
#[derive(Debug, Default)]
pub struct FallbackStats {
    pub global_rank: Option<StatValue>,
    pub country_rank: Option<StatValue>,
    pub rating: Option<StatValue>,
}

/// Fallback query URL with the username form-encoded; a raw cell that fell
/// through username extraction can carry characters with query meaning.
fn fallback_url(username: &str) -> Option<String> {
    url::Url::parse_with_params(FALLBACK_API, [("username", username)])
        .ok()
        .map(String::from)
}

/// One supplementary lookup against the secondary API. Short timeout, no
/// retries; every failure collapses to `None` and is not propagated.
pub async fn fallback_lookup(
    transport: &dyn BaseTransport,
    username: &str,
) -> Option<FallbackStats> {
    let url = fallback_url(username)?;
    let response = match transport.get(&url, FALLBACK_TIMEOUT).await {
        Ok(r) if r.is_success() => r,
        Ok(r) => {
            debug!(username, status = r.status, "CodeChef fallback API unavailable");
            return None;
        }
        Err(e) => {
            debug!(username, error = %e, "CodeChef fallback API unreachable");
            return None;
        }
    };

    let doc: serde_json::Value = serde_json::from_str(&response.body).ok()?;
    Some(FallbackStats {
        global_rank: doc.get("global_rank").and_then(StatValue::from_json_scalar),
        country_rank: doc.get("country_rank").and_then(StatValue::from_json_scalar),
        rating: doc.get("rating").and_then(StatValue::from_json_scalar),
    })
}

/// Fill still-unavailable fields from the fallback. A value the page
/// already yielded is never overwritten.
pub fn apply_fallback(record: &mut StatRecord, fallback: &FallbackStats) {
    let fills = [
        (GLOBAL_RANK, &fallback.global_rank),
        (COUNTRY_RANK, &fallback.country_rank),
        (RATING, &fallback.rating),
    ];
    for (key, value) in fills {
        if record.is_unavailable(key) {
            if let Some(v) = value {
                record.set(key, v.clone());
            }
        }
    }
}

/// Full CodeChef fetch: retried page request, pattern extraction, and the
/// fallback lookup when either rank is still missing.
pub async fn fetch(
    transport: &dyn BaseTransport,
    policy: &RetryPolicy,
    username: &str,
) -> Result<StatRecord, FetchError> {
    let url = format!("{PROFILE_BASE}/{username}");
    let response = execute(
        transport,
        &FetchRequest::Get { url: &url },
        policy,
        REQUEST_TIMEOUT,
    )
    .await?;

    let mut record = extract(username, &response.body)?;

    if record.is_unavailable(GLOBAL_RANK) || record.is_unavailable(COUNTRY_RANK) {
        if let Some(fallback) = fallback_lookup(transport, username).await {
            apply_fallback(&mut record, &fallback);
        }
    }
    Ok(record)
}
