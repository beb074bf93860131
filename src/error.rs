use thiserror::Error;

/// Terminal outcome of one profile fetch.
///
/// Transient conditions (5xx, network faults, 429 with retries remaining) are
/// handled inside the retry executor and never surface here; by the time a
/// `FetchError` exists, the fetch is over.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 404 from the upstream, or an API/GraphQL body saying the user
    /// does not exist. Never retried.
    #[error("profile not found (404)")]
    NotFound,

    /// 429 after exhausting every retry.
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Some other non-success status after exhausting every retry.
    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    /// Network-level failure (timeout, DNS, connection reset) after
    /// exhausting every retry.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be interpreted at all.
    #[error("unable to parse profile: {0}")]
    Parse(String),
}

impl FetchError {
    /// Numeric status for caller diagnostics, when one is known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::NotFound => Some(404),
            FetchError::RateLimited { .. } => Some(429),
            FetchError::Upstream { status } => Some(*status),
            FetchError::Network(_) | FetchError::Parse(_) => None,
        }
    }

    /// True for failures that no amount of retrying would fix.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::NotFound | FetchError::Parse(_))
    }
}

/// Pipeline-fatal ingestion failures. Row-level problems are accumulated as
/// plain strings instead and never abort the run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("roster sheet is empty or has no header row")]
    EmptySheet,

    #[error("roster sheet is not valid UTF-8")]
    InvalidEncoding,

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("bulk upload would create {expected} jobs, exceeding the limit of {limit}")]
    TooManyJobs { expected: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_attach_where_known() {
        assert_eq!(FetchError::NotFound.status_code(), Some(404));
        assert_eq!(
            FetchError::RateLimited { attempts: 4 }.status_code(),
            Some(429)
        );
        assert_eq!(
            FetchError::Upstream { status: 503 }.status_code(),
            Some(503)
        );
        assert_eq!(FetchError::Network("timeout".into()).status_code(), None);
    }

    #[test]
    fn terminal_classification() {
        assert!(FetchError::NotFound.is_terminal());
        assert!(FetchError::Parse("garbage".into()).is_terminal());
        assert!(!FetchError::RateLimited { attempts: 4 }.is_terminal());
        assert!(!FetchError::Upstream { status: 500 }.is_terminal());
    }
}
