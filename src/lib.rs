// Competitive-Programming Profile Tracker - core
//
// Fetch engine with retry/backoff and fallback resolution, per-platform
// extractors, and the bulk-ingestion pipeline with live progress events.
// The HTTP surface in `server` is a thin shell over these.

pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod platform;
pub mod progress;
pub mod record;
pub mod scrape;
pub mod server;
pub mod store;

pub use batch::{BatchRunner, FetchJob, RunState};
pub use config::{Config, ScrapeConfig};
pub use error::{FetchError, IngestError};
pub use fetch::{BaseTransport, HttpTransport, RetryPolicy};
pub use ingest::{IngestOutcome, IngestPipeline};
pub use platform::Platform;
pub use progress::{LogStatus, ProgressEvent, ProgressHub};
pub use record::{Profile, Roster, StatRecord, StatValue, Unavailable};
pub use scrape::ProfileFetcher;
pub use store::ProfileStore;
