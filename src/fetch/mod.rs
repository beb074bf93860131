//! HTTP fetch layer: the transport seam and the retry executor.

pub mod retry;
pub mod transport;

pub use retry::{execute, FetchRequest, RetryPolicy};
pub use transport::{BaseTransport, HttpTransport, RawResponse, TransportError};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{BaseTransport, RawResponse, TransportError};

    /// Scripted transport: hands out canned responses in order and counts
    /// requests. Once the script runs dry it keeps repeating the last entry.
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        last: Mutex<Option<Result<RawResponse, TransportError>>>,
        pub requests: AtomicUsize,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<Result<RawResponse, TransportError>>) -> Self {
            Self {
                script: Mutex::new(responses.into_iter().collect()),
                last: Mutex::new(None),
                requests: AtomicUsize::new(0),
            }
        }

        pub fn ok(status: u16, body: &str) -> Result<RawResponse, TransportError> {
            Ok(RawResponse {
                status,
                retry_after: None,
                body: body.to_string(),
            })
        }

        pub fn rate_limited(retry_after: Option<u64>) -> Result<RawResponse, TransportError> {
            Ok(RawResponse {
                status: 429,
                retry_after,
                body: String::new(),
            })
        }

        pub fn network_err(msg: &str) -> Result<RawResponse, TransportError> {
            Err(TransportError(msg.to_string()))
        }

        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<RawResponse, TransportError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *self.last.lock().unwrap() = Some(clone_entry(&entry));
                    entry
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(clone_entry)
                    .unwrap_or_else(|| Err(TransportError("script exhausted".into()))),
            }
        }
    }

    fn clone_entry(
        entry: &Result<RawResponse, TransportError>,
    ) -> Result<RawResponse, TransportError> {
        match entry {
            Ok(r) => Ok(r.clone()),
            Err(e) => Err(TransportError(e.0.clone())),
        }
    }

    #[async_trait]
    impl BaseTransport for ScriptedTransport {
        async fn get(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<RawResponse, TransportError> {
            self.next()
        }

        async fn post_json(
            &self,
            _url: &str,
            _body: &serde_json::Value,
            _timeout: Duration,
        ) -> Result<RawResponse, TransportError> {
            self.next()
        }
    }
}
