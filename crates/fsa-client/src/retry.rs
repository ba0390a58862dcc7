//! Backoff for read-only and side-effect-free calls.
//!
//! Only failures to connect are retried: nothing reached the server, so
//! sending again cannot duplicate an answer, a photo or a finalize. Timeouts
//! and every HTTP status go straight back to the caller. Mutating calls do
//! not go through here at all.

use std::future::Future;
use std::time::Duration;

/// Attempts after the first one.
const MAX_RETRIES: u32 = 3;

/// First backoff delay; doubled on each further attempt.
const BASE_DELAY: Duration = Duration::from_millis(200);

fn backoff(retry: u32) -> Duration {
    BASE_DELAY * 2u32.pow(retry)
}

/// Send a request built by `f`, retrying connection failures.
pub(crate) async fn retry_send<F, Fut>(f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut retry = 0;
    loop {
        match f().await {
            Err(e) if e.is_connect() && retry < MAX_RETRIES => {
                let delay = backoff(retry);
                retry += 1;
                tracing::warn!(
                    retry,
                    max_retries = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "connection failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn refused_connection_uses_every_retry() {
        let attempts = AtomicU32::new(0);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result = retry_send(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            http.get("http://127.0.0.1:1/").send()
        })
        .await;

        assert!(result.unwrap_err().is_connect());
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn request_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let http = reqwest::Client::new();

        // Unparseable URL: fails while building the request.
        let result = retry_send(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            http.get("not a url").send()
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
