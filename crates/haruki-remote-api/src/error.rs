//! Errors from collaborator calls

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors from remote collaborator operations
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The call did not finish before its deadline
    #[error("timeout: deadline exceeded")]
    Timeout,

    /// Non-2xx answer; `body` is already truncated for display
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not supported: {0}")]
    Unsupported(String),

    /// The chat message a view edit was aimed at is gone
    #[error("view target unavailable: {0}")]
    ViewGone(String),
}

impl RemoteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Run a collaborator call under a hard deadline.
///
/// Elapsed deadlines surface as [`RemoteError::Timeout`]; the inner future is
/// dropped, which is the only cancellation a remote call ever gets.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_maps_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok::<_, RemoteError>(1)
        };

        let err = with_deadline(Duration::from_secs(60), slow).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let failing = async { Err::<(), _>(RemoteError::http(502, "bad gateway")) };

        let err = with_deadline(Duration::from_secs(1), failing).await.unwrap_err();
        assert_eq!(err.to_string(), "http 502: bad gateway");
    }
}
