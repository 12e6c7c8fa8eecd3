/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network or request execution error from `reqwest`, unchanged.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The attempt did not complete before its timeout elapsed.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    /// Retryable HTTP status with raw response body.
    ///
    /// Only produced when status retries are enabled on the fetcher.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// The request descriptor could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Retry configuration failed validation.
    #[error("invalid retry configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Returns true for attempt timeouts and transport-level timeouts.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Outcome of a single failed attempt of the retry loop.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError<E> {
    /// The operation itself returned an error.
    #[error("{0}")]
    Failed(E),
    /// The operation was cancelled when its timeout fired.
    #[error("attempt timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl<E> AttemptError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the operation's error, if the attempt did not time out.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Timeout { .. } => None,
        }
    }
}

impl From<AttemptError<FetchError>> for FetchError {
    fn from(err: AttemptError<FetchError>) -> Self {
        match err {
            AttemptError::Failed(err) => err,
            AttemptError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
        }
    }
}
