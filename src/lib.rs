//! `fetch-retry` issues HTTP requests with a per-attempt timeout, retrying
//! failed attempts with exponential backoff.
//!
//! Entry points:
//! - [`RetryingFetcher::fetch`] and [`RetryingFetcher::fetch_with`]
//! - [`fetch_with_retry`] for one-off calls
//! - [`retry_with_timeout`] to apply the same policy to any async operation
//!
//! With the default [`RetryConfig`] a call makes up to four attempts of
//! 3 s each, waiting 1 s, 2 s and 4 s in between.

mod error;
mod fetcher;
mod options;
mod request;
mod retry;

pub use error::{AttemptError, FetchError};
pub use fetcher::{fetch_with_retry, RetryingFetcher};
pub use options::{
    RetryConfig, RetryOverrides, ENV_BACKOFF_MULTIPLIER, ENV_MAX_RETRIES, ENV_TIMEOUT_MS,
};
pub use request::RequestOptions;
pub use retry::{retry_with_timeout, Attempt};

pub type Result<T> = std::result::Result<T, FetchError>;
