//! Paginated collection
//!
//! - [`retry`]: one request with bounded linear backoff, returning a [`FetchOutcome`]
//! - [`paginate`]: walks an endpoint page by page until the declared total is
//!   reached or the server runs dry
//!
//! Everything runs on one sequential line of execution. The only suspension points
//! are the request itself, the pacing delay between pages and the retry backoff.

pub mod paginate;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use paginate::{Collection, CollectionOutcome, Collector, PageSettings, Progress};
pub use retry::{fetch_with_retry, FetchOutcome, RetryOn, RetryPolicy, Sleeper, TokioSleeper};

use crate::api::{FetchError, PageShapeError};
use thiserror::Error;

/// Errors that end a collection run
#[derive(Error, Debug)]
pub enum CollectError {
    /// Every attempt failed with a retryable error
    #[error("gave up on {path} after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        source: FetchError,
    },

    /// The retry policy classified the failure as not worth retrying
    #[error("non-retryable failure on {path}: {source}")]
    Fatal { path: String, source: FetchError },

    /// The first page stayed malformed after its one retry
    #[error("malformed page from {path}: {reason}")]
    MalformedPage {
        path: String,
        reason: PageShapeError,
    },
}
