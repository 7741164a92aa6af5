//! Concurrent fan-out/fan-in HTTP GET.
//!
//! Every distinct url is requested at once; the bodies come back in the order
//! the urls were first given, whatever order the responses arrived in. A single
//! failed request fails the whole batch.

mod dispatcher;
mod error;
mod fetcher;
mod logging;
mod parallel_request;
mod request_set;
mod utils;

pub use dispatcher::{Dispatcher, Outcome, ResultCollection};
pub use error::{FetchError, RequestError, RequestFailure};
pub use fetcher::{BodySource, Fetcher, FetcherConfig, DEFAULT_TIMEOUT_MS};
pub use logging::{log_batch_failure, log_error_card, log_failure_card};
#[cfg(feature = "logging")]
pub use logging::{setup_logging, LogConfig};
pub use parallel_request::{run, run_blocking, ParallelRequest};
pub use request_set::{RequestSet, RequestSpec};
