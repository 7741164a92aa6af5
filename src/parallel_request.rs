use crate::{Dispatcher, FetchError, FetcherConfig, RequestSet, DEFAULT_TIMEOUT_MS};
use std::io;
use std::time::Duration;
use tracing::{debug, instrument};

/// A validated batch of urls plus the timeout to fetch them with.
///
/// ```no_run
/// # async fn demo() -> Result<(), parallel_get::FetchError> {
/// use parallel_get::ParallelRequest;
///
/// let bodies = ParallelRequest::with_timeout(
///     3000,
///     ["http://192.168.0.1/usr?delay=1", "http://192.168.0.2"],
/// )?
/// .get_result()
/// .await?;
/// assert_eq!(bodies.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ParallelRequest {
    dispatcher: Dispatcher,
    requests: RequestSet,
}

impl ParallelRequest {
    /// Uses the default timeout of 5000 ms.
    pub fn new<I, S>(urls: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_timeout(DEFAULT_TIMEOUT_MS, urls)
    }

    pub fn with_timeout<I, S>(timeout_ms: u64, urls: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(
            FetcherConfig::default().with_timeout(Duration::from_millis(timeout_ms)),
            urls,
        )
    }

    pub fn with_config<I, S>(config: FetcherConfig, urls: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = RequestSet::build(urls)?;
        debug!(
            requests = requests.len(),
            timeout_ms = config.timeout.as_millis() as u64,
            "Request set prepared"
        );
        Ok(Self {
            dispatcher: Dispatcher::with_config(config),
            requests,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.dispatcher.timeout()
    }

    pub fn requests(&self) -> &RequestSet {
        &self.requests
    }

    /// Bodies in the order their urls were first given.
    pub async fn get_result(&self) -> Result<Vec<String>, FetchError> {
        self.dispatcher.dispatch(&self.requests).await
    }

    /// Blocks the calling thread until every request has finished.
    ///
    /// Must not be called from inside an async runtime.
    pub fn get_result_blocking(&self) -> Result<Vec<String>, FetchError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(FetchError::Runtime(io::Error::new(
                io::ErrorKind::Other,
                "get_result_blocking called from within an async runtime",
            )));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.get_result())
    }
}

/// Fetches every distinct url concurrently and returns the bodies in input order.
///
/// `timeout_ms` falls back to 5000 when `None`.
#[instrument(level = "debug", skip(urls))]
pub async fn run<I, S>(timeout_ms: Option<u64>, urls: I) -> Result<Vec<String>, FetchError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ParallelRequest::with_timeout(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS), urls)?
        .get_result()
        .await
}

/// Blocking form of [`run`].
pub fn run_blocking<I, S>(timeout_ms: Option<u64>, urls: I) -> Result<Vec<String>, FetchError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ParallelRequest::with_timeout(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS), urls)?
        .get_result_blocking()
}
