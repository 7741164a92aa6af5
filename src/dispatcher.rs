use crate::{
    BodySource, FetchError, Fetcher, FetcherConfig, RequestError, RequestFailure, RequestSet,
    RequestSpec,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { position: usize, body: String },
    Failure(RequestFailure),
}

impl Outcome {
    fn from_join(
        spec: RequestSpec,
        joined: Result<Result<String, RequestError>, JoinError>,
    ) -> Self {
        match joined {
            Ok(Ok(body)) => Outcome::Success {
                position: spec.position,
                body,
            },
            Ok(Err(error)) => Outcome::Failure(RequestFailure::new(spec.url, error)),
            Err(e) if e.is_cancelled() => Outcome::Failure(RequestFailure::cancelled(spec.url)),
            Err(e) => Outcome::Failure(RequestFailure::new(
                spec.url,
                RequestError::Panicked(e.to_string()),
            )),
        }
    }
}

/// State owned by a single dispatch. Only the collecting future writes to it.
#[derive(Debug, Default)]
pub struct ResultCollection {
    bodies: BTreeMap<usize, String>,
    failures: Vec<RequestFailure>,
    received: usize,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.received += 1;
        match outcome {
            Outcome::Success { position, body } => {
                self.bodies.insert(position, body);
            }
            Outcome::Failure(failure) => {
                warn!(url = %failure.url, error = %failure.error, "Request failed");
                self.failures.push(failure);
            }
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }

    /// Bodies by ascending position, or every failure if there was at least one.
    pub fn finish(mut self, specs: &RequestSet) -> Result<Vec<String>, FetchError> {
        if self.failures.is_empty() {
            return Ok(self.bodies.into_values().collect());
        }

        self.failures
            .sort_by_key(|f| specs.position_of(&f.url).unwrap_or(usize::MAX));
        Err(FetchError::BatchFailure {
            failures: self.failures,
        })
    }
}

/// A spawned request together with the spec it was issued for.
///
/// Dropping it aborts the task, so abandoning a dispatch never leaves requests running.
struct InFlight {
    spec: Option<RequestSpec>,
    handle: JoinHandle<Result<String, RequestError>>,
}

impl Future for InFlight {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let joined = match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(joined) => joined,
            Poll::Pending => return Poll::Pending,
        };
        let spec = self.spec.take().unwrap_or_else(|| RequestSpec {
            url: String::new(),
            position: usize::MAX,
        });
        Poll::Ready(Outcome::from_join(spec, joined))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Issues every request of a [`RequestSet`] at once and gathers the bodies in position order.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: FetcherConfig,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self::with_config(FetcherConfig::default().with_timeout(timeout))
    }

    pub fn with_config(config: FetcherConfig) -> Self {
        Self { config }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Runs the batch on a fresh client that lives exactly as long as this call.
    #[instrument(level = "debug", skip_all, fields(requests = specs.len()))]
    pub async fn dispatch(&self, specs: &RequestSet) -> Result<Vec<String>, FetchError> {
        let fetcher = Arc::new(Fetcher::new_with_config(self.config.clone())?);
        let result = Self::dispatch_with(Arc::clone(&fetcher), specs).await;
        drop(fetcher);
        debug!("HTTP client released");
        result
    }

    /// Same as [`Dispatcher::dispatch`] but against a caller-supplied source.
    #[instrument(level = "debug", skip_all, fields(requests = specs.len()))]
    pub async fn dispatch_with<S>(source: Arc<S>, specs: &RequestSet) -> Result<Vec<String>, FetchError>
    where
        S: BodySource + 'static,
    {
        let started = Instant::now();

        let mut in_flight: FuturesUnordered<InFlight> = specs
            .iter()
            .map(|spec| {
                let source = Arc::clone(&source);
                let url = spec.url.clone();
                debug!(url = %url, position = spec.position, "Submitting request");
                InFlight {
                    spec: Some(spec.clone()),
                    handle: tokio::spawn(async move { source.fetch_text(&url).await }),
                }
            })
            .collect();

        let mut collection = ResultCollection::new();
        while let Some(outcome) = in_flight.next().await {
            collection.record(outcome);
        }
        debug_assert_eq!(collection.received(), specs.len());

        let result = collection.finish(specs);
        match &result {
            Ok(bodies) => info!(
                requests = bodies.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Batch completed"
            ),
            Err(e) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Batch finished");
                e.log();
            }
        }
        result
    }
}
