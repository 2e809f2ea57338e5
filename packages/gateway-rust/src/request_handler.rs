//! Single-flight, batched fetching of documents by id.
//!
//! A fetch for an id that is already pending joins the pending request.
//! Fetches for distinct ids queued before the flush task runs are merged
//! into one `fetch_many` call; a lone id goes through `fetch_one`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use settingsgate_core::Value;
use tokio::sync::oneshot;
use tracing::Instrument;

/// Backend reads the handler coalesces.
#[async_trait]
pub trait BatchFetcher: Send + Sync {
    async fn fetch_one(&self, id: &str) -> anyhow::Result<Option<Value>>;

    /// Rows absent from the result resolve to `None` for their requester.
    async fn fetch_many(&self, ids: &[String]) -> anyhow::Result<Vec<(String, Value)>>;
}

/// Failure shared by every requester of a failed batch.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    message: Arc<str>,
}

impl FetchError {
    fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

pub type FetchResult = Result<Option<Value>, FetchError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Default)]
struct State {
    in_flight: HashMap<String, SharedFetch>,
    queued: Vec<(String, oneshot::Sender<FetchResult>)>,
    flush_scheduled: bool,
}

struct Inner {
    fetcher: Arc<dyn BatchFetcher>,
    window: Duration,
    state: Mutex<State>,
}

/// Coalescing front of a [`BatchFetcher`]. Cheap to clone.
#[derive(Clone)]
pub struct RequestHandler {
    inner: Arc<Inner>,
}

impl RequestHandler {
    /// `window` is how long a batch stays open; zero flushes on the next
    /// scheduler tick.
    #[must_use]
    pub fn new(fetcher: Arc<dyn BatchFetcher>, window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                window,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Fetches `id`, joining a pending request for the same id if there is
    /// one. Must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// The backend failure of the batch `id` was part of.
    pub async fn fetch(&self, id: &str) -> FetchResult {
        self.enqueue(id).await
    }

    /// Number of ids fetched or queued but not yet resolved.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Waits until every pending request, including ones issued while
    /// waiting, has resolved.
    pub async fn wait(&self) {
        loop {
            let pending: Vec<SharedFetch> =
                self.inner.state.lock().in_flight.values().cloned().collect();
            if pending.is_empty() {
                return;
            }
            join_all(pending).await;
        }
    }

    fn enqueue(&self, id: &str) -> SharedFetch {
        let mut state = self.inner.state.lock();
        if let Some(pending) = state.in_flight.get(id) {
            return pending.clone();
        }

        let (tx, rx) = oneshot::channel();
        let weak = Arc::downgrade(&self.inner);
        let owned_id = id.to_owned();
        let fetch = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => {
                    // The flush task died before answering.
                    forget(&weak, &owned_id);
                    Err(FetchError::new("fetch abandoned before completion"))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(id.to_owned(), fetch.clone());
        state.queued.push((id.to_owned(), tx));
        if !state.flush_scheduled {
            state.flush_scheduled = true;
            tokio::spawn(flush(Arc::clone(&self.inner)));
        }
        fetch
    }
}

fn forget(inner: &Weak<Inner>, id: &str) {
    if let Some(inner) = inner.upgrade() {
        inner.state.lock().in_flight.remove(id);
    }
}

async fn flush(inner: Arc<Inner>) {
    if inner.window.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(inner.window).await;
    }

    let batch = {
        let mut state = inner.state.lock();
        state.flush_scheduled = false;
        std::mem::take(&mut state.queued)
    };
    if batch.is_empty() {
        return;
    }

    let span = tracing::debug_span!("fetch_batch", size = batch.len());
    let rows = fetch_batch(inner.fetcher.as_ref(), &batch)
        .instrument(span)
        .await
        .map_err(FetchError::from);

    if let Err(err) = &rows {
        tracing::warn!(size = batch.len(), error = %err, "batched fetch failed");
    }

    {
        let mut state = inner.state.lock();
        for (id, _) in &batch {
            state.in_flight.remove(id);
        }
    }
    for (id, tx) in batch {
        let result = match &rows {
            Ok(rows) => Ok(rows.get(&id).cloned()),
            Err(err) => Err(err.clone()),
        };
        // The requester may have stopped waiting.
        let _ = tx.send(result);
    }
}

async fn fetch_batch(
    fetcher: &dyn BatchFetcher,
    batch: &[(String, oneshot::Sender<FetchResult>)],
) -> anyhow::Result<HashMap<String, Value>> {
    if let [(id, _)] = batch {
        let row = fetcher.fetch_one(id).await?;
        return Ok(row.map(|row| (id.clone(), row)).into_iter().collect());
    }
    let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
    Ok(fetcher.fetch_many(&ids).await?.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
