//! A pipeline shared between concurrent callers.
//!
//! The pipeline lock is held only to claim, store or read. Network fetches
//! and the place settle delay run with the lock released, so search, zoom
//! and selection keep answering while a load is pending.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::{debug, error, info};

use crate::error::FetchError;
use crate::models::Category;
use crate::overpass::Transport;
use crate::pipeline::{LoadStatus, Pipeline, Selection};
use crate::search::SearchResults;
use crate::surface::MapSurface;

/// Handle to a shared [`Pipeline`]. Clones refer to the same pipeline.
pub struct Session<T, S> {
    pipeline: Arc<Mutex<Pipeline<T, S>>>,
    /// Woken whenever a fetch result has been stored
    settled: Arc<Notify>,
}

impl<T, S> Clone for Session<T, S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            settled: Arc::clone(&self.settled),
        }
    }
}

impl<T, S> Session<T, S>
where
    T: Transport + 'static,
    S: MapSurface + Send + 'static,
{
    pub fn new(pipeline: Pipeline<T, S>) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            settled: Arc::new(Notify::new()),
        }
    }

    /// Exclusive access to the pipeline. Keep the guard short-lived.
    pub async fn lock(&self) -> MutexGuard<'_, Pipeline<T, S>> {
        self.pipeline.lock().await
    }

    /// Lock the pipeline once `busy` no longer holds for it
    async fn lock_when_idle<F>(&self, busy: F) -> MutexGuard<'_, Pipeline<T, S>>
    where
        F: Fn(&Pipeline<T, S>) -> bool,
    {
        loop {
            let pipeline = self.pipeline.lock().await;
            if !busy(&pipeline) {
                return pipeline;
            }
            // registered before the lock is released so no store is missed
            let settled = self.settled.notified();
            drop(pipeline);
            settled.await;
        }
    }

    /// Load the road dataset with retry. A caller arriving while a load is
    /// pending waits for that load instead of starting another.
    pub async fn load_roads(&self) -> LoadStatus {
        let mut pipeline = self.pipeline.lock().await;
        if pipeline.roads_in_flight() {
            drop(pipeline);
            return self
                .lock_when_idle(|p| p.roads_in_flight())
                .await
                .status();
        }

        let query = pipeline.begin_roads();
        let fetcher = pipeline.fetcher();
        let retry = pipeline.retry_policy();
        drop(pipeline);

        let shared = Arc::clone(&self.pipeline);
        let settled = Arc::clone(&self.settled);
        // spawned so the result is stored even if this caller goes away
        let task = tokio::spawn(async move {
            let result = fetcher.fetch_with_retry(&query, &retry).await;
            let mut pipeline = shared.lock().await;
            let _ = pipeline.store_roads(result);
            settled.notify_waiters();
            pipeline.status()
        });

        match task.await {
            Ok(status) => status,
            Err(e) => {
                error!("Road load task stopped: {}", e);
                self.pipeline.lock().await.status()
            }
        }
    }

    /// Number of cached places for `category`, fetching them on a miss.
    /// At most one fetch per category is pending at a time; other callers
    /// wait for it.
    pub async fn get_or_fetch(&self, category: Category) -> Result<usize, FetchError> {
        let mut pipeline = self.lock_when_idle(|p| p.is_fetching(category)).await;
        let Some(query) = pipeline.claim_category(category) else {
            return Ok(pipeline.categories().get(category).map_or(0, <[_]>::len));
        };
        let fetcher = pipeline.fetcher();
        drop(pipeline);

        let shared = Arc::clone(&self.pipeline);
        let settled = Arc::clone(&self.settled);
        let task = tokio::spawn(async move {
            let result = fetcher.fetch(&query).await;
            let stored = shared.lock().await.store_category(category, result);
            settled.notify_waiters();
            stored
        });

        task.await
            .map_err(|e| FetchError::Interrupted(e.to_string()))?
    }

    /// Toggle a category's markers, fetching it first if needed.
    ///
    /// The pipeline is returned still locked so the caller can collect what
    /// the selection did to the surface before anyone else touches it.
    pub async fn select_category(
        &self,
        category: Category,
    ) -> Result<(Selection, MutexGuard<'_, Pipeline<T, S>>), FetchError> {
        {
            let mut pipeline = self.pipeline.lock().await;
            if let Some(cleared) = pipeline.deselect(category) {
                return Ok((cleared, pipeline));
            }
        }

        self.get_or_fetch(category).await?;

        let mut pipeline = self.pipeline.lock().await;
        let selection = pipeline.show_category(category);
        Ok((selection, pipeline))
    }

    /// Fetch every category not yet cached, starting each one a stagger
    /// after the previous. Returns the number of categories populated.
    pub async fn preload_all(&self) -> usize {
        let (stagger, missing) = {
            let pipeline = self.pipeline.lock().await;
            let missing: Vec<(usize, Category)> = Category::all()
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, category)| !pipeline.categories().is_cached(*category))
                .collect();
            (pipeline.config().preload.stagger(), missing)
        };

        let mut pending: FuturesUnordered<_> = missing
            .into_iter()
            .map(|(idx, category)| async move {
                tokio::time::sleep(stagger * idx as u32).await;
                self.get_or_fetch(category).await
            })
            .collect();

        let mut populated = 0;
        while let Some(result) = pending.next().await {
            if result.is_ok() {
                populated += 1;
            }
        }

        debug!("Preloaded {} categories", populated);
        populated
    }

    /// Load roads, then warm the category cache. Categories do not depend on
    /// the road dataset, so a failed road load does not skip the preload.
    pub async fn warm_up(&self, preload: bool) -> (LoadStatus, usize) {
        let status = self.load_roads().await;
        if let LoadStatus::Failed { .. } = status {
            error!("Road dataset unavailable: {}", status);
        }

        if !preload {
            return (status, 0);
        }
        let populated = self.preload_all().await;
        info!("Preloaded {} place categories", populated);
        (status, populated)
    }

    /// Search whatever is cached right now
    pub async fn search(&self, query: &str) -> SearchResults {
        self.pipeline.lock().await.search(query)
    }

    /// Fly to a cached place and open its popup after the settle delay,
    /// without holding the pipeline during the delay. Returns `false` if
    /// the place is not cached.
    pub async fn focus_place(&self, category: Category, id: i64) -> bool {
        let (place, delay) = {
            let mut pipeline = self.pipeline.lock().await;
            let Some(place) = pipeline.fly_to_place(category, id) else {
                return false;
            };
            (place, pipeline.popup_delay())
        };

        tokio::time::sleep(delay).await;
        self.pipeline.lock().await.open_place_popup(&place);
        true
    }
}
