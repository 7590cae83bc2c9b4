//! The session context tying fetcher, caches, labels, search and focus
//! together around one map surface.

use futures::stream::{FuturesUnordered, StreamExt};
use hashbrown::HashSet;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cache::{CategoryCache, RoadCache};
use crate::config::Config;
use crate::error::FetchError;
use crate::focus::{FocusController, FocusSettings};
use crate::labels::{LabelTierManager, RenderSummary, TierThresholds};
use crate::models::{Bounds, Category, PointOfInterest, RoadSegment};
use crate::normalize::{normalize_places, normalize_roads};
use crate::overpass::query::{category_query, road_query};
use crate::overpass::{EndpointFetcher, OverpassResponse, RetryPolicy, Transport};
use crate::search::{SearchIndex, SearchLimits, SearchResults};
use crate::surface::MapSurface;

/// State of the road dataset as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Loaded { named: usize, total: usize },
    /// Terminal for the session; nothing retries automatically
    Failed { attempts: u32 },
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loading => write!(f, "Loading street data..."),
            LoadStatus::Loaded { named, total } => {
                write!(f, "{} named streets / {} total roads", named, total)
            }
            LoadStatus::Failed { attempts } => write!(
                f,
                "Failed to load street data after {} attempts. Please refresh the page.",
                attempts
            ),
        }
    }
}

/// What selecting a category did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Selection {
    /// Markers for the category are shown
    Shown { category: Category, count: usize },
    /// The category was already active and has been cleared
    Cleared { category: Category },
}

/// One map session.
///
/// Owns every cache and drives the [`MapSurface`]. Fetching is split from
/// storing: [`begin_roads`](Self::begin_roads) and
/// [`claim_category`](Self::claim_category) hand out the query to run against
/// the shared [`fetcher`](Self::fetcher), and the `store_*` methods take the
/// result back. The async methods here chain both halves for a single owner;
/// [`Session`](crate::session::Session) runs the fetch without holding the
/// pipeline.
pub struct Pipeline<T, S> {
    config: Config,
    fetcher: Arc<EndpointFetcher<T>>,
    retry: RetryPolicy,
    roads: RoadCache,
    categories: CategoryCache,
    /// Categories with a fetch issued and not yet stored
    fetching: HashSet<Category>,
    roads_in_flight: bool,
    labels: LabelTierManager,
    focus: FocusController,
    active: Option<Category>,
    status: LoadStatus,
    surface: S,
}

impl<T: Transport, S: MapSurface> Pipeline<T, S> {
    pub fn new(config: Config, transport: T, surface: S) -> Self {
        let fetcher = EndpointFetcher::new(transport, config.service.endpoints.clone());

        Self {
            retry: RetryPolicy::from(&config.retry),
            labels: LabelTierManager::new(TierThresholds::from(&config.labels)),
            focus: FocusController::new(FocusSettings::from(&config.focus)),
            fetcher: Arc::new(fetcher),
            roads: RoadCache::new(),
            categories: CategoryCache::new(),
            fetching: HashSet::new(),
            roads_in_flight: false,
            active: None,
            status: LoadStatus::Loading,
            surface,
            config,
        }
    }

    /// Fetch, normalize and draw the road dataset, replacing any cached one.
    ///
    /// The fetch is retried per the configured policy. On terminal failure the
    /// status becomes [`LoadStatus::Failed`] and stays there.
    pub async fn load_roads(&mut self) -> Result<RenderSummary, FetchError> {
        let query = self.begin_roads();
        let result = self.fetcher.fetch_with_retry(&query, &self.retry).await;
        self.store_roads(result)
    }

    /// Mark the road dataset as loading and return the query to run
    pub fn begin_roads(&mut self) -> String {
        self.status = LoadStatus::Loading;
        self.roads_in_flight = true;
        road_query(&self.config.area.roads)
    }

    pub fn roads_in_flight(&self) -> bool {
        self.roads_in_flight
    }

    /// Take the result of a road fetch. A success replaces the drawn roads,
    /// their labels and any highlight; a failure is terminal.
    pub fn store_roads(
        &mut self,
        result: Result<OverpassResponse, FetchError>,
    ) -> Result<RenderSummary, FetchError> {
        self.roads_in_flight = false;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                error!("Failed to load street data: {}", err);
                self.status = LoadStatus::Failed {
                    attempts: err.attempts(),
                };
                return Err(err);
            }
        };

        let roads = normalize_roads(&response);
        self.surface.clear_roads();
        self.focus.reset();
        for road in &roads {
            self.surface.draw_road(road, &road.style().path_style());
        }

        let summary = self.labels.render(&roads, &mut self.surface);
        self.labels
            .update_visibility(self.surface.zoom(), &mut self.surface);
        self.roads.set(roads);

        self.status = LoadStatus::Loaded {
            named: summary.named,
            total: summary.total,
        };
        info!("{}", self.status);
        Ok(summary)
    }

    /// Cached roads, loading them first if needed
    pub async fn get_or_fetch_roads(&mut self) -> Result<&[RoadSegment], FetchError> {
        if self.roads.get().is_none() {
            self.load_roads().await?;
        }
        Ok(self.roads.roads())
    }

    /// Cached places for `category`, fetching them on a miss.
    ///
    /// A category fetch makes a single pass over the endpoints. On failure
    /// the category stays unpopulated until it is requested again.
    pub async fn get_or_fetch(
        &mut self,
        category: Category,
    ) -> Result<&[PointOfInterest], FetchError> {
        if let Some(query) = self.claim_category(category) {
            let result = self.fetcher.fetch(&query).await;
            self.store_category(category, result)?;
        }

        Ok(self.categories.get(category).unwrap_or(&[]))
    }

    /// Reserve a fetch of `category`. Returns the query to run, or `None`
    /// when the category is cached or another fetch of it is pending.
    pub fn claim_category(&mut self, category: Category) -> Option<String> {
        if self.categories.is_cached(category) || !self.fetching.insert(category) {
            return None;
        }
        Some(category_query(category, &self.config.area.places))
    }

    pub fn is_fetching(&self, category: Category) -> bool {
        self.fetching.contains(&category)
    }

    /// Take the result of a claimed category fetch. Returns the number of
    /// places stored.
    pub fn store_category(
        &mut self,
        category: Category,
        result: Result<OverpassResponse, FetchError>,
    ) -> Result<usize, FetchError> {
        self.fetching.remove(&category);

        match result {
            Ok(response) => {
                let places = normalize_places(&response, category);
                let count = places.len();
                info!("Loaded {} {}", count, category);
                self.categories.insert(category, places);
                Ok(count)
            }
            Err(err) => {
                warn!("Failed to load {}: {}", category, err);
                Err(err)
            }
        }
    }

    /// Toggle a category's markers.
    ///
    /// Selecting the active category clears the markers; selecting any other
    /// one loads it and replaces the markers. A failed load leaves the
    /// current selection untouched.
    pub async fn select_category(&mut self, category: Category) -> Result<Selection, FetchError> {
        if let Some(cleared) = self.deselect(category) {
            return Ok(cleared);
        }

        self.get_or_fetch(category).await?;
        Ok(self.show_category(category))
    }

    /// Clear the markers if `category` is the active one
    pub fn deselect(&mut self, category: Category) -> Option<Selection> {
        if self.active != Some(category) {
            return None;
        }
        self.surface.clear_places();
        self.active = None;
        Some(Selection::Cleared { category })
    }

    /// Replace the markers with the cached places of `category`
    pub fn show_category(&mut self, category: Category) -> Selection {
        let places = self.categories.get(category).unwrap_or(&[]);

        self.surface.clear_places();
        self.surface.show_places(category, places);
        self.active = Some(category);

        Selection::Shown {
            category,
            count: places.len(),
        }
    }

    /// Fetch every category not yet cached, starting each one `stagger`
    /// after the previous. Results are stored as they arrive; failures are
    /// logged and skipped. Returns the number of categories populated.
    pub async fn preload_all(&mut self) -> usize {
        let stagger = self.config.preload.stagger();
        let claimed: Vec<(usize, Category, String)> = Category::all()
            .iter()
            .copied()
            .enumerate()
            .filter_map(|(idx, category)| {
                self.claim_category(category)
                    .map(|query| (idx, category, query))
            })
            .collect();

        let fetcher = Arc::clone(&self.fetcher);
        let fetcher = &fetcher;
        let mut pending: FuturesUnordered<_> = claimed
            .into_iter()
            .map(|(idx, category, query)| async move {
                tokio::time::sleep(stagger * idx as u32).await;
                (category, fetcher.fetch(&query).await)
            })
            .collect();

        let mut populated = 0;
        while let Some((category, result)) = pending.next().await {
            if self.store_category(category, result).is_ok() {
                populated += 1;
            }
        }

        debug!("Preloaded {} categories", populated);
        populated
    }

    /// Search cached roads and places. Never fetches.
    pub fn search(&self, query: &str) -> SearchResults {
        SearchIndex::new(
            self.roads.roads(),
            &self.categories,
            SearchLimits::from(&self.config.search),
        )
        .search(query)
    }

    /// Forward a zoom-changed event from the map
    pub fn on_zoom_changed(&mut self, zoom: u8) {
        self.labels.update_visibility(zoom, &mut self.surface);
    }

    /// Highlight a road and fit the viewport to it. Unknown ids are ignored.
    pub fn focus_road(&mut self, id: i64) -> Option<Bounds> {
        self.focus
            .focus_road(self.roads.roads(), id, &mut self.surface)
    }

    /// Fly to a cached place and open its popup. Returns `false` if the
    /// place is not cached.
    pub async fn focus_place(&mut self, category: Category, id: i64) -> bool {
        let Some(place) = self.fly_to_place(category, id) else {
            return false;
        };

        tokio::time::sleep(self.popup_delay()).await;
        self.open_place_popup(&place);
        true
    }

    /// First half of a place focus: start the fly-to. Returns the place
    /// whose popup should open once [`popup_delay`](Self::popup_delay) has
    /// passed.
    pub fn fly_to_place(&mut self, category: Category, id: i64) -> Option<PointOfInterest> {
        let Some(place) = self.categories.find(category, id) else {
            debug!("No cached {} place {}", category, id);
            return None;
        };

        self.focus.fly_to_place(place, &mut self.surface);
        Some(place.clone())
    }

    pub fn open_place_popup(&mut self, place: &PointOfInterest) {
        self.focus.open_place_popup(place, &mut self.surface);
    }

    /// How long a fly-to takes to settle
    pub fn popup_delay(&self) -> Duration {
        self.focus.settings().popup_delay
    }

    /// Drop the road dataset; the next [`get_or_fetch_roads`](Self::get_or_fetch_roads) refetches
    pub fn invalidate_roads(&mut self) {
        self.roads.invalidate();
    }

    pub fn invalidate_category(&mut self, category: Category) {
        self.categories.invalidate(category);
    }

    /// The fetcher shared with fetches running outside the pipeline
    pub fn fetcher(&self) -> Arc<EndpointFetcher<T>> {
        Arc::clone(&self.fetcher)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn active_category(&self) -> Option<Category> {
        self.active
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn roads(&self) -> &RoadCache {
        &self.roads
    }

    pub fn categories(&self) -> &CategoryCache {
        &self.categories
    }

    pub fn labels(&self) -> &LabelTierManager {
        &self.labels
    }

    pub fn highlighted_road(&self) -> Option<i64> {
        self.focus.highlighted()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
