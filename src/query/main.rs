//! Map data server.
//!
//! Loads the district's roads and places through the pipeline and exposes
//! search, category selection, focus and label visibility over HTTP for the
//! browser map. Each mutating endpoint returns the map commands it produced.
//! `/v1/search/live` is a WebSocket for search-as-you-type.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use acacia::debounce::SearchDebouncer;
use acacia::labels::{LabelTier, StreetLabel};
use acacia::models::{Bounds, LatLng, PathStyle};
use acacia::overpass::HttpTransport;
use acacia::search::SearchResults;
use acacia::{Category, Config, FetchError, LoadStatus, Pipeline, Selection, Session};

mod surface;
use surface::{CommandSurface, SurfaceCommand};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Street map data server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Zoom level the client starts at
    #[arg(long, default_value = "14")]
    zoom: u8,

    /// Skip background preloading of place categories
    #[arg(long)]
    no_preload: bool,
}

type MapSession = Session<HttpTransport, CommandSurface>;

/// Application state shared across handlers
struct AppState {
    session: MapSession,
    /// Quiet period before a live search runs
    debounce: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    info!("Acacia Query Server");
    info!("Endpoints: {}", config.service.endpoints.join(", "));

    let debounce = config.search.debounce();
    let transport =
        HttpTransport::new(&config.service).context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new(config, transport, CommandSurface::new(args.zoom));

    let state = Arc::new(AppState {
        session: Session::new(pipeline),
        debounce,
    });

    tokio::spawn(load_in_background(state.session.clone(), !args.no_preload));

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/roads", get(roads_handler))
        .route("/v1/search", get(search_handler))
        .route("/v1/search/live", get(live_search_handler))
        .route("/v1/categories", get(categories_handler))
        .route("/v1/categories/{category}", post(select_category_handler))
        .route("/v1/roads/{id}/focus", post(focus_road_handler))
        .route("/v1/places/{category}/{id}/focus", post(focus_place_handler))
        .route("/v1/labels", get(labels_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load roads, then warm the category cache
async fn load_in_background(session: MapSession, preload: bool) {
    let (status, _) = session.warm_up(preload).await;

    // clients pick up roads from /v1/roads and labels from /v1/labels
    let mut pipeline = session.lock().await;
    pipeline.surface_mut().drain();
    info!("{} ({} roads drawn)", status, pipeline.surface().drawn_roads());
}

type ApiError = (StatusCode, String);

fn fetch_error(e: FetchError) -> ApiError {
    warn!("Fetch failed: {}", e);
    (StatusCode::BAD_GATEWAY, e.to_string())
}

fn parse_category(key: &str) -> Result<Category, ApiError> {
    Category::from_key(key)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown category: {}", key)))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    roads: LoadStatus,
    message: String,
    categories: Vec<Category>,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pipeline = state.session.lock().await;

    let roads = pipeline.status();
    Json(HealthResponse {
        status: match roads {
            LoadStatus::Loaded { .. } => "ok",
            LoadStatus::Loading => "loading",
            LoadStatus::Failed { .. } => "degraded",
        },
        roads,
        message: roads.to_string(),
        categories: pipeline.categories().populated().collect(),
    })
}

#[derive(Serialize)]
struct RoadFeature {
    id: i64,
    name: Option<String>,
    type_label: String,
    geometry: Vec<LatLng>,
    style: PathStyle,
}

#[derive(Serialize)]
struct RoadsResponse {
    status: LoadStatus,
    message: String,
    roads: Vec<RoadFeature>,
}

/// Every cached road with its current base style
async fn roads_handler(State(state): State<Arc<AppState>>) -> Json<RoadsResponse> {
    let pipeline = state.session.lock().await;
    let highlighted = pipeline.highlighted_road();

    let roads = pipeline
        .roads()
        .roads()
        .iter()
        .map(|road| RoadFeature {
            id: road.id,
            name: road.name.clone(),
            type_label: road.type_label(),
            geometry: road.geometry.clone(),
            style: if highlighted == Some(road.id) {
                PathStyle::highlight()
            } else {
                road.style().path_style()
            },
        })
        .collect();

    Json(RoadsResponse {
        status: pipeline.status(),
        message: pipeline.status().to_string(),
        roads,
    })
}

#[derive(Deserialize)]
struct SearchQueryParams {
    /// Search text
    text: String,
}

/// Display text split around the matched part
#[derive(Serialize)]
struct Highlighted {
    before: String,
    matched: String,
    after: String,
}

#[derive(Serialize)]
struct PlaceResult {
    id: i64,
    name: Highlighted,
    category: Category,
    icon: &'static str,
    coordinate: LatLng,
}

#[derive(Serialize)]
struct RoadResult {
    id: i64,
    name: Highlighted,
    type_label: String,
}

#[derive(Serialize)]
struct SearchResponse {
    places: Vec<PlaceResult>,
    roads: Vec<RoadResult>,
    /// Shown when nothing matched
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

fn highlighted(text: &str, span: acacia::search::MatchSpan) -> Highlighted {
    let (before, matched, after) = span.split(text);
    Highlighted {
        before: before.to_string(),
        matched: matched.to_string(),
        after: after.to_string(),
    }
}

fn search_response(results: SearchResults) -> SearchResponse {
    let message = results.is_empty().then_some("No streets found");
    SearchResponse {
        places: results
            .places
            .into_iter()
            .map(|hit| PlaceResult {
                id: hit.id,
                name: highlighted(&hit.name, hit.span),
                category: hit.category,
                icon: hit.category.icon(),
                coordinate: hit.coordinate,
            })
            .collect(),
        roads: results
            .roads
            .into_iter()
            .map(|hit| RoadResult {
                id: hit.id,
                name: highlighted(&hit.name, hit.span),
                type_label: hit.type_label,
            })
            .collect(),
        message,
    }
}

/// Combined road and place search over whatever is cached
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Json<SearchResponse> {
    Json(search_response(state.session.search(&params.text).await))
}

#[derive(Serialize)]
struct LiveSearchResponse {
    /// The text these results answer, so the client can drop stale ones
    query: String,
    #[serde(flatten)]
    results: SearchResponse,
}

/// Search-as-you-type: each text frame is a query, answered once typing
/// has paused for the configured debounce.
async fn live_search_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| live_search(socket, state))
}

async fn live_search(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<LiveSearchResponse>(8);
    let mut debouncer = SearchDebouncer::new(state.debounce);

    let writer = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let text = match serde_json::to_string(&response) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode search results: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                let query = text.as_str().to_string();
                let session = state.session.clone();
                let tx = tx.clone();
                debouncer.schedule(async move {
                    let results = search_response(session.search(&query).await);
                    let response = LiveSearchResponse { query, results };
                    if tx.send(response).await.is_err() {
                        debug!("Live search client went away");
                    }
                });
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    debouncer.cancel();
    drop(tx);
    if let Err(e) = writer.await {
        warn!("Live search writer stopped: {}", e);
    }
}

#[derive(Serialize)]
struct CategoryInfo {
    key: &'static str,
    label: &'static str,
    color: &'static str,
    icon: &'static str,
    /// Number of cached places, absent until fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    active: bool,
}

/// The category catalogue with cache state
async fn categories_handler(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryInfo>> {
    let pipeline = state.session.lock().await;

    Json(
        Category::all()
            .iter()
            .map(|&category| CategoryInfo {
                key: category.key(),
                label: category.label(),
                color: category.color(),
                icon: category.icon(),
                count: pipeline.categories().get(category).map(<[_]>::len),
                active: pipeline.active_category() == Some(category),
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct SelectResponse {
    selection: Selection,
    commands: Vec<SurfaceCommand>,
}

/// Toggle a category's markers
async fn select_category_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SelectResponse>, ApiError> {
    let category = parse_category(&key)?;

    let (selection, mut pipeline) = state
        .session
        .select_category(category)
        .await
        .map_err(fetch_error)?;

    Ok(Json(SelectResponse {
        selection,
        commands: pipeline.surface_mut().drain(),
    }))
}

#[derive(Serialize)]
struct FocusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<Bounds>,
    commands: Vec<SurfaceCommand>,
}

async fn focus_road_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<FocusResponse>, ApiError> {
    let mut pipeline = state.session.lock().await;

    let bounds = pipeline
        .focus_road(id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown road: {}", id)))?;

    Ok(Json(FocusResponse {
        bounds: Some(bounds),
        commands: pipeline.surface_mut().drain(),
    }))
}

async fn focus_place_handler(
    State(state): State<Arc<AppState>>,
    Path((key, id)): Path<(String, i64)>,
) -> Result<Json<FocusResponse>, ApiError> {
    let category = parse_category(&key)?;

    let (place, delay, mut commands) = {
        let mut pipeline = state.session.lock().await;
        let place = pipeline.fly_to_place(category, id).ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("Unknown {} place: {}", category, id),
            )
        })?;
        (place, pipeline.popup_delay(), pipeline.surface_mut().drain())
    };

    // the popup opens once the fly-to has settled
    tokio::time::sleep(delay).await;

    let mut pipeline = state.session.lock().await;
    pipeline.open_place_popup(&place);
    commands.extend(pipeline.surface_mut().drain());

    Ok(Json(FocusResponse {
        bounds: None,
        commands,
    }))
}

#[derive(Deserialize)]
struct LabelsQueryParams {
    zoom: u8,
}

#[derive(Serialize)]
struct LabelsResponse {
    zoom: u8,
    /// Every label in the tiers attached at `zoom`
    visible: Vec<StreetLabel>,
    commands: Vec<SurfaceCommand>,
}

/// Zoom-changed event from the client
async fn labels_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LabelsQueryParams>,
) -> Json<LabelsResponse> {
    let mut pipeline = state.session.lock().await;

    pipeline.surface_mut().set_zoom(params.zoom);
    pipeline.on_zoom_changed(params.zoom);

    let labels = pipeline.labels();
    let visible = LabelTier::all()
        .iter()
        .filter(|&&tier| labels.is_attached(tier))
        .flat_map(|&tier| labels.labels(tier).iter().cloned())
        .collect();

    Json(LabelsResponse {
        zoom: params.zoom,
        visible,
        commands: pipeline.surface_mut().drain(),
    })
}
