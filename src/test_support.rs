//! Test doubles for the service transport and the map surface.
//!
//! [`ScriptedTransport`] answers queries from per-endpoint scripts without
//! touching the network; [`RecordingSurface`] records every map command and
//! keeps the resulting visual state for assertions.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::EndpointFailure;
use crate::labels::{LabelTier, StreetLabel};
use crate::models::{Bounds, Category, LatLng, PathStyle, PointOfInterest, RoadClass, RoadSegment};
use crate::overpass::{Element, NodeElement, OverpassResponse, Transport, WayElement};
use crate::popup::Popup;
use crate::surface::{FitOptions, MapSurface};

type Outcome = Result<OverpassResponse, EndpointFailure>;

#[derive(Debug)]
struct Rule {
    endpoint: String,
    /// Only queries containing this text match
    pattern: Option<String>,
    outcome: Outcome,
    once: bool,
    /// How long the answer takes to arrive
    delay: Duration,
}

#[derive(Debug, Default)]
struct Script {
    rules: Vec<Rule>,
    calls: Vec<(String, String)>,
}

/// Scripted `Transport`. Clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, endpoint: &str, pattern: Option<&str>, outcome: Outcome, once: bool) {
        self.script().rules.push(Rule {
            endpoint: endpoint.to_string(),
            pattern: pattern.map(str::to_string),
            outcome,
            once,
            delay: Duration::ZERO,
        });
    }

    pub fn succeed(&self, endpoint: &str, response: OverpassResponse) {
        self.push(endpoint, None, Ok(response), false);
    }

    /// Answer only queries containing `pattern`
    pub fn succeed_matching(&self, endpoint: &str, pattern: &str, response: OverpassResponse) {
        self.push(endpoint, Some(pattern), Ok(response), false);
    }

    /// Answer every query after `delay`, like a slow server
    pub fn succeed_after(&self, endpoint: &str, delay: Duration, response: OverpassResponse) {
        self.script().rules.push(Rule {
            endpoint: endpoint.to_string(),
            pattern: None,
            outcome: Ok(response),
            once: false,
            delay,
        });
    }

    pub fn fail_status(&self, endpoint: &str, status: u16) {
        self.push(endpoint, None, Err(status_failure(endpoint, status)), false);
    }

    /// Fail the next matching call only
    pub fn fail_status_once(&self, endpoint: &str, status: u16) {
        self.push(endpoint, None, Err(status_failure(endpoint, status)), true);
    }

    pub fn fail_matching(&self, endpoint: &str, pattern: &str, status: u16) {
        self.push(
            endpoint,
            Some(pattern),
            Err(status_failure(endpoint, status)),
            false,
        );
    }

    pub fn fail_transport(&self, endpoint: &str, message: &str) {
        let failure = EndpointFailure::Transport {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        };
        self.push(endpoint, None, Err(failure), false);
    }

    /// Every `(endpoint, query)` executed so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.script().calls.clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }

    /// Number of calls whose query contains `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|(_, q)| q.contains(pattern))
            .count()
    }
}

fn status_failure(endpoint: &str, status: u16) -> EndpointFailure {
    EndpointFailure::Status {
        endpoint: endpoint.to_string(),
        status,
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, endpoint: &str, query: &str) -> Outcome {
        let (outcome, delay) = {
            let mut script = self.script();
            script.calls.push((endpoint.to_string(), query.to_string()));

            let applies = |rule: &Rule| {
                rule.endpoint == endpoint
                    && rule
                        .pattern
                        .as_deref()
                        .map_or(true, |pattern| query.contains(pattern))
            };

            if let Some(pos) = script.rules.iter().position(|r| r.once && applies(r)) {
                let rule = script.rules.remove(pos);
                (rule.outcome, rule.delay)
            } else {
                script
                    .rules
                    .iter()
                    .find(|r| applies(r))
                    .map(|r| (r.outcome.clone(), r.delay))
                    .unwrap_or_else(|| {
                        let failure = EndpointFailure::Transport {
                            endpoint: endpoint.to_string(),
                            message: "no scripted response".to_string(),
                        };
                        (Err(failure), Duration::ZERO)
                    })
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

/// One command issued to a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    DrawRoad { id: i64, style: PathStyle },
    ClearRoads,
    SetRoadStyle { id: i64, style: PathStyle },
    RaiseRoad(i64),
    ShowPlaces { category: Category, count: usize },
    ClearPlaces,
    AttachLabels { tier: LabelTier, count: usize },
    DetachLabels(LabelTier),
    FitBounds { bounds: Bounds, options: FitOptions },
    FlyTo {
        center: LatLng,
        zoom: u8,
        duration: Duration,
    },
    OpenPopup(Popup),
}

/// Where the viewport was last sent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Viewport {
    Fit(Bounds, FitOptions),
    Center(LatLng, u8),
}

/// `MapSurface` that records commands and tracks the resulting state
#[derive(Debug, Default)]
pub struct RecordingSurface {
    zoom: u8,
    calls: Vec<SurfaceCall>,
    styles: BTreeMap<i64, PathStyle>,
    raised: Vec<i64>,
    attached: Vec<LabelTier>,
    markers: Option<(Category, usize)>,
    viewport: Option<Viewport>,
}

impl RecordingSurface {
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn style_of(&self, road_id: i64) -> Option<&PathStyle> {
        self.styles.get(&road_id)
    }

    pub fn styles(&self) -> &BTreeMap<i64, PathStyle> {
        &self.styles
    }

    /// Roads in the order they were raised
    pub fn raised(&self) -> &[i64] {
        &self.raised
    }

    pub fn attached_tiers(&self) -> &[LabelTier] {
        &self.attached
    }

    pub fn markers(&self) -> Option<(Category, usize)> {
        self.markers
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }
}

impl MapSurface for RecordingSurface {
    fn draw_road(&mut self, road: &RoadSegment, style: &PathStyle) {
        self.styles.insert(road.id, style.clone());
        self.calls.push(SurfaceCall::DrawRoad {
            id: road.id,
            style: style.clone(),
        });
    }

    fn clear_roads(&mut self) {
        self.styles.clear();
        self.raised.clear();
        self.calls.push(SurfaceCall::ClearRoads);
    }

    fn set_road_style(&mut self, road_id: i64, style: &PathStyle) {
        self.styles.insert(road_id, style.clone());
        self.calls.push(SurfaceCall::SetRoadStyle {
            id: road_id,
            style: style.clone(),
        });
    }

    fn raise_road(&mut self, road_id: i64) {
        self.raised.push(road_id);
        self.calls.push(SurfaceCall::RaiseRoad(road_id));
    }

    fn show_places(&mut self, category: Category, places: &[PointOfInterest]) {
        self.markers = Some((category, places.len()));
        self.calls.push(SurfaceCall::ShowPlaces {
            category,
            count: places.len(),
        });
    }

    fn clear_places(&mut self) {
        self.markers = None;
        self.calls.push(SurfaceCall::ClearPlaces);
    }

    fn attach_labels(&mut self, tier: LabelTier, labels: &[StreetLabel]) {
        if !self.attached.contains(&tier) {
            self.attached.push(tier);
        }
        self.calls.push(SurfaceCall::AttachLabels {
            tier,
            count: labels.len(),
        });
    }

    fn detach_labels(&mut self, tier: LabelTier) {
        self.attached.retain(|t| *t != tier);
        self.calls.push(SurfaceCall::DetachLabels(tier));
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) {
        self.viewport = Some(Viewport::Fit(bounds, options));
        self.calls.push(SurfaceCall::FitBounds { bounds, options });
    }

    fn fly_to(&mut self, center: LatLng, zoom: u8, duration: Duration) {
        self.viewport = Some(Viewport::Center(center, zoom));
        self.zoom = zoom;
        self.calls.push(SurfaceCall::FlyTo {
            center,
            zoom,
            duration,
        });
    }

    fn open_popup(&mut self, popup: &Popup) {
        self.calls.push(SurfaceCall::OpenPopup(popup.clone()));
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }
}

/// A two-point road at a position derived from its id
pub fn road(id: i64, name: Option<&str>, class: RoadClass) -> RoadSegment {
    let offset = id as f64 * 0.001;
    let mut raw_tags = HashMap::new();
    raw_tags.insert("highway".to_string(), class.as_str().to_string());
    if let Some(name) = name {
        raw_tags.insert("name".to_string(), name.to_string());
    }

    RoadSegment {
        id,
        name: name.map(str::to_string),
        alternate_name: None,
        classification: class,
        geometry: vec![
            LatLng::new(9.55 + offset, 44.05),
            LatLng::new(9.55 + offset, 44.06),
        ],
        raw_tags,
    }
}

/// A named place whose tags satisfy the category's first rule
pub fn poi(id: i64, name: &str, category: Category) -> PointOfInterest {
    let rule = category.rules()[0];
    let mut raw_tags = HashMap::new();
    raw_tags.insert(
        rule.key.to_string(),
        rule.value.unwrap_or("yes").to_string(),
    );
    raw_tags.insert("name".to_string(), name.to_string());

    PointOfInterest {
        id,
        name: Some(name.to_string()),
        category,
        coordinate: LatLng::new(9.56, 44.06 + id as f64 * 0.001),
        raw_tags,
    }
}

/// A response holding `count` untagged nodes
pub fn sample_response(count: i64) -> OverpassResponse {
    OverpassResponse {
        elements: (1..=count)
            .map(|id| {
                Element::Node(NodeElement {
                    id,
                    lat: Some(9.5),
                    lon: Some(44.0),
                    tags: HashMap::new(),
                })
            })
            .collect(),
    }
}

/// Encode roads the way the road query returns them: ways referencing
/// nodes, followed by the nodes.
pub fn roads_response(roads: &[RoadSegment]) -> OverpassResponse {
    let mut ways = Vec::new();
    let mut nodes = Vec::new();
    let mut next_node = 1_000_000;

    for road in roads {
        let mut refs = Vec::new();
        for point in &road.geometry {
            next_node += 1;
            refs.push(next_node);
            nodes.push(Element::Node(NodeElement {
                id: next_node,
                lat: Some(point.lat),
                lon: Some(point.lng),
                tags: HashMap::new(),
            }));
        }
        ways.push(Element::Way(WayElement {
            id: road.id,
            nodes: refs,
            geometry: Vec::new(),
            center: None,
            tags: road.raw_tags.clone(),
        }));
    }

    ways.extend(nodes);
    OverpassResponse { elements: ways }
}

/// Encode places as tagged nodes
pub fn places_response(places: &[PointOfInterest]) -> OverpassResponse {
    OverpassResponse {
        elements: places
            .iter()
            .map(|p| {
                Element::Node(NodeElement {
                    id: p.id,
                    lat: Some(p.coordinate.lat),
                    lon: Some(p.coordinate.lng),
                    tags: p.raw_tags.clone(),
                })
            })
            .collect(),
    }
}
