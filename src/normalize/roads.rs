use hashbrown::HashMap;
use tracing::{debug, info};

use super::names::{alternate_name, resolve_name};
use crate::models::{LatLng, RoadClass, RoadSegment};
use crate::overpass::{OverpassResponse, WayElement};

/// Node ID to coordinate lookup built from the node elements of a response
pub(crate) fn node_index(response: &OverpassResponse) -> HashMap<i64, LatLng> {
    response
        .nodes()
        .filter_map(|node| match (node.lat, node.lon) {
            (Some(lat), Some(lon)) => Some((node.id, LatLng::new(lat, lon))),
            _ => None,
        })
        .filter(|(_, point)| point.is_finite())
        .collect()
}

/// Resolve a way's path: inline geometry if present, otherwise its node
/// references. Unresolvable points are skipped.
pub(crate) fn resolve_path(way: &WayElement, nodes: &HashMap<i64, LatLng>) -> Vec<LatLng> {
    if !way.geometry.is_empty() {
        return way
            .geometry
            .iter()
            .flatten()
            .map(|p| LatLng::new(p.lat, p.lon))
            .filter(LatLng::is_finite)
            .collect();
    }

    way.nodes
        .iter()
        .filter_map(|id| nodes.get(id).copied())
        .collect()
}

/// Convert a road-query response into road segments.
///
/// Only ways carrying a `highway` tag are considered, and any way whose
/// resolved path has fewer than two points is dropped.
pub fn normalize_roads(response: &OverpassResponse) -> Vec<RoadSegment> {
    let nodes = node_index(response);
    let mut roads = Vec::new();
    let mut dropped = 0usize;

    for way in response.ways() {
        let Some(highway) = way.tags.get("highway") else {
            continue;
        };

        let geometry = resolve_path(way, &nodes);
        if geometry.len() < 2 {
            debug!(
                "Dropping way {}: only {} resolvable points",
                way.id,
                geometry.len()
            );
            dropped += 1;
            continue;
        }

        let name = resolve_name(&way.tags);
        let alternate_name = alternate_name(&way.tags, name.as_deref());

        roads.push(RoadSegment {
            id: way.id,
            name,
            alternate_name,
            classification: RoadClass::from_highway(highway),
            geometry,
            raw_tags: way.tags.clone(),
        });
    }

    info!(
        "Normalized {} roads from {} nodes ({} dropped for missing geometry)",
        roads.len(),
        nodes.len(),
        dropped
    );

    roads
}
