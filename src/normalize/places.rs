use geo::{Centroid, MultiPoint, Point};
use tracing::{debug, info};

use super::names::resolve_name;
use super::roads::{node_index, resolve_path};
use crate::models::{Category, LatLng, PointOfInterest};
use crate::overpass::OverpassResponse;

/// Convert a category-query response into places filed under `category`.
///
/// Nodes use their own coordinate; ways use the service-provided center,
/// falling back to the centroid of whatever path can be resolved.
pub fn normalize_places(response: &OverpassResponse, category: Category) -> Vec<PointOfInterest> {
    let nodes = node_index(response);
    let mut places = Vec::new();
    let mut skipped = 0usize;

    let candidates = response
        .nodes()
        .filter(|node| !node.tags.is_empty())
        .map(|node| {
            let coordinate = match (node.lat, node.lon) {
                (Some(lat), Some(lon)) => Some(LatLng::new(lat, lon)),
                _ => None,
            };
            (node.id, &node.tags, coordinate)
        })
        .chain(response.ways().map(|way| {
            let coordinate = match way.center {
                Some(center) => Some(LatLng::new(center.lat, center.lon)),
                None => centroid(&resolve_path(way, &nodes)),
            };
            (way.id, &way.tags, coordinate)
        }));

    for (id, tags, coordinate) in candidates {
        let Some(coordinate) = coordinate.filter(LatLng::is_finite) else {
            debug!("Skipping {} element {}: no geometry", category, id);
            skipped += 1;
            continue;
        };

        if category.matching_rule(tags).is_none() {
            debug!("Skipping element {}: tags do not match {}", id, category);
            skipped += 1;
            continue;
        }

        places.push(PointOfInterest {
            id,
            name: resolve_name(tags),
            category,
            coordinate,
            raw_tags: tags.clone(),
        });
    }

    info!(
        "Normalized {} {} ({} skipped)",
        places.len(),
        category.label().to_lowercase(),
        skipped
    );

    places
}

fn centroid(path: &[LatLng]) -> Option<LatLng> {
    let points: MultiPoint<f64> = path
        .iter()
        .map(|p| Point::new(p.lng, p.lat))
        .collect::<Vec<_>>()
        .into();
    points.centroid().map(|c| LatLng::new(c.y(), c.x()))
}
