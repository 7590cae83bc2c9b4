//! Coordinate and bounding box types shared by roads, places and the map surface.

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

/// Geographic point (lat/lng)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<LatLng> for Coord<f64> {
    fn from(point: LatLng) -> Self {
        Coord {
            x: point.lng,
            y: point.lat,
        }
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lng: coord.x,
        }
    }
}

/// Axis-aligned bounding box in south/west/north/east order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Bounding box of a coordinate path, or `None` for an empty path.
    pub fn from_path(path: &[LatLng]) -> Option<Self> {
        let line: LineString<f64> = path.iter().map(|p| Coord::from(*p)).collect();
        line.bounding_rect().map(|rect| Self {
            south: rect.min().y,
            west: rect.min().x,
            north: rect.max().y,
            east: rect.max().x,
        })
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    /// Render as an Overpass bbox filter: `south,west,north,east`
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_path() {
        let path = vec![
            LatLng::new(9.56, 44.06),
            LatLng::new(9.55, 44.08),
            LatLng::new(9.57, 44.07),
        ];

        let bounds = Bounds::from_path(&path).unwrap();
        assert_eq!(bounds.south, 9.55);
        assert_eq!(bounds.north, 9.57);
        assert_eq!(bounds.west, 44.06);
        assert_eq!(bounds.east, 44.08);
    }

    #[test]
    fn test_bounds_from_empty_path() {
        assert!(Bounds::from_path(&[]).is_none());
    }

    #[test]
    fn test_overpass_bbox_format() {
        let bounds = Bounds::new(9.5, 43.99, 9.62, 44.13);
        assert_eq!(bounds.to_overpass(), "9.5,43.99,9.62,44.13");
    }
}
