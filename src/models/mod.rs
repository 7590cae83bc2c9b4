//! Core data models for roads and places.

pub mod coords;
pub mod place;
pub mod road;

pub use coords::{Bounds, LatLng};
pub use place::{Category, PointOfInterest, TagRule};
pub use road::{PathStyle, RoadClass, RoadSegment, RoadStyle, DEFAULT_ROAD_OPACITY};
