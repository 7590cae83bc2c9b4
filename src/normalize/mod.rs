//! Conversion of raw Overpass elements into roads and places.

pub mod names;
mod places;
mod roads;

pub use names::{alternate_name, resolve_name, NAME_KEYS};
pub use places::normalize_places;
pub use roads::normalize_roads;
