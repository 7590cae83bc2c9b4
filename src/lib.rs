//! Acacia - street and place map data for a single city district
//!
//! This library fetches road and point-of-interest geometry from Overpass
//! endpoints, normalizes and caches it, and drives a map surface: zoom-tiered
//! street labels, combined road/place search, and road/place focus. It is
//! shared by the `query` server and the `snapshot` exporter.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod focus;
pub mod labels;
pub mod models;
pub mod normalize;
pub mod overpass;
pub mod pipeline;
pub mod popup;
pub mod search;
pub mod session;
pub mod surface;

#[doc(hidden)]
pub mod test_support;

pub use config::Config;
pub use error::{ConfigError, EndpointFailure, FetchError};
pub use models::{Bounds, Category, LatLng, PointOfInterest, RoadClass, RoadSegment};
pub use pipeline::{LoadStatus, Pipeline, Selection};
pub use session::Session;
pub use surface::MapSurface;
