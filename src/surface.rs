//! The map widget, as seen by the pipeline.
//!
//! Tile rendering, pan/zoom and marker drawing live outside this crate. The
//! pipeline only issues the commands below, and the host forwards its
//! zoom-changed events to [`Pipeline::on_zoom_changed`](crate::Pipeline::on_zoom_changed).

use serde::Serialize;
use std::time::Duration;

use crate::labels::{LabelTier, StreetLabel};
use crate::models::{Bounds, Category, LatLng, PathStyle, PointOfInterest, RoadSegment};
use crate::popup::Popup;

/// Options for fitting the viewport to a bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FitOptions {
    /// Padding on every side, in pixels
    pub padding_px: u32,
    pub max_zoom: u8,
}

pub trait MapSurface {
    /// Add a road polyline
    fn draw_road(&mut self, road: &RoadSegment, style: &PathStyle);

    /// Remove every road polyline drawn so far
    fn clear_roads(&mut self);

    fn set_road_style(&mut self, road_id: i64, style: &PathStyle);

    /// Move a road above its siblings in draw order
    fn raise_road(&mut self, road_id: i64);

    /// Replace the visible markers with a category's places
    fn show_places(&mut self, category: Category, places: &[PointOfInterest]);

    fn clear_places(&mut self);

    fn attach_labels(&mut self, tier: LabelTier, labels: &[StreetLabel]);

    fn detach_labels(&mut self, tier: LabelTier);

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions);

    fn fly_to(&mut self, center: LatLng, zoom: u8, duration: Duration);

    fn open_popup(&mut self, popup: &Popup);

    /// Current zoom level
    fn zoom(&self) -> u8;
}
