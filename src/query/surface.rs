//! Map surface that queues commands for the browser front-end.

use serde::Serialize;
use std::time::Duration;

use acacia::labels::{LabelTier, StreetLabel};
use acacia::models::{Bounds, Category, LatLng, PathStyle, PointOfInterest, RoadSegment};
use acacia::popup::Popup;
use acacia::surface::{FitOptions, MapSurface};

/// One map command, as sent to the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceCommand {
    /// Road polylines are stale; refetch `/v1/roads`
    ClearRoads,
    SetRoadStyle {
        id: i64,
        style: PathStyle,
    },
    RaiseRoad {
        id: i64,
    },
    ShowPlaces {
        category: Category,
        places: Vec<PointOfInterest>,
    },
    ClearPlaces,
    AttachLabels {
        tier: LabelTier,
        labels: Vec<StreetLabel>,
    },
    DetachLabels {
        tier: LabelTier,
    },
    FitBounds {
        bounds: Bounds,
        options: FitOptions,
    },
    FlyTo {
        center: LatLng,
        zoom: u8,
        duration_ms: u128,
    },
    OpenPopup {
        popup: Popup,
    },
}

/// Queues commands until a handler drains them into its response.
///
/// Road polylines are served whole from `/v1/roads`, so `draw_road` only
/// counts them.
#[derive(Debug)]
pub struct CommandSurface {
    zoom: u8,
    drawn_roads: usize,
    queue: Vec<SurfaceCommand>,
}

impl CommandSurface {
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom,
            drawn_roads: 0,
            queue: Vec::new(),
        }
    }

    /// Record the client's zoom level
    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    pub fn drawn_roads(&self) -> usize {
        self.drawn_roads
    }

    pub fn drain(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.queue)
    }
}

impl MapSurface for CommandSurface {
    fn draw_road(&mut self, _road: &RoadSegment, _style: &PathStyle) {
        self.drawn_roads += 1;
    }

    fn clear_roads(&mut self) {
        self.drawn_roads = 0;
        self.queue.push(SurfaceCommand::ClearRoads);
    }

    fn set_road_style(&mut self, road_id: i64, style: &PathStyle) {
        self.queue.push(SurfaceCommand::SetRoadStyle {
            id: road_id,
            style: style.clone(),
        });
    }

    fn raise_road(&mut self, road_id: i64) {
        self.queue.push(SurfaceCommand::RaiseRoad { id: road_id });
    }

    fn show_places(&mut self, category: Category, places: &[PointOfInterest]) {
        self.queue.push(SurfaceCommand::ShowPlaces {
            category,
            places: places.to_vec(),
        });
    }

    fn clear_places(&mut self) {
        self.queue.push(SurfaceCommand::ClearPlaces);
    }

    fn attach_labels(&mut self, tier: LabelTier, labels: &[StreetLabel]) {
        self.queue.push(SurfaceCommand::AttachLabels {
            tier,
            labels: labels.to_vec(),
        });
    }

    fn detach_labels(&mut self, tier: LabelTier) {
        self.queue.push(SurfaceCommand::DetachLabels { tier });
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) {
        self.queue.push(SurfaceCommand::FitBounds { bounds, options });
    }

    fn fly_to(&mut self, center: LatLng, zoom: u8, duration: Duration) {
        self.zoom = zoom;
        self.queue.push(SurfaceCommand::FlyTo {
            center,
            zoom,
            duration_ms: duration.as_millis(),
        });
    }

    fn open_popup(&mut self, popup: &Popup) {
        self.queue.push(SurfaceCommand::OpenPopup {
            popup: popup.clone(),
        });
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acacia::models::RoadClass;
    use acacia::test_support::road;

    #[test]
    fn test_clear_roads_restarts_count() {
        let mut surface = CommandSurface::new(14);
        let road = road(1, Some("Jidka Weyn"), RoadClass::Primary);
        let style = road.style().path_style();

        surface.draw_road(&road, &style);
        surface.clear_roads();
        surface.draw_road(&road, &style);

        assert_eq!(surface.drawn_roads(), 1);
        let commands = serde_json::to_value(surface.drain()).unwrap();
        assert_eq!(commands.as_array().map(Vec::len), Some(1));
        assert_eq!(commands[0]["op"], "clear_roads");
        assert!(surface.drain().is_empty());
    }
}
