//! Selecting a road or place: restyling and moving the viewport.

use std::time::Duration;
use tracing::debug;

use crate::config::FocusConfig;
use crate::models::{Bounds, PathStyle, PointOfInterest, RoadSegment};
use crate::popup::Popup;
use crate::surface::{FitOptions, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSettings {
    pub fit: FitOptions,
    pub place_zoom: u8,
    pub fly_duration: Duration,
    /// How long a fly-to takes to settle before its popup is opened
    pub popup_delay: Duration,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self::from(&FocusConfig::default())
    }
}

impl From<&FocusConfig> for FocusSettings {
    fn from(config: &FocusConfig) -> Self {
        Self {
            fit: FitOptions {
                padding_px: config.padding_px,
                max_zoom: config.road_max_zoom,
            },
            place_zoom: config.place_zoom,
            fly_duration: Duration::from_millis(config.fly_duration_ms),
            popup_delay: Duration::from_millis(config.popup_delay_ms),
        }
    }
}

/// Tracks which road, if any, carries the highlight style
#[derive(Debug, Default)]
pub struct FocusController {
    settings: FocusSettings,
    highlighted: Option<i64>,
}

impl FocusController {
    pub fn new(settings: FocusSettings) -> Self {
        Self {
            settings,
            highlighted: None,
        }
    }

    pub fn highlighted(&self) -> Option<i64> {
        self.highlighted
    }

    pub fn settings(&self) -> FocusSettings {
        self.settings
    }

    /// Forget the highlight; the roads it referred to have been redrawn
    pub fn reset(&mut self) {
        self.highlighted = None;
    }

    /// Highlight road `id` and fit the viewport to it.
    ///
    /// Every road is reset to its class style first, so at most one road is
    /// ever highlighted and repeating the call changes nothing. Returns the
    /// fitted bounds, or `None` if `id` is not among `roads`.
    pub fn focus_road<S: MapSurface>(
        &mut self,
        roads: &[RoadSegment],
        id: i64,
        surface: &mut S,
    ) -> Option<Bounds> {
        let selected = roads.iter().find(|r| r.id == id)?;
        let bounds = Bounds::from_path(&selected.geometry)?;

        for road in roads {
            surface.set_road_style(road.id, &road.style().path_style());
        }

        surface.set_road_style(id, &PathStyle::highlight());
        surface.raise_road(id);
        surface.fit_bounds(bounds, self.settings.fit);
        surface.open_popup(&Popup::for_road(selected));

        debug!("Focused road {} ({:?})", id, selected.name);
        self.highlighted = Some(id);
        Some(bounds)
    }

    /// Start the fly-to animation towards a place. Its popup should follow
    /// once `popup_delay` has passed.
    pub fn fly_to_place<S: MapSurface>(&self, place: &PointOfInterest, surface: &mut S) {
        surface.fly_to(
            place.coordinate,
            self.settings.place_zoom,
            self.settings.fly_duration,
        );
    }

    pub fn open_place_popup<S: MapSurface>(&self, place: &PointOfInterest, surface: &mut S) {
        surface.open_popup(&Popup::for_place(place));
        debug!("Focused {} place {}", place.category, place.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, LatLng, RoadClass};
    use crate::test_support::{poi, road, RecordingSurface, SurfaceCall};

    fn roads() -> Vec<RoadSegment> {
        let mut a = road(1, Some("Jidka Xoriyada"), RoadClass::Primary);
        a.geometry = vec![LatLng::new(9.55, 44.05), LatLng::new(9.57, 44.08)];
        vec![
            a,
            road(2, Some("Jidka Hargeisa"), RoadClass::Secondary),
            road(3, None, RoadClass::Service),
        ]
    }

    #[test]
    fn test_focus_road_highlights_only_selected() {
        let roads = roads();
        let mut surface = RecordingSurface::new(14);
        let mut focus = FocusController::default();

        let bounds = focus.focus_road(&roads, 1, &mut surface).unwrap();

        assert_eq!(bounds, Bounds::new(9.55, 44.05, 9.57, 44.08));
        assert_eq!(surface.style_of(1), Some(&PathStyle::highlight()));
        assert_eq!(
            surface.style_of(2),
            Some(&RoadClass::Secondary.style().path_style())
        );
        assert_eq!(surface.raised().last(), Some(&1));
        assert_eq!(focus.highlighted(), Some(1));
        assert!(surface.calls().contains(&SurfaceCall::FitBounds {
            bounds,
            options: FitOptions {
                padding_px: 50,
                max_zoom: 17
            }
        }));
    }

    #[test]
    fn test_refocus_resets_previous_highlight() {
        let roads = roads();
        let mut surface = RecordingSurface::new(14);
        let mut focus = FocusController::default();

        focus.focus_road(&roads, 1, &mut surface);
        focus.focus_road(&roads, 2, &mut surface);

        assert_eq!(
            surface.style_of(1),
            Some(&RoadClass::Primary.style().path_style())
        );
        assert_eq!(surface.style_of(2), Some(&PathStyle::highlight()));
        let highlighted = roads
            .iter()
            .filter(|r| surface.style_of(r.id) == Some(&PathStyle::highlight()))
            .count();
        assert_eq!(highlighted, 1);
    }

    #[test]
    fn test_focus_road_is_idempotent() {
        let roads = roads();
        let mut once = RecordingSurface::new(14);
        let mut twice = RecordingSurface::new(14);
        let mut focus = FocusController::default();

        focus.focus_road(&roads, 1, &mut once);
        focus.focus_road(&roads, 1, &mut twice);
        focus.focus_road(&roads, 1, &mut twice);

        assert_eq!(once.styles(), twice.styles());
        assert_eq!(once.viewport(), twice.viewport());
        assert_eq!(once.raised().last(), twice.raised().last());
    }

    #[test]
    fn test_unknown_road_is_noop() {
        let mut surface = RecordingSurface::new(14);
        let mut focus = FocusController::default();

        assert!(focus.focus_road(&roads(), 42, &mut surface).is_none());
        assert!(surface.calls().is_empty());
        assert_eq!(focus.highlighted(), None);
    }

    #[test]
    fn test_reset_forgets_highlight() {
        let roads = roads();
        let mut surface = RecordingSurface::new(14);
        let mut focus = FocusController::default();

        focus.focus_road(&roads, 2, &mut surface);
        focus.reset();

        assert_eq!(focus.highlighted(), None);
        surface.clear_calls();
        // focusing again after a reset still restyles every road
        focus.focus_road(&roads, 2, &mut surface);
        let restyled = surface
            .calls()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::SetRoadStyle { .. }))
            .count();
        assert_eq!(restyled, roads.len() + 1);
    }

    #[test]
    fn test_focus_place_flies_then_opens_popup() {
        let place = poi(7, "Ambassador Hotel", Category::Hotels);
        let mut surface = RecordingSurface::new(14);
        let focus = FocusController::default();

        focus.fly_to_place(&place, &mut surface);
        focus.open_place_popup(&place, &mut surface);

        let calls = surface.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            SurfaceCall::FlyTo {
                center: place.coordinate,
                zoom: 18,
                duration: Duration::from_millis(800)
            }
        );
        assert!(matches!(&calls[1], SurfaceCall::OpenPopup(p) if p.title == "Ambassador Hotel"));
    }
}
