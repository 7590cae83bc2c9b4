//! Zoom-tiered street name labels.
//!
//! Each named road belongs to exactly one tier. Within a tier a name is
//! labelled once, at the midpoint of the first segment carrying it. Tiers
//! are built once per render and afterwards only attached to or detached
//! from the map as the zoom level crosses their thresholds.

use hashbrown::HashSet;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::LabelConfig;
use crate::models::{LatLng, RoadClass, RoadSegment};
use crate::surface::MapSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelTier {
    /// motorway, trunk, primary
    Major,
    /// secondary, tertiary
    Secondary,
    /// everything else
    Minor,
}

impl LabelTier {
    pub fn all() -> &'static [LabelTier] {
        &[LabelTier::Major, LabelTier::Secondary, LabelTier::Minor]
    }

    pub fn for_class(class: RoadClass) -> Self {
        match class {
            RoadClass::Motorway | RoadClass::Trunk | RoadClass::Primary => LabelTier::Major,
            RoadClass::Secondary | RoadClass::Tertiary => LabelTier::Secondary,
            _ => LabelTier::Minor,
        }
    }

    fn index(self) -> usize {
        match self {
            LabelTier::Major => 0,
            LabelTier::Secondary => 1,
            LabelTier::Minor => 2,
        }
    }
}

/// A non-interactive text marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetLabel {
    pub text: String,
    pub position: LatLng,
    /// CSS class from the road's style
    pub class: &'static str,
    pub tier: LabelTier,
    /// Road the label was taken from
    pub road_id: i64,
}

/// Minimum zoom at which each tier is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierThresholds {
    pub major: u8,
    pub secondary: u8,
    pub minor: u8,
}

impl TierThresholds {
    pub fn min_zoom(&self, tier: LabelTier) -> u8 {
        match tier {
            LabelTier::Major => self.major,
            LabelTier::Secondary => self.secondary,
            LabelTier::Minor => self.minor,
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::from(&LabelConfig::default())
    }
}

impl From<&LabelConfig> for TierThresholds {
    fn from(config: &LabelConfig) -> Self {
        Self {
            major: config.major_min_zoom,
            secondary: config.secondary_min_zoom,
            minor: config.minor_min_zoom,
        }
    }
}

/// Counts from one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub named: usize,
    pub total: usize,
    pub labels: usize,
}

#[derive(Debug, Default)]
pub struct LabelTierManager {
    thresholds: TierThresholds,
    tiers: [Vec<StreetLabel>; 3],
    attached: [bool; 3],
}

impl LabelTierManager {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self {
            thresholds,
            tiers: Default::default(),
            attached: [false; 3],
        }
    }

    /// Rebuild every tier from `roads`, detaching any previously attached
    /// labels first.
    pub fn render<S: MapSurface>(&mut self, roads: &[RoadSegment], surface: &mut S) -> RenderSummary {
        self.detach_all(surface);

        // per-tier registries of names already labelled
        let mut labelled: [HashSet<&str>; 3] = Default::default();
        let mut tiers: [Vec<StreetLabel>; 3] = Default::default();
        let mut named = 0;

        for road in roads {
            let Some(name) = road.name.as_deref() else {
                continue;
            };
            named += 1;

            let tier = LabelTier::for_class(road.classification);
            if !labelled[tier.index()].insert(name) {
                continue;
            }

            if let Some(position) = road.midpoint() {
                tiers[tier.index()].push(StreetLabel {
                    text: name.to_string(),
                    position,
                    class: road.style().label_class,
                    tier,
                    road_id: road.id,
                });
            }
        }

        self.tiers = tiers;
        let summary = RenderSummary {
            named,
            total: roads.len(),
            labels: self.tiers.iter().map(Vec::len).sum(),
        };
        info!(
            "Built {} labels ({} major, {} secondary, {} minor)",
            summary.labels,
            self.tiers[0].len(),
            self.tiers[1].len(),
            self.tiers[2].len()
        );

        summary
    }

    /// Attach tiers whose threshold `zoom` has reached and detach the rest.
    /// Call on every zoom change; repeated calls at the same zoom do nothing.
    pub fn update_visibility<S: MapSurface>(&mut self, zoom: u8, surface: &mut S) {
        for &tier in LabelTier::all() {
            let i = tier.index();
            let visible = zoom >= self.thresholds.min_zoom(tier);

            if visible && !self.attached[i] {
                debug!("Attaching {:?} labels at zoom {}", tier, zoom);
                surface.attach_labels(tier, &self.tiers[i]);
                self.attached[i] = true;
            } else if !visible && self.attached[i] {
                debug!("Detaching {:?} labels at zoom {}", tier, zoom);
                surface.detach_labels(tier);
                self.attached[i] = false;
            }
        }
    }

    fn detach_all<S: MapSurface>(&mut self, surface: &mut S) {
        for &tier in LabelTier::all() {
            if self.attached[tier.index()] {
                surface.detach_labels(tier);
                self.attached[tier.index()] = false;
            }
        }
    }

    pub fn labels(&self, tier: LabelTier) -> &[StreetLabel] {
        &self.tiers[tier.index()]
    }

    pub fn is_attached(&self, tier: LabelTier) -> bool {
        self.attached[tier.index()]
    }

    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{road, RecordingSurface, SurfaceCall};

    fn manager() -> LabelTierManager {
        LabelTierManager::new(TierThresholds {
            major: 12,
            secondary: 15,
            minor: 16,
        })
    }

    #[test]
    fn test_one_label_per_name_per_tier() {
        let roads = vec![
            road(1, Some("Jidka Xoriyada"), RoadClass::Primary),
            road(2, Some("Jidka Xoriyada"), RoadClass::Trunk),
            road(3, Some("Jidka Xoriyada"), RoadClass::Residential),
            road(4, Some("Jidka Xoriyada"), RoadClass::Service),
            road(5, None, RoadClass::Primary),
        ];
        let mut surface = RecordingSurface::new(14);
        let mut labels = manager();

        let summary = labels.render(&roads, &mut surface);

        assert_eq!(summary.named, 4);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.labels, 2);
        assert_eq!(labels.labels(LabelTier::Major).len(), 1);
        assert_eq!(labels.labels(LabelTier::Major)[0].road_id, 1);
        assert_eq!(labels.labels(LabelTier::Secondary).len(), 0);
        assert_eq!(labels.labels(LabelTier::Minor).len(), 1);
        assert_eq!(labels.labels(LabelTier::Minor)[0].road_id, 3);
    }

    #[test]
    fn test_label_at_midpoint_of_first_segment() {
        let mut first = road(1, Some("Road 1"), RoadClass::Secondary);
        first.geometry = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(2.0, 2.0),
        ];
        let mut surface = RecordingSurface::new(14);
        let mut labels = manager();
        labels.render(&[first, road(2, Some("Road 1"), RoadClass::Tertiary)], &mut surface);

        let secondary = labels.labels(LabelTier::Secondary);
        assert_eq!(secondary.len(), 1);
        assert_eq!(secondary[0].position, LatLng::new(1.0, 1.0));
        assert_eq!(secondary[0].class, "street-label-secondary");
    }

    #[test]
    fn test_tiers_toggle_with_zoom() {
        let mut surface = RecordingSurface::new(12);
        let mut labels = manager();
        labels.render(&[road(1, Some("A"), RoadClass::Primary)], &mut surface);

        labels.update_visibility(12, &mut surface);
        assert!(labels.is_attached(LabelTier::Major));
        assert!(!labels.is_attached(LabelTier::Secondary));

        labels.update_visibility(16, &mut surface);
        assert!(labels.is_attached(LabelTier::Secondary));
        assert!(labels.is_attached(LabelTier::Minor));

        labels.update_visibility(15, &mut surface);
        assert!(labels.is_attached(LabelTier::Secondary));
        assert!(!labels.is_attached(LabelTier::Minor));

        labels.update_visibility(11, &mut surface);
        assert!(LabelTier::all().iter().all(|t| !labels.is_attached(*t)));

        // the entities survive detachment
        assert_eq!(labels.labels(LabelTier::Major).len(), 1);
    }

    #[test]
    fn test_visibility_update_is_idempotent() {
        let mut surface = RecordingSurface::new(16);
        let mut labels = manager();
        labels.render(&[road(1, Some("A"), RoadClass::Primary)], &mut surface);

        labels.update_visibility(16, &mut surface);
        let after_first = surface.calls().len();
        labels.update_visibility(16, &mut surface);

        assert_eq!(surface.calls().len(), after_first);
        assert_eq!(
            surface
                .calls()
                .iter()
                .filter(|c| matches!(c, SurfaceCall::AttachLabels { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_rerender_detaches_old_labels() {
        let mut surface = RecordingSurface::new(16);
        let mut labels = manager();
        labels.render(&[road(1, Some("A"), RoadClass::Primary)], &mut surface);
        labels.update_visibility(16, &mut surface);

        labels.render(&[road(2, Some("B"), RoadClass::Primary)], &mut surface);

        assert!(!labels.is_attached(LabelTier::Major));
        assert!(surface.attached_tiers().is_empty());
        assert_eq!(labels.labels(LabelTier::Major)[0].text, "B");
    }
}
