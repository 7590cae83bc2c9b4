//! Road segments and their per-classification styling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::LatLng;

/// Opacity applied to every road that is not highlighted
pub const DEFAULT_ROAD_OPACITY: f64 = 0.7;

/// Road classification read from the `highway` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    LivingStreet,
    Unclassified,
    Service,
    Track,
    Path,
    /// Any highway value without dedicated styling
    Other,
}

impl RoadClass {
    /// Map a raw `highway` value; unknown values fall back to [`RoadClass::Other`]
    pub fn from_highway(value: &str) -> Self {
        match value {
            "motorway" => RoadClass::Motorway,
            "trunk" => RoadClass::Trunk,
            "primary" => RoadClass::Primary,
            "secondary" => RoadClass::Secondary,
            "tertiary" => RoadClass::Tertiary,
            "residential" => RoadClass::Residential,
            "living_street" => RoadClass::LivingStreet,
            "unclassified" => RoadClass::Unclassified,
            "service" => RoadClass::Service,
            "track" => RoadClass::Track,
            "path" => RoadClass::Path,
            _ => RoadClass::Other,
        }
    }

    /// Canonical `highway` value ("road" for [`RoadClass::Other`])
    pub fn as_str(self) -> &'static str {
        match self {
            RoadClass::Motorway => "motorway",
            RoadClass::Trunk => "trunk",
            RoadClass::Primary => "primary",
            RoadClass::Secondary => "secondary",
            RoadClass::Tertiary => "tertiary",
            RoadClass::Residential => "residential",
            RoadClass::LivingStreet => "living_street",
            RoadClass::Unclassified => "unclassified",
            RoadClass::Service => "service",
            RoadClass::Track => "track",
            RoadClass::Path => "path",
            RoadClass::Other => "road",
        }
    }

    /// Drawing style for this class
    pub fn style(self) -> RoadStyle {
        match self {
            RoadClass::Motorway | RoadClass::Trunk => {
                RoadStyle::new("#d4503a", 5.0, "street-label-primary")
            }
            RoadClass::Primary => RoadStyle::new("#d4503a", 4.0, "street-label-primary"),
            RoadClass::Secondary => RoadStyle::new("#e8a44a", 3.0, "street-label-secondary"),
            RoadClass::Tertiary => RoadStyle::new("#6a9fd8", 3.0, "street-label-secondary"),
            RoadClass::Residential | RoadClass::LivingStreet => {
                RoadStyle::new("#9ca8b8", 2.0, "street-label")
            }
            RoadClass::Unclassified | RoadClass::Other => {
                RoadStyle::new("#b0a8c0", 2.0, "street-label")
            }
            RoadClass::Service | RoadClass::Track => RoadStyle::new("#c0c4c8", 1.0, "street-label"),
            RoadClass::Path => RoadStyle::new("#d0d4d8", 1.0, "street-label"),
        }
    }
}

/// Static styling attached to a road class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadStyle {
    pub color: &'static str,
    pub weight: f64,
    /// CSS class used for the road's name label
    pub label_class: &'static str,
}

impl RoadStyle {
    const fn new(color: &'static str, weight: f64, label_class: &'static str) -> Self {
        Self {
            color,
            weight,
            label_class,
        }
    }

    /// The un-highlighted polyline style
    pub fn path_style(&self) -> PathStyle {
        PathStyle {
            color: self.color.to_string(),
            weight: self.weight,
            opacity: DEFAULT_ROAD_OPACITY,
        }
    }
}

/// Polyline style handed to the map surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
}

impl PathStyle {
    /// Style applied to the currently focused road
    pub fn highlight() -> Self {
        Self {
            color: "#ff0000".to_string(),
            weight: 6.0,
            opacity: 1.0,
        }
    }
}

/// A normalized road way.
///
/// `geometry` always holds at least two points; the normalizer drops
/// anything shorter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    /// OSM way ID
    pub id: i64,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_name: Option<String>,
    pub classification: RoadClass,
    /// Physical path in source order
    pub geometry: Vec<LatLng>,
    pub raw_tags: HashMap<String, String>,
}

impl RoadSegment {
    pub fn style(&self) -> RoadStyle {
        self.classification.style()
    }

    /// Human-readable road type, e.g. "living street"
    pub fn type_label(&self) -> String {
        self.raw_tags
            .get("highway")
            .map(String::as_str)
            .unwrap_or(self.classification.as_str())
            .replace('_', " ")
    }

    /// Label anchor: the point at index `len / 2`
    pub fn midpoint(&self) -> Option<LatLng> {
        self.geometry.get(self.geometry.len() / 2).copied()
    }
}
