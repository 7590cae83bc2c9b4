//! Overpass JSON response structure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level Overpass payload: a flat list of elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(NodeElement),
    Way(WayElement),
    /// Relations and anything else the service may return
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeElement {
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WayElement {
    pub id: i64,
    /// Referenced node IDs (`out body`)
    #[serde(default)]
    pub nodes: Vec<i64>,
    /// Inline coordinates (`out geom`); entries may be null for missing nodes
    #[serde(default)]
    pub geometry: Vec<Option<RawPoint>>,
    /// Representative point (`out center`)
    pub center: Option<RawPoint>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub lat: f64,
    pub lon: f64,
}

impl OverpassResponse {
    pub fn nodes(&self) -> impl Iterator<Item = &NodeElement> {
        self.elements.iter().filter_map(|el| match el {
            Element::Node(node) => Some(node),
            _ => None,
        })
    }

    pub fn ways(&self) -> impl Iterator<Item = &WayElement> {
        self.elements.iter().filter_map(|el| match el {
            Element::Way(way) => Some(way),
            _ => None,
        })
    }
}
