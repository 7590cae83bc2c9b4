//! Session caches for normalized roads and per-category places.
//!
//! A missing entry means "not fetched yet", never "empty". Entries are
//! replaced wholesale; there is no partial population.

use tracing::debug;

use crate::models::{Category, PointOfInterest, RoadSegment};

/// Places per category, in the order the categories were populated
#[derive(Debug, Default)]
pub struct CategoryCache {
    entries: Vec<(Category, Vec<PointOfInterest>)>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> Option<&[PointOfInterest]> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, places)| places.as_slice())
    }

    pub fn is_cached(&self, category: Category) -> bool {
        self.get(category).is_some()
    }

    /// Store a fully normalized result, replacing any previous entry
    pub fn insert(&mut self, category: Category, places: Vec<PointOfInterest>) {
        debug!("Caching {} places for {}", places.len(), category);
        self.invalidate(category);
        self.entries.push((category, places));
    }

    /// Forget a category so the next lookup fetches it again
    pub fn invalidate(&mut self, category: Category) {
        self.entries.retain(|(c, _)| *c != category);
    }

    /// Categories populated so far, in population order
    pub fn populated(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    /// Every cached place across categories, in population order
    pub fn places(&self) -> impl Iterator<Item = &PointOfInterest> {
        self.entries.iter().flat_map(|(_, places)| places.iter())
    }

    pub fn find(&self, category: Category, id: i64) -> Option<&PointOfInterest> {
        self.get(category)?.iter().find(|p| p.id == id)
    }
}

/// The single road dataset
#[derive(Debug, Default)]
pub struct RoadCache {
    roads: Option<Vec<RoadSegment>>,
}

impl RoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&[RoadSegment]> {
        self.roads.as_deref()
    }

    pub fn set(&mut self, roads: Vec<RoadSegment>) {
        debug!("Caching {} roads", roads.len());
        self.roads = Some(roads);
    }

    pub fn invalidate(&mut self) {
        self.roads = None;
    }

    /// Cached roads, or an empty slice before the first load
    pub fn roads(&self) -> &[RoadSegment] {
        self.get().unwrap_or(&[])
    }

    pub fn find(&self, id: i64) -> Option<&RoadSegment> {
        self.roads().iter().find(|r| r.id == id)
    }
}
