//! Combined road and place search over the session caches.

use hashbrown::HashSet;
use serde::Serialize;
use tracing::debug;

use super::matching::{compare_names, find_ignore_case, MatchSpan};
use crate::cache::CategoryCache;
use crate::config::SearchConfig;
use crate::models::{Category, LatLng, RoadSegment};

/// Result caps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_places: usize,
    /// Road cap when place results exist
    pub max_roads: usize,
    /// Road cap when there are no place results
    pub max_roads_alone: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchLimits {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_places: config.max_places,
            max_roads: config.max_roads,
            max_roads_alone: config.max_roads_alone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceHit {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub coordinate: LatLng,
    pub span: MatchSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadHit {
    /// ID of the first segment carrying this name; used for navigation
    pub id: i64,
    pub name: String,
    /// e.g. "living street"
    pub type_label: String,
    pub span: MatchSpan,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Listed first, in category-fetch order
    pub places: Vec<PlaceHit>,
    pub roads: Vec<RoadHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.roads.is_empty()
    }

    pub fn len(&self) -> usize {
        self.places.len() + self.roads.len()
    }
}

/// Read-only view over cached roads and places
pub struct SearchIndex<'a> {
    roads: &'a [RoadSegment],
    places: &'a CategoryCache,
    limits: SearchLimits,
}

impl<'a> SearchIndex<'a> {
    pub fn new(roads: &'a [RoadSegment], places: &'a CategoryCache, limits: SearchLimits) -> Self {
        Self {
            roads,
            places,
            limits,
        }
    }

    /// Search road and place names.
    ///
    /// Categories that were never fetched contribute nothing; an empty
    /// (after trimming) query returns no results.
    pub fn search(&self, query: &str) -> SearchResults {
        let query = query.trim();
        if query.is_empty() {
            return SearchResults::default();
        }

        let places = self.search_places(query);
        let road_cap = if places.is_empty() {
            self.limits.max_roads_alone
        } else {
            self.limits.max_roads
        };
        let roads = self.search_roads(query, road_cap);

        debug!(
            "Search {:?}: {} places, {} roads",
            query,
            places.len(),
            roads.len()
        );

        SearchResults { places, roads }
    }

    fn search_places(&self, query: &str) -> Vec<PlaceHit> {
        let mut seen: HashSet<(&str, Category)> = HashSet::new();

        self.places
            .places()
            .filter_map(|place| {
                let name = place.name.as_deref()?;
                let span = find_ignore_case(name, query)?;
                Some((place, name, span))
            })
            .filter(|(place, name, _)| seen.insert((*name, place.category)))
            .take(self.limits.max_places)
            .map(|(place, name, span)| PlaceHit {
                id: place.id,
                name: name.to_string(),
                category: place.category,
                coordinate: place.coordinate,
                span,
            })
            .collect()
    }

    fn search_roads(&self, query: &str, cap: usize) -> Vec<RoadHit> {
        let mut seen: HashSet<&str> = HashSet::new();

        let mut hits: Vec<RoadHit> = self
            .roads
            .iter()
            .filter_map(|road| {
                let name = road.name.as_deref()?;
                let span = find_ignore_case(name, query)?;
                Some((road, name, span))
            })
            .filter(|(_, name, _)| seen.insert(*name))
            .map(|(road, name, span)| RoadHit {
                id: road.id,
                name: name.to_string(),
                type_label: road.type_label(),
                span,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.span
                .is_prefix()
                .cmp(&a.span.is_prefix())
                .then_with(|| compare_names(&a.name, &b.name))
        });
        hits.truncate(cap);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoadClass;
    use crate::test_support::{poi, road};

    fn names(results: &SearchResults) -> Vec<&str> {
        results.roads.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_prefix_matches_rank_first() {
        let roads = vec![
            road(1, Some("Jidka Weyn"), RoadClass::Primary),
            road(2, Some("26 June"), RoadClass::Primary),
            road(3, Some("Jidhka"), RoadClass::Residential),
            road(4, Some("Waddada Jidka"), RoadClass::Residential),
            road(5, Some("Aw Jid"), RoadClass::Residential),
        ];
        let cache = CategoryCache::new();
        let index = SearchIndex::new(&roads, &cache, SearchLimits::default());

        let results = index.search("Jid");

        assert_eq!(
            names(&results),
            vec!["Jidhka", "Jidka Weyn", "Aw Jid", "Waddada Jidka"]
        );
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let roads = vec![road(1, Some("Jidka Weyn"), RoadClass::Primary)];
        let cache = CategoryCache::new();
        let index = SearchIndex::new(&roads, &cache, SearchLimits::default());

        assert!(index.search("").is_empty());
        assert!(index.search("   ").is_empty());
    }

    #[test]
    fn test_roads_dedup_by_name_keeps_first_id() {
        let roads = vec![
            road(10, Some("Independence Avenue"), RoadClass::Primary),
            road(11, Some("Independence Avenue"), RoadClass::Primary),
            road(12, None, RoadClass::Primary),
        ];
        let cache = CategoryCache::new();
        let index = SearchIndex::new(&roads, &cache, SearchLimits::default());

        let results = index.search("independence");
        assert_eq!(results.roads.len(), 1);
        assert_eq!(results.roads[0].id, 10);
    }

    #[test]
    fn test_places_dedup_by_name_and_category() {
        let mut cache = CategoryCache::new();
        cache.insert(
            Category::Banks,
            vec![
                poi(1, "Dahabshiil", Category::Banks),
                poi(2, "Dahabshiil", Category::Banks),
            ],
        );
        cache.insert(Category::Malls, vec![poi(3, "Dahabshiil", Category::Malls)]);
        let index = SearchIndex::new(&[], &cache, SearchLimits::default());

        let results = index.search("dahab");
        let ids: Vec<i64> = results.places.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_unfetched_categories_contribute_nothing() {
        let roads = vec![road(1, Some("Hotel Road"), RoadClass::Residential)];
        let cache = CategoryCache::new();
        let index = SearchIndex::new(&roads, &cache, SearchLimits::default());

        let results = index.search("hotel");
        assert!(results.places.is_empty());
        assert_eq!(results.roads.len(), 1);
    }

    #[test]
    fn test_road_cap_depends_on_place_results() {
        let roads: Vec<RoadSegment> = (0..20)
            .map(|i| road(i, Some(&format!("Road {:02}", i)), RoadClass::Residential))
            .collect();
        let mut cache = CategoryCache::new();
        let index = SearchIndex::new(&roads, &cache, SearchLimits::default());
        assert_eq!(index.search("road").roads.len(), 15);

        let places: Vec<_> = (0..8)
            .map(|i| poi(100 + i, &format!("Road Cafe {}", i), Category::Restaurants))
            .collect();
        cache.insert(Category::Restaurants, places);
        let index = SearchIndex::new(&roads, &cache, SearchLimits::default());
        let results = index.search("road");

        assert_eq!(results.places.len(), 5);
        assert_eq!(results.roads.len(), 10);
        assert_eq!(results.roads[0].name, "Road 00");
    }
}
