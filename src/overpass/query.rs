//! Overpass QL query builders.

use crate::models::{Bounds, Category};

/// All highway ways in the area, followed by their referenced nodes.
pub fn road_query(bbox: &Bounds) -> String {
    let bbox = bbox.to_overpass();
    format!(
        "[out:json][timeout:60];(way[\"highway\"]({bbox}););out body;>;out skel qt;",
        bbox = bbox
    )
}

/// Nodes and ways matching any of the category's tag rules, with a center
/// point for ways.
pub fn category_query(category: Category, bbox: &Bounds) -> String {
    let bbox = bbox.to_overpass();
    let parts: String = category
        .rules()
        .iter()
        .map(|rule| {
            let filter = rule.to_filter();
            format!("node{filter}({bbox});way{filter}({bbox});")
        })
        .collect();

    format!("[out:json][timeout:15];({});out center;", parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_road_query() {
        let q = road_query(&Bounds::new(9.5, 43.99, 9.62, 44.13));
        assert_eq!(
            q,
            "[out:json][timeout:60];(way[\"highway\"](9.5,43.99,9.62,44.13););out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_category_query_covers_every_rule() {
        let q = category_query(Category::Restaurants, &Bounds::new(1.0, 2.0, 3.0, 4.0));
        assert!(q.starts_with("[out:json][timeout:15];("));
        assert!(q.ends_with(");out center;"));
        assert!(q.contains("node[\"amenity\"=\"cafe\"](1,2,3,4);"));
        assert!(q.contains("way[\"amenity\"=\"fast_food\"](1,2,3,4);"));
        assert_eq!(q.matches("node[").count(), 3);
    }
}
