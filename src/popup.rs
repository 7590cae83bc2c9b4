//! Popup content for roads and places.

use serde::Serialize;

use crate::models::{Category, PointOfInterest, RoadSegment};

/// What a popup is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PopupTarget {
    Road { id: i64 },
    Place { category: Category, id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub target: PopupTarget,
    pub title: String,
    /// Secondary lines shown under the title
    pub lines: Vec<String>,
}

impl Popup {
    pub fn for_road(road: &RoadSegment) -> Self {
        let mut lines = vec![road.type_label()];
        if let Some(alt) = &road.alternate_name {
            lines.push(alt.clone());
        }

        Self {
            target: PopupTarget::Road { id: road.id },
            title: road
                .name
                .clone()
                .unwrap_or_else(|| "Unnamed Road".to_string()),
            lines,
        }
    }

    pub fn for_place(place: &PointOfInterest) -> Self {
        let mut lines = vec![format!(
            "{} {}",
            place.category.icon(),
            place.category.label()
        )];
        if let Some(phone) = place.phone() {
            lines.push(format!("Phone: {}", phone));
        }
        if let Some(street) = place.street() {
            lines.push(street.to_string());
        }
        if let Some(hours) = place.opening_hours() {
            lines.push(format!("Hours: {}", hours));
        }

        Self {
            target: PopupTarget::Place {
                category: place.category,
                id: place.id,
            },
            title: place.display_name(),
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{poi, road};
    use crate::models::RoadClass;

    #[test]
    fn test_unnamed_road_popup() {
        let mut r = road(1, None, RoadClass::Service);
        r.raw_tags.insert("highway".to_string(), "service".to_string());
        let popup = Popup::for_road(&r);
        assert_eq!(popup.title, "Unnamed Road");
        assert_eq!(popup.lines, vec!["service".to_string()]);
    }

    #[test]
    fn test_place_popup_details() {
        let mut p = poi(9, "Maansoor Hotel", Category::Hotels);
        p.raw_tags.insert("phone".to_string(), "+252 2 520000".to_string());
        p.raw_tags.insert("opening_hours".to_string(), "24/7".to_string());

        let popup = Popup::for_place(&p);
        assert_eq!(popup.title, "Maansoor Hotel");
        assert_eq!(
            popup.lines,
            vec![
                "\u{1F3E8} Hotels".to_string(),
                "Phone: +252 2 520000".to_string(),
                "Hours: 24/7".to_string()
            ]
        );
        assert_eq!(
            popup.target,
            PopupTarget::Place {
                category: Category::Hotels,
                id: 9
            }
        );
    }
}
