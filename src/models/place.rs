//! Points of interest and the fixed category catalogue they are filed under.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::LatLng;

/// A single Overpass tag predicate: `key=value`, or bare `key` for "any value"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRule {
    pub key: &'static str,
    pub value: Option<&'static str>,
}

impl TagRule {
    const fn is(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub fn matches(&self, tags: &HashMap<String, String>) -> bool {
        match (tags.get(self.key), self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Overpass filter fragment, e.g. `["amenity"="bank"]`
    pub fn to_filter(&self) -> String {
        match self.value {
            Some(value) => format!("[\"{}\"=\"{}\"]", self.key, value),
            None => format!("[\"{}\"]", self.key),
        }
    }
}

const HOTEL_RULES: &[TagRule] = &[
    TagRule::is("tourism", "hotel"),
    TagRule::is("tourism", "guest_house"),
    TagRule::is("tourism", "hostel"),
    TagRule::is("tourism", "motel"),
];

const RESTAURANT_RULES: &[TagRule] = &[
    TagRule::is("amenity", "restaurant"),
    TagRule::is("amenity", "cafe"),
    TagRule::is("amenity", "fast_food"),
];

const BANK_RULES: &[TagRule] = &[
    TagRule::is("amenity", "bank"),
    TagRule::is("amenity", "atm"),
    TagRule::is("amenity", "money_transfer"),
];

const MALL_RULES: &[TagRule] = &[
    TagRule::is("shop", "mall"),
    TagRule::is("shop", "department_store"),
    TagRule::is("shop", "supermarket"),
    TagRule::is("building", "retail"),
];

/// POI category (lodging, dining, finance, retail)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hotels,
    Restaurants,
    Banks,
    Malls,
}

impl Category {
    /// Every category, in preload order
    pub fn all() -> &'static [Category] {
        &[
            Category::Hotels,
            Category::Restaurants,
            Category::Banks,
            Category::Malls,
        ]
    }

    /// Stable key used in URLs and config
    pub fn key(self) -> &'static str {
        match self {
            Category::Hotels => "hotels",
            Category::Restaurants => "restaurants",
            Category::Banks => "banks",
            Category::Malls => "malls",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.key() == key)
    }

    /// Plural display label
    pub fn label(self) -> &'static str {
        match self {
            Category::Hotels => "Hotels",
            Category::Restaurants => "Restaurants",
            Category::Banks => "Banks",
            Category::Malls => "Malls",
        }
    }

    /// Singular display label, used for unnamed places
    pub fn singular(self) -> &'static str {
        match self {
            Category::Hotels => "Hotel",
            Category::Restaurants => "Restaurant",
            Category::Banks => "Bank",
            Category::Malls => "Mall",
        }
    }

    /// Marker fill colour
    pub fn color(self) -> &'static str {
        match self {
            Category::Hotels => "#8e24aa",
            Category::Restaurants => "#e65100",
            Category::Banks => "#1565c0",
            Category::Malls => "#c62828",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Category::Hotels => "\u{1F3E8}",
            Category::Restaurants => "\u{1F37D}",
            Category::Banks => "\u{1F3E6}",
            Category::Malls => "\u{1F3EC}",
        }
    }

    /// Tag predicates, evaluated top to bottom
    pub fn rules(self) -> &'static [TagRule] {
        match self {
            Category::Hotels => HOTEL_RULES,
            Category::Restaurants => RESTAURANT_RULES,
            Category::Banks => BANK_RULES,
            Category::Malls => MALL_RULES,
        }
    }

    /// First rule of this category satisfied by `tags`
    pub fn matching_rule(self, tags: &HashMap<String, String>) -> Option<&'static TagRule> {
        self.rules().iter().find(|rule| rule.matches(tags))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A normalized point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// OSM element ID
    pub id: i64,
    pub name: Option<String>,
    /// The category whose query produced this record
    pub category: Category,
    pub coordinate: LatLng,
    pub raw_tags: HashMap<String, String>,
}

impl PointOfInterest {
    /// Name for display, falling back to "Unnamed <Category>"
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Unnamed {}", self.category.singular()),
        }
    }

    /// Phone number from `phone` or `contact:phone`
    pub fn phone(&self) -> Option<&str> {
        self.raw_tags
            .get("phone")
            .or_else(|| self.raw_tags.get("contact:phone"))
            .map(String::as_str)
    }

    pub fn street(&self) -> Option<&str> {
        self.raw_tags.get("addr:street").map(String::as_str)
    }

    pub fn opening_hours(&self) -> Option<&str> {
        self.raw_tags.get("opening_hours").map(String::as_str)
    }
}
