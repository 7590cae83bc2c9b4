//! Free-text search over cached roads and places.

mod index;
mod matching;

pub use index::{PlaceHit, RoadHit, SearchIndex, SearchLimits, SearchResults};
pub use matching::{compare_names, find_ignore_case, MatchSpan};
