//! Overpass API access: query building, response decoding and endpoint
//! fallback.

mod fetcher;
pub mod query;
mod response;

pub use fetcher::{EndpointFetcher, HttpTransport, RetryPolicy, Transport};
pub use response::{Element, NodeElement, OverpassResponse, RawPoint, WayElement};
