//! End-to-end behaviour of the pipeline against scripted endpoints.

use acacia::labels::LabelTier;
use acacia::models::PathStyle;
use acacia::overpass::OverpassResponse;
use acacia::test_support::{places_response, poi, RecordingSurface, ScriptedTransport};
use acacia::{Category, Config, FetchError, LoadStatus, Pipeline};

const FIRST: &str = "https://first.example/api/interpreter";
const SECOND: &str = "https://second.example/api/interpreter";
const THIRD: &str = "https://third.example/api/interpreter";

const ROADS_JSON: &str = r#"{
  "version": 0.6,
  "elements": [
    {"type": "way", "id": 100, "nodes": [1, 2, 3],
     "tags": {"highway": "primary", "name": "Jidka Weyn", "name:so": "Waddada Weyn"}},
    {"type": "way", "id": 101, "nodes": [3, 4],
     "tags": {"highway": "primary", "name": "Jidka Weyn"}},
    {"type": "way", "id": 102, "nodes": [5, 6],
     "tags": {"highway": "residential", "name": "Jidhka"}},
    {"type": "way", "id": 103, "nodes": [6, 7],
     "tags": {"highway": "secondary", "name": "26 June"}},
    {"type": "way", "id": 104, "nodes": [7, 8],
     "tags": {"highway": "service"}},
    {"type": "way", "id": 105, "nodes": [9],
     "tags": {"highway": "footway", "name": "Stub"}},
    {"type": "way", "id": 106, "nodes": [1, 99],
     "tags": {"highway": "track", "name": "Broken"}},
    {"type": "relation", "id": 7, "members": []},
    {"type": "node", "id": 1, "lat": 9.560, "lon": 44.060},
    {"type": "node", "id": 2, "lat": 9.561, "lon": 44.061},
    {"type": "node", "id": 3, "lat": 9.562, "lon": 44.062},
    {"type": "node", "id": 4, "lat": 9.563, "lon": 44.063},
    {"type": "node", "id": 5, "lat": 9.550, "lon": 44.050},
    {"type": "node", "id": 6, "lat": 9.551, "lon": 44.051},
    {"type": "node", "id": 7, "lat": 9.552, "lon": 44.052},
    {"type": "node", "id": 8, "lat": 9.553, "lon": 44.053},
    {"type": "node", "id": 9, "lat": 9.554, "lon": 44.054}
  ]
}"#;

fn roads_payload() -> OverpassResponse {
    serde_json::from_str(ROADS_JSON).unwrap()
}

fn config(endpoints: &[&str]) -> Config {
    let mut config = Config::default();
    config.service.endpoints = endpoints.iter().map(|e| e.to_string()).collect();
    config.retry.base_delay_ms = 1;
    config.preload.stagger_ms = 0;
    config.focus.popup_delay_ms = 0;
    config
}

fn pipeline(
    transport: &ScriptedTransport,
    endpoints: &[&str],
) -> Pipeline<ScriptedTransport, RecordingSurface> {
    Pipeline::new(
        config(endpoints),
        transport.clone(),
        RecordingSurface::new(14),
    )
}

#[tokio::test]
async fn test_second_endpoint_serves_when_first_fails() {
    let transport = ScriptedTransport::new();
    transport.fail_status(FIRST, 504);
    transport.succeed(SECOND, roads_payload());
    transport.fail_transport(THIRD, "should not be called");
    let mut pipeline = pipeline(&transport, &[FIRST, SECOND, THIRD]);

    pipeline.load_roads().await.unwrap();

    assert_eq!(transport.calls_to(FIRST), 1);
    assert_eq!(transport.calls_to(SECOND), 1);
    assert_eq!(transport.calls_to(THIRD), 0);
    // 105 has one node and 106 references a missing node
    let ids: Vec<i64> = pipeline.roads().roads().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![100, 101, 102, 103, 104]);
    assert!(pipeline.roads().roads().iter().all(|r| r.geometry.len() >= 2));
}

#[tokio::test]
async fn test_three_failed_passes_are_terminal() {
    let transport = ScriptedTransport::new();
    transport.fail_status(FIRST, 503);
    transport.fail_transport(SECOND, "timed out");
    let mut pipeline = pipeline(&transport, &[FIRST, SECOND]);

    let err = pipeline.load_roads().await.unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(transport.calls().len(), 6);
    assert_eq!(pipeline.status(), LoadStatus::Failed { attempts: 3 });
    assert!(pipeline.search("Jid").is_empty());
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let transport = ScriptedTransport::new();
    transport.fail_status_once(FIRST, 502);
    transport.succeed(FIRST, roads_payload());
    let mut pipeline = pipeline(&transport, &[FIRST]);

    pipeline.load_roads().await.unwrap();

    assert_eq!(transport.calls_to(FIRST), 2);
    assert_eq!(
        pipeline.status(),
        LoadStatus::Loaded {
            named: 4,
            total: 5
        }
    );
}

#[tokio::test]
async fn test_one_label_per_name_per_tier() {
    let transport = ScriptedTransport::new();
    transport.succeed(FIRST, roads_payload());
    let mut pipeline = pipeline(&transport, &[FIRST]);

    pipeline.load_roads().await.unwrap();

    for &tier in LabelTier::all() {
        let labels = pipeline.labels().labels(tier);
        let mut names: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before, "duplicate label in {:?}", tier);
    }
    let major = pipeline.labels().labels(LabelTier::Major);
    assert_eq!(major.len(), 1);
    assert_eq!(major[0].road_id, 100);
}

#[tokio::test]
async fn test_search_ranks_prefix_first_without_places() {
    let transport = ScriptedTransport::new();
    transport.succeed(FIRST, roads_payload());
    let mut pipeline = pipeline(&transport, &[FIRST]);
    pipeline.load_roads().await.unwrap();

    let results = pipeline.search("Jid");

    assert!(results.places.is_empty());
    let names: Vec<&str> = results.roads.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Jidhka", "Jidka Weyn"]);
    assert_eq!(results.roads[1].id, 100);
    assert_eq!(results.roads[1].type_label, "primary");
}

#[tokio::test]
async fn test_duplicate_places_collapse_in_search() {
    let transport = ScriptedTransport::new();
    transport.succeed_matching(FIRST, "highway", roads_payload());
    transport.succeed_matching(
        FIRST,
        "\"amenity\"=\"bank\"",
        places_response(&[
            poi(1, "Dahabshiil", Category::Banks),
            poi(2, "Dahabshiil", Category::Banks),
            poi(3, "Premier Bank", Category::Banks),
        ]),
    );
    let mut pipeline = pipeline(&transport, &[FIRST]);
    pipeline.load_roads().await.unwrap();
    pipeline.get_or_fetch(Category::Banks).await.unwrap();

    let results = pipeline.search("dahab");

    assert_eq!(results.places.len(), 1);
    assert_eq!(results.places[0].id, 1);
    assert_eq!(results.places[0].category, Category::Banks);
}

#[tokio::test]
async fn test_focus_road_twice_equals_once() {
    let transport = ScriptedTransport::new();
    transport.succeed(FIRST, roads_payload());

    let mut once = pipeline(&transport, &[FIRST]);
    once.load_roads().await.unwrap();
    once.focus_road(102);

    let mut twice = pipeline(&transport, &[FIRST]);
    twice.load_roads().await.unwrap();
    twice.focus_road(102);
    twice.focus_road(102);

    assert_eq!(once.surface().styles(), twice.surface().styles());
    assert_eq!(once.surface().viewport(), twice.surface().viewport());

    let highlighted: Vec<i64> = twice
        .surface()
        .styles()
        .iter()
        .filter(|(_, style)| **style == PathStyle::highlight())
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(highlighted, vec![102]);
}
