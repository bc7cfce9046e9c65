// Copyright (C) 2025 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

use mockito::{mock, Matcher};
use pretty_assertions::assert_eq;
use std::fs;
use transitland::{geometry_file, Client, Config, Page, Query, Result};

fn config() -> Config {
    Config {
        base_url: format!("{}/api/v1", mockito::server_url()),
        backoff_ms: 10,
        ..Config::default()
    }
}

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/responses/{}", name)).unwrap()
}

fn onestop_ids(pages: &[Page]) -> Vec<Vec<String>> {
    pages
        .iter()
        .map(|page| {
            page.iter()
                .map(|record| record["properties"]["onestop_id"].as_str().unwrap().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn onestop_id_lookup() {
    let m = mock("GET", "/api/v1/onestop_id/o-9q9-bart")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(fixture("operator_bart.json"))
        .expect(1)
        .create();

    let client = Client::new(config()).unwrap();
    let pages: Vec<Page> = client
        .onestop_id("o-9q9-bart")
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    m.assert();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].len(), 1);
    assert_eq!(pages[0][0]["short_name"], "BART");
}

#[test]
fn point_search_sends_lon_lat_and_radius() {
    let body = r#"{"type":"FeatureCollection","features":[],"meta":{"next":null}}"#;
    let m = mock("GET", "/api/v1/operators.geojson")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lon".into(), "-122.4194".into()),
            Matcher::UrlEncoded("lat".into(), "37.7749".into()),
            Matcher::UrlEncoded("r".into(), "500.0".into()),
            Matcher::UrlEncoded("gtfs_id".into(), "BART".into()),
            Matcher::UrlEncoded("imported_with_gtfs_id".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(body)
        .expect(1)
        .create();

    let client = Client::new(config()).unwrap();
    let query = Query::operators()
        .geometry(Some(geo::point!(x: -122.4194, y: 37.7749).into()))
        .radius(Some(500.0))
        .filter("gtfs_id", "BART");
    let pages: Vec<Page> = client.fetch(&query).unwrap().collect::<Result<_>>().unwrap();

    m.assert();
    assert_eq!(pages, vec![Page::new()]);
}

#[test]
fn polygon_search_pages_and_refines() {
    let next = format!(
        "{}/api/v1/stops.geojson?offset=2&per_page=2",
        mockito::server_url()
    );
    let first = mock("GET", "/api/v1/stops.geojson")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("bbox".into(), "-122.427,37.748,-122.405,37.77".into()),
            Matcher::UrlEncoded("per_page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(fixture("stops_page_1.json").replace("{{NEXT}}", &next))
        .expect(1)
        .create();
    let second = mock("GET", "/api/v1/stops.geojson")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), "2".into()),
            Matcher::UrlEncoded("per_page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(fixture("stops_page_2.json"))
        .expect(1)
        .create();

    let geometry =
        geometry_file::load_geometry_file("tests/fixtures/geometry/mission.geojson").unwrap();
    let query = Query::stops().geometry(Some(geometry)).per_page(2);
    let client = Client::new(config()).unwrap();
    let pages: Vec<Page> = client.fetch(&query).unwrap().collect::<Result<_>>().unwrap();

    first.assert();
    second.assert();
    assert_eq!(
        onestop_ids(&pages),
        vec![
            vec!["s-9q8yy-16thstreetmission".to_string()],
            vec!["s-9q8yy-24thstreetmission".to_string()],
        ]
    );
}

#[test]
fn first_page_only() {
    let next = format!(
        "{}/api/v1/route_stop_patterns.geojson?offset=50",
        mockito::server_url()
    );
    let body = format!(
        r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","geometry":null,"properties":{{"onestop_id":"r-9q9-richmond~fremont-aaaa"}}}}],"meta":{{"next":"{}"}}}}"#,
        next
    );
    let m = mock("GET", "/api/v1/route_stop_patterns.geojson")
        .match_query(Matcher::UrlEncoded("traversed_by".into(), "r-9q9-richmond~fremont".into()))
        .with_status(200)
        .with_body(body)
        .expect(1)
        .create();

    let query = Query::route_stop_patterns()
        .filter("traversed_by", "r-9q9-richmond~fremont")
        .page_all(false);
    let client = Client::new(config()).unwrap();
    let pages: Vec<Page> = client.fetch(&query).unwrap().collect::<Result<_>>().unwrap();

    m.assert();
    assert_eq!(pages.len(), 1);
}

#[test]
fn unexpected_status_is_retried() {
    let failing = mock("GET", "/api/v1/onestop_id/s-9q8yy-flaky")
        .with_status(502)
        .expect(3)
        .create();

    let client = Client::new(Config {
        max_retries: Some(2),
        ..config()
    })
    .unwrap();
    let err = client
        .onestop_id("s-9q8yy-flaky")
        .unwrap()
        .next()
        .unwrap()
        .unwrap_err();

    failing.assert();
    assert_eq!(err.kind(), transitland::ErrorKind::Transport);
}

#[test]
fn malformed_envelope_is_reported() {
    let m = mock("GET", "/api/v1/schedule_stop_pairs")
        .match_query(Matcher::UrlEncoded("trip".into(), "unit-test-trip".into()))
        .with_status(200)
        .with_body(r#"{"type":"FeatureCollection","features":[],"meta":{}}"#)
        .create();

    let query = Query::schedule_stop_pairs().filter("trip", "unit-test-trip");
    let client = Client::new(config()).unwrap();
    let mut pages = client.fetch(&query).unwrap();
    let err = pages.next().unwrap().unwrap_err();

    m.assert();
    assert_eq!(err.kind(), transitland::ErrorKind::Protocol);
    assert!(pages.next().is_none());
}
