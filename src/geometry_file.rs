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

//! Query geometries given on the command line: a bounding box string or a
//! GeoJSON/WKT file.

use crate::{Error, Result};
use geo::{BooleanOps, Coord, Geometry, GeometryCollection, MultiLineString, MultiPolygon, Rect};
use geojson::GeoJson;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Parse `minlon,minlat,maxlon,maxlat` into the matching box polygon.
pub fn parse_bbox(bbox: &str) -> Result<Geometry<f64>> {
    let invalid = || Error::InvalidBoundingBox(bbox.to_string());
    let values = bbox
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|_| invalid())?;
    match values.as_slice() {
        &[min_lon, min_lat, max_lon, max_lat]
            if values.iter().all(|v| v.is_finite()) && min_lon <= max_lon && min_lat <= max_lat =>
        {
            let rect = Rect::new(
                Coord {
                    x: min_lon,
                    y: min_lat,
                },
                Coord {
                    x: max_lon,
                    y: max_lat,
                },
            );
            Ok(Geometry::Polygon(rect.to_polygon()))
        }
        _ => Err(invalid()),
    }
}

fn file_error<P: AsRef<Path>>(path: P, reason: impl ToString) -> Error {
    Error::GeometryFile {
        path: path.as_ref().to_path_buf(),
        reason: reason.to_string(),
    }
}

fn is_lon_lat(crs_name: &str) -> bool {
    let crs_name = crs_name.to_ascii_uppercase();
    crs_name.ends_with("CRS84")
        || (crs_name.contains("EPSG") && crs_name.rsplit(':').next() == Some("4326"))
}

// GeoJSON files written before RFC 7946 may name their CRS in a top-level
// `crs` member; only longitude/latitude coordinates can be searched by.
fn check_crs(path: &Path, geojson: &GeoJson) -> Result<()> {
    let foreign_members = match geojson {
        GeoJson::FeatureCollection(collection) => collection.foreign_members.as_ref(),
        GeoJson::Feature(feature) => feature.foreign_members.as_ref(),
        GeoJson::Geometry(geometry) => geometry.foreign_members.as_ref(),
    };
    let crs = match foreign_members.and_then(|members| members.get("crs")) {
        None | Some(Value::Null) => return Ok(()),
        Some(crs) => crs,
    };
    match crs.pointer("/properties/name").and_then(Value::as_str) {
        Some(name) if is_lon_lat(name) => Ok(()),
        Some(name) => Err(file_error(
            path,
            format!("coordinates must be in EPSG:4326, found CRS '{}'", name),
        )),
        None => Err(file_error(path, format!("unsupported CRS {}", crs))),
    }
}

fn read_geojson(path: &Path, content: &str) -> Result<GeometryCollection<f64>> {
    let geojson = GeoJson::from_str(content).map_err(|e| file_error(path, e))?;
    check_crs(path, &geojson)?;
    GeometryCollection::<f64>::try_from(&geojson).map_err(|e| file_error(path, e))
}

fn read_wkt(path: &Path, content: &str) -> Result<GeometryCollection<f64>> {
    let wkt = wkt::Wkt::<f64>::from_str(content.trim()).map_err(|e| file_error(path, e))?;
    let geometry: Geometry<f64> = wkt.try_into().map_err(|e| file_error(path, e))?;
    Ok(match geometry {
        Geometry::GeometryCollection(collection) => collection,
        geometry => GeometryCollection::new_from(vec![geometry]),
    })
}

/// Coalesce the geometries of a file into a single one: polygons are
/// merged by union, lines gathered into a MultiLineString.
pub fn unify(collection: GeometryCollection<f64>) -> Option<Geometry<f64>> {
    let mut geometries: Vec<Geometry<f64>> = collection.into_iter().collect();
    match geometries.len() {
        0 => return None,
        1 => return geometries.pop(),
        _ => {}
    }
    let polygonal = geometries
        .iter()
        .all(|g| matches!(g, Geometry::Polygon(_) | Geometry::MultiPolygon(_)));
    let linear = geometries
        .iter()
        .all(|g| matches!(g, Geometry::LineString(_) | Geometry::MultiLineString(_)));
    if polygonal {
        let union = geometries
            .into_iter()
            .fold(MultiPolygon::<f64>::new(vec![]), |union, g| match g {
                Geometry::Polygon(p) => union.union(&MultiPolygon::new(vec![p])),
                Geometry::MultiPolygon(mp) => union.union(&mp),
                _ => union,
            });
        let mut polygons = union.0;
        if polygons.len() == 1 {
            polygons.pop().map(Geometry::Polygon)
        } else {
            Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
    } else if linear {
        let lines = geometries
            .into_iter()
            .flat_map(|g| match g {
                Geometry::LineString(l) => vec![l],
                Geometry::MultiLineString(ml) => ml.0,
                _ => vec![],
            })
            .collect();
        Some(Geometry::MultiLineString(MultiLineString::new(lines)))
    } else {
        Some(Geometry::GeometryCollection(GeometryCollection::new_from(
            geometries,
        )))
    }
}

/// Load the geometry stored in a file.
///
/// Files with a `.wkt` extension are read as WKT, anything else as GeoJSON.
/// Coordinates are expected in longitude/latitude (EPSG:4326): a GeoJSON
/// file naming any other CRS is rejected.
pub fn load_geometry_file<P: AsRef<Path>>(path: P) -> Result<Geometry<f64>> {
    let path = path.as_ref();
    info!("Reading geometry from {:?}", path);
    let content = fs::read_to_string(path).map_err(|e| file_error(path, e))?;
    let collection = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("wkt") => read_wkt(path, &content)?,
        _ => read_geojson(path, &content)?,
    };
    unify(collection).ok_or_else(|| file_error(path, "no geometry found"))
}

/// Turn the mutually exclusive geometry options into the query geometry.
pub fn resolve_geometry<P: AsRef<Path>>(
    bbox: Option<&str>,
    geometry_file: Option<P>,
) -> Result<Option<Geometry<f64>>> {
    match (bbox, geometry_file) {
        (Some(_), Some(_)) => Err(Error::ConflictingGeometryInputs),
        (Some(bbox), None) => parse_bbox(bbox).map(Some),
        (None, Some(path)) => load_geometry_file(path).map(Some),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_file_with_content;
    use geo::{line_string, point, polygon, Area};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    mod parse_bbox {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn box_polygon() {
            let geometry = parse_bbox("-122.5, 37.7,-122.3,37.9").unwrap();
            let rect = crate::geometry::bounds(&geometry).unwrap();
            assert_eq!(
                crate::geometry::format_bounds(&rect),
                "-122.5,37.7,-122.3,37.9"
            );
            assert!(matches!(geometry, Geometry::Polygon(_)));
        }

        #[test]
        fn invalid() {
            for bbox in ["1,2,3", "a,b,c,d", "3,0,1,1", "0,0,1,1,2", ""] {
                assert!(
                    matches!(parse_bbox(bbox), Err(Error::InvalidBoundingBox(_))),
                    "{} should be rejected",
                    bbox
                );
            }
        }
    }

    mod unify {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn polygons_are_merged() {
            let collection = GeometryCollection::new_from(vec![
                polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)].into(),
                polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0)].into(),
            ]);
            let unified = unify(collection).unwrap();
            match unified {
                Geometry::Polygon(polygon) => {
                    approx::assert_relative_eq!(polygon.unsigned_area(), 3.0, epsilon = 1e-9)
                }
                other => panic!("expected a polygon, got {:?}", other),
            }
        }

        #[test]
        fn lines_are_gathered() {
            let collection = GeometryCollection::new_from(vec![
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
                line_string![(x: 2.0, y: 2.0), (x: 3.0, y: 3.0)].into(),
            ]);
            match unify(collection).unwrap() {
                Geometry::MultiLineString(lines) => assert_eq!(lines.0.len(), 2),
                other => panic!("expected lines, got {:?}", other),
            }
        }

        #[test]
        fn mixed_content_is_a_collection() {
            let collection = GeometryCollection::new_from(vec![
                point!(x: 0.0, y: 0.0).into(),
                line_string![(x: 2.0, y: 2.0), (x: 3.0, y: 3.0)].into(),
            ]);
            assert!(matches!(
                unify(collection),
                Some(Geometry::GeometryCollection(_))
            ));
        }

        #[test]
        fn empty() {
            assert_eq!(unify(GeometryCollection::new_from(vec![])), None);
        }
    }

    mod load_geometry_file {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn geojson_feature_collection() {
            let geometry = load_geometry_file("tests/fixtures/geometry/mission.geojson").unwrap();
            assert!(matches!(geometry, Geometry::Polygon(_)));
        }

        #[test]
        fn wkt_linestring() {
            let dir = TempDir::new().unwrap();
            let path = create_file_with_content(
                dir.path(),
                "line.wkt",
                "LINESTRING (-122.42 37.76, -122.40 37.78)\n",
            );
            let geometry = load_geometry_file(&path).unwrap();
            assert_eq!(
                geometry,
                Geometry::LineString(line_string![(x: -122.42, y: 37.76), (x: -122.40, y: 37.78)])
            );
        }

        #[test]
        fn unreadable_content() {
            let dir = TempDir::new().unwrap();
            let path = create_file_with_content(dir.path(), "broken.geojson", "{\"type\": 3}");
            let err = load_geometry_file(&path).unwrap_err();
            assert!(matches!(err, Error::GeometryFile { .. }));
        }

        #[test]
        fn projected_crs_is_rejected() {
            let err =
                load_geometry_file("tests/fixtures/geometry/mission_3857.geojson").unwrap_err();
            assert!(matches!(err, Error::GeometryFile { .. }));
            assert!(err.to_string().contains("EPSG::3857"));
        }

        #[test]
        fn lon_lat_crs_is_accepted() {
            let dir = TempDir::new().unwrap();
            let path = create_file_with_content(
                dir.path(),
                "crs84.geojson",
                r#"{
                    "type": "Feature",
                    "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}},
                    "properties": {},
                    "geometry": {"type": "LineString", "coordinates": [[-122.42, 37.76], [-122.40, 37.78]]}
                }"#,
            );
            let geometry = load_geometry_file(&path).unwrap();
            assert!(matches!(geometry, Geometry::LineString(_)));
        }

        #[test]
        fn missing_file() {
            let err = load_geometry_file("tests/fixtures/geometry/missing.geojson").unwrap_err();
            assert!(matches!(err, Error::GeometryFile { .. }));
        }
    }

    mod resolve_geometry {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn both_inputs_are_rejected() {
            let err = resolve_geometry(
                Some("0,0,1,1"),
                Some("tests/fixtures/geometry/mission.geojson"),
            )
            .unwrap_err();
            assert!(matches!(err, Error::ConflictingGeometryInputs));
            assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        }

        #[test]
        fn no_input() {
            assert_eq!(resolve_geometry(None, None::<&Path>).unwrap(), None);
        }
    }
}
