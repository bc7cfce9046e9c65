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

//! Geometry helpers: type tags, bounds and the prepared form used to refine
//! the records of a bounding box query.

use crate::{Error, Result};
use geo::{BoundingRect, Geometry, Intersects, Rect};
use serde_json::Value;

/// Geometry types which are searched by bounding box and then refined.
pub const INTERSECTION_TYPES: [&str; 4] = ["Polygon", "MultiPolygon", "LineString", "MultiLineString"];

/// Every geometry type accepted as a query geometry.
pub const ALLOWED_TYPES: [&str; 5] = [
    "Point",
    "Polygon",
    "MultiPolygon",
    "LineString",
    "MultiLineString",
];

/// How a query geometry is translated into API parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// Radius search around the point.
    Point,
    /// Bounding box search, refined by intersection.
    Intersection,
}

/// Name of the geometry type, as written in GeoJSON.
pub fn type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Classify a query geometry, rejecting the types the API cannot search by.
pub fn kind(geometry: &Geometry<f64>) -> Result<GeometryKind> {
    match geometry {
        Geometry::Point(_) => Ok(GeometryKind::Point),
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::LineString(_)
        | Geometry::MultiLineString(_) => Ok(GeometryKind::Intersection),
        other => Err(Error::InvalidGeometryType {
            found: type_name(other),
            allowed: &ALLOWED_TYPES,
        }),
    }
}

/// Bounding box of a geometry; `None` for an empty one.
pub fn bounds(geometry: &Geometry<f64>) -> Option<Rect<f64>> {
    geometry.bounding_rect()
}

/// Format a bounding box as `minlon,minlat,maxlon,maxlat`.
pub fn format_bounds(rect: &Rect<f64>) -> String {
    let (min, max) = (rect.min(), rect.max());
    [min.x, min.y, max.x, max.y]
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Float formatting for query parameters: plain decimal notation, never an
/// exponent, with at least one fractional digit.
pub(crate) fn format_number(value: f64) -> String {
    let formatted = value.to_string();
    if value.is_finite() && !formatted.contains('.') {
        format!("{}.0", formatted)
    } else {
        formatted
    }
}

/// A query geometry split into parts, each one with its own bounding box,
/// so most candidates are rejected without an exact intersection test.
#[derive(Debug, Clone)]
pub struct PreparedGeometry {
    bounds: Rect<f64>,
    parts: Vec<(Rect<f64>, Geometry<f64>)>,
}

impl PreparedGeometry {
    /// Prepare a Polygon, MultiPolygon, LineString or MultiLineString.
    pub fn new(geometry: &Geometry<f64>) -> Result<Self> {
        let parts: Vec<Geometry<f64>> = match geometry {
            Geometry::Polygon(_) | Geometry::LineString(_) => vec![geometry.clone()],
            Geometry::MultiPolygon(multi) => multi.iter().cloned().map(Geometry::from).collect(),
            Geometry::MultiLineString(multi) => {
                multi.iter().cloned().map(Geometry::from).collect()
            }
            other => {
                return Err(Error::InvalidGeometryType {
                    found: type_name(other),
                    allowed: &INTERSECTION_TYPES,
                })
            }
        };
        let parts: Vec<_> = parts
            .into_iter()
            .filter_map(|part| part.bounding_rect().map(|rect| (rect, part)))
            .collect();
        let bounds = bounds(geometry).ok_or(Error::InvalidGeometryType {
            found: "empty geometry",
            allowed: &INTERSECTION_TYPES,
        })?;
        Ok(PreparedGeometry { bounds, parts })
    }

    /// Exact intersection test.
    pub fn intersects(&self, other: &Geometry<f64>) -> bool {
        let other_bounds = match other.bounding_rect() {
            Some(rect) => rect,
            None => return false,
        };
        if !self.bounds.intersects(&other_bounds) {
            return false;
        }
        self.parts
            .iter()
            .any(|(rect, part)| rect.intersects(&other_bounds) && part.intersects(other))
    }
}

/// Parse the GeoJSON geometry object embedded in a record.
///
/// `Ok(None)` when the record carries no geometry (missing or `null`).
pub fn record_geometry(record: &Value) -> std::result::Result<Option<Geometry<f64>>, String> {
    let value = match record.get("geometry") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value.clone(),
    };
    let geometry = geojson::Geometry::from_json_value(value).map_err(|e| e.to_string())?;
    Geometry::<f64>::try_from(geometry)
        .map(Some)
        .map_err(|e| e.to_string())
}
