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

//! Translation of a semantic [`Query`] into the flat query string the API
//! expects.

use crate::{
    endpoint::Endpoint,
    geometry::{self, GeometryKind},
    Error, Result,
};
use chrono::NaiveDate;
use geo::Geometry;
use std::collections::BTreeMap;

/// Query parameters of a request.
pub type Params = BTreeMap<String, String>;

/// Page size used by the service when `per_page` is not sent.
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Filters holding a calendar date.
pub const DATE_FILTERS: [&str; 3] = ["date", "service_from_date", "service_before_date"];

/// Value of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Sent verbatim.
    Str(String),
    /// Sent comma separated.
    List(Vec<String>),
    /// Sent as `true` or `false`.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::List(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        FilterValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl FilterValue {
    fn to_param(&self) -> String {
        match self {
            FilterValue::Str(s) => s.clone(),
            FilterValue::List(values) => values.join(","),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Float(f) => geometry::format_number(*f),
        }
    }
}

/// A request to one of the paged endpoints.
#[derive(Debug, Clone)]
pub struct Query {
    /// Requested endpoint.
    pub endpoint: Endpoint,
    /// Endpoint specific filters.
    pub filters: BTreeMap<String, FilterValue>,
    /// Area of interest.
    pub geometry: Option<Geometry<f64>>,
    /// Search radius in meters around a point geometry.
    pub radius: Option<f64>,
    /// Number of records per page.
    pub per_page: u32,
    /// Follow the pages until the last one, or stop after the first.
    pub page_all: bool,
}

impl Query {
    /// Empty query on an endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Query {
            endpoint,
            filters: BTreeMap::new(),
            geometry: None,
            radius: None,
            per_page: DEFAULT_PER_PAGE,
            page_all: true,
        }
    }

    /// Query on stops.
    pub fn stops() -> Self {
        Query::new(Endpoint::Stops)
    }

    /// Query on operators.
    pub fn operators() -> Self {
        Query::new(Endpoint::Operators)
    }

    /// Query on routes.
    pub fn routes() -> Self {
        Query::new(Endpoint::Routes)
    }

    /// Query on route stop patterns.
    pub fn route_stop_patterns() -> Self {
        Query::new(Endpoint::RouteStopPatterns)
    }

    /// Query on schedule stop pairs.
    pub fn schedule_stop_pairs() -> Self {
        Query::new(Endpoint::ScheduleStopPairs)
    }

    /// Add a filter.
    pub fn filter<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.filters.insert(name.into(), value.into());
        self
    }

    /// Add a filter only when a value is given.
    pub fn filter_opt<K, V>(self, name: K, value: Option<V>) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        match value {
            Some(value) => self.filter(name, value),
            None => self,
        }
    }

    /// Add a multi-valued filter only when it holds at least one value.
    pub fn filter_list<K: Into<String>>(self, name: K, values: Vec<String>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.filter(name, values)
        }
    }

    /// Restrict the query to a geometry.
    pub fn geometry(mut self, geometry: Option<Geometry<f64>>) -> Self {
        self.geometry = geometry;
        self
    }

    /// Search radius around a point geometry.
    pub fn radius(mut self, radius: Option<f64>) -> Self {
        self.radius = radius;
        self
    }

    /// Page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Whether to request all pages.
    pub fn page_all(mut self, page_all: bool) -> Self {
        self.page_all = page_all;
        self
    }

    /// `true` when results must be refined against the query geometry.
    pub fn needs_refinement(&self) -> bool {
        matches!(
            self.geometry.as_ref().map(geometry::kind),
            Some(Ok(GeometryKind::Intersection))
        )
    }
}

fn check_date(name: &str, value: &FilterValue) -> Result<()> {
    let invalid = || Error::InvalidDateFormat {
        name: name.to_string(),
        value: value.to_param(),
    };
    let s = match value {
        FilterValue::Str(s) => s,
        _ => return Err(invalid()),
    };
    let well_formed = s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if well_formed && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Check the filters of a query against what its endpoint accepts.
pub fn validate(query: &Query) -> Result<()> {
    let descriptor = query.endpoint.descriptor();
    for (name, value) in &query.filters {
        if !descriptor.allowed_filters.contains(&name.as_str()) {
            return Err(Error::UnsupportedFilter {
                endpoint: descriptor.name,
                name: name.clone(),
                allowed: descriptor.allowed_filters,
            });
        }
        if DATE_FILTERS.contains(&name.as_str()) {
            check_date(name, value)?;
        }
    }
    Ok(())
}

/// Build the query parameters of the first request of a query.
///
/// A point geometry becomes a radius search (`lon`, `lat` and `r`), an
/// areal or linear geometry becomes a `bbox` search whose results are
/// expected to be refined afterwards.
pub fn build_params(query: &Query) -> Result<Params> {
    validate(query)?;
    let mut params = Params::new();

    if let Some(geometry) = &query.geometry {
        match (geometry::kind(geometry)?, geometry) {
            (GeometryKind::Point, Geometry::Point(point)) => {
                params.insert("lon".into(), geometry::format_number(point.x()));
                params.insert("lat".into(), geometry::format_number(point.y()));
                if let Some(radius) = query.radius {
                    params.insert("r".into(), geometry::format_number(radius));
                }
            }
            (_, geometry) => {
                let rect = geometry::bounds(geometry).ok_or(Error::InvalidGeometryType {
                    found: "empty geometry",
                    allowed: &geometry::ALLOWED_TYPES,
                })?;
                params.insert("bbox".into(), geometry::format_bounds(&rect));
            }
        }
    }

    if query.per_page != DEFAULT_PER_PAGE {
        params.insert("per_page".into(), query.per_page.to_string());
    }

    for (name, value) in &query.filters {
        match (name.as_str(), value) {
            ("gtfs_id", _) => {
                params.insert("imported_with_gtfs_id".into(), "true".into());
                params.insert(name.clone(), value.to_param());
            }
            ("include_geometry", FilterValue::Bool(true)) => {}
            ("active", FilterValue::Bool(false)) => {}
            _ => {
                params.insert(name.clone(), value.to_param());
            }
        }
    }

    Ok(params)
}
