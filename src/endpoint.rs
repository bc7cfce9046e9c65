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

//! Static description of the transit.land endpoints: where they live and how
//! their responses are shaped.

use crate::{Error, Result};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

/// How the records of a response are wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{"type": "FeatureCollection", "features": [...], "meta": {...}}`
    FeatureCollection,
    /// `{"<key>": [...], "meta": {...}}`
    Keyed(&'static str),
    /// A single JSON document, never paged.
    Single,
}

/// Endpoint attributes which never change.
#[derive(Debug)]
pub struct EndpointDescriptor {
    /// Name of the resource, also the first path segment.
    pub name: &'static str,
    /// Appended to the name to form the path.
    pub suffix: &'static str,
    /// Shape of the responses.
    pub envelope: Envelope,
    /// Filters the endpoint accepts.
    pub allowed_filters: &'static [&'static str],
}

/// Paged resources of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Stops.
    Stops,
    /// Operators.
    Operators,
    /// Routes.
    Routes,
    /// Route stop patterns.
    RouteStopPatterns,
    /// Schedule stop pairs.
    ScheduleStopPairs,
}

static DESCRIPTORS: [EndpointDescriptor; 5] = [
    EndpointDescriptor {
        name: "stops",
        suffix: ".geojson",
        envelope: Envelope::FeatureCollection,
        allowed_filters: &["served_by", "gtfs_id"],
    },
    EndpointDescriptor {
        name: "operators",
        suffix: ".geojson",
        envelope: Envelope::FeatureCollection,
        allowed_filters: &["gtfs_id"],
    },
    EndpointDescriptor {
        name: "routes",
        suffix: ".geojson",
        envelope: Envelope::FeatureCollection,
        allowed_filters: &["operated_by", "vehicle_type", "gtfs_id", "include_geometry"],
    },
    EndpointDescriptor {
        name: "route_stop_patterns",
        suffix: ".geojson",
        envelope: Envelope::FeatureCollection,
        allowed_filters: &["traversed_by", "stops_visited", "trips"],
    },
    EndpointDescriptor {
        name: "schedule_stop_pairs",
        suffix: "",
        envelope: Envelope::Keyed("schedule_stop_pairs"),
        allowed_filters: &[
            "origin_onestop_id",
            "destination_onestop_id",
            "date",
            "service_from_date",
            "service_before_date",
            "origin_departure_between",
            "trip",
            "route_onestop_id",
            "operator_onestop_id",
            "active",
        ],
    },
];

impl Endpoint {
    /// All paged endpoints.
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Stops,
        Endpoint::Operators,
        Endpoint::Routes,
        Endpoint::RouteStopPatterns,
        Endpoint::ScheduleStopPairs,
    ];

    /// Static attributes of the endpoint.
    pub fn descriptor(self) -> &'static EndpointDescriptor {
        let idx = match self {
            Endpoint::Stops => 0,
            Endpoint::Operators => 1,
            Endpoint::Routes => 2,
            Endpoint::RouteStopPatterns => 3,
            Endpoint::ScheduleStopPairs => 4,
        };
        &DESCRIPTORS[idx]
    }

    /// Name of the resource.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// URL of the first page.
    pub fn url(self, base_url: &str) -> String {
        let descriptor = self.descriptor();
        format!(
            "{}/{}{}",
            base_url.trim_end_matches('/'),
            descriptor.name,
            descriptor.suffix
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Endpoint::ALL
            .iter()
            .copied()
            .find(|endpoint| endpoint.name() == s)
            .ok_or_else(|| format!("unknown endpoint '{}'", s))
    }
}

/// URL of the lookup of one entity by its Onestop ID.
///
/// The identifier goes into the path and is percent-encoded, Onestop IDs
/// may contain characters like `~`, `<` or `>`.
pub fn onestop_id_url(base_url: &str, onestop_id: &str) -> Result<String> {
    let onestop_id = onestop_id.trim();
    if onestop_id.is_empty() {
        return Err(Error::InvalidOnestopId(onestop_id.to_string()));
    }
    let mut url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
        Error::InvalidConfiguration {
            path: base_url.into(),
            reason: e.to_string(),
        }
    })?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidOnestopId(onestop_id.to_string()))?
        .pop_if_empty()
        .push("onestop_id")
        .push(onestop_id);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    mod url {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn geojson_endpoints() {
            assert_eq!(
                Endpoint::Stops.url("https://transit.land/api/v1"),
                "https://transit.land/api/v1/stops.geojson"
            );
            assert_eq!(
                Endpoint::RouteStopPatterns.url("https://transit.land/api/v1/"),
                "https://transit.land/api/v1/route_stop_patterns.geojson"
            );
        }

        #[test]
        fn plain_endpoint_has_no_suffix() {
            assert_eq!(
                Endpoint::ScheduleStopPairs.url("https://transit.land/api/v1"),
                "https://transit.land/api/v1/schedule_stop_pairs"
            );
            assert_eq!(
                Endpoint::ScheduleStopPairs.descriptor().envelope,
                Envelope::Keyed("schedule_stop_pairs")
            );
        }

        #[test]
        fn routes_use_the_routes_endpoint() {
            assert_eq!(
                Endpoint::Routes.url("https://transit.land/api/v1"),
                "https://transit.land/api/v1/routes.geojson"
            );
        }
    }

    mod onestop_id_url {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn identifier_in_path() {
            assert_eq!(
                onestop_id_url("https://transit.land/api/v1", "o-9q9-bart").unwrap(),
                "https://transit.land/api/v1/onestop_id/o-9q9-bart"
            );
        }

        #[test]
        fn identifier_is_encoded() {
            assert_eq!(
                onestop_id_url("https://transit.land/api/v1/", "s-9q8-main~st<12>").unwrap(),
                "https://transit.land/api/v1/onestop_id/s-9q8-main~st%3C12%3E"
            );
        }

        #[test]
        fn blank_identifier() {
            let err = onestop_id_url("https://transit.land/api/v1", "  ").unwrap_err();
            assert!(matches!(err, Error::InvalidOnestopId(_)));
        }
    }

    #[test]
    fn endpoint_from_name() {
        for endpoint in Endpoint::ALL {
            assert_eq!(endpoint.name().parse::<Endpoint>().unwrap(), endpoint);
        }
        assert!("onestop_id".parse::<Endpoint>().is_err());
    }
}
