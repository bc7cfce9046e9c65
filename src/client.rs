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

//! Entry point of the library: turns a [`Query`] into a lazy sequence of
//! pages of records.

use crate::{
    configuration::Config,
    endpoint::{self, Envelope},
    geometry::{self, PreparedGeometry},
    http::{ReqwestTransport, RetryPolicy, Transport},
    pagination::Pages,
    params::{self, FilterValue, Params, Query},
    refine::{self, RefinedPages},
    Error, Result,
};
use tracing::{debug, info};

/// Client of the transit.land API.
///
/// ```no_run
/// use transitland::{Client, Config, Query};
///
/// let client = Client::new(Config::default())?;
/// let query = Query::stops().filter("served_by", vec!["o-9q9-bart"]);
/// for page in client.fetch(&query)? {
///     for stop in page? {
///         println!("{}", stop["properties"]["onestop_id"]);
///     }
/// }
/// # Ok::<(), transitland::Error>(())
/// ```
pub struct Client<T = ReqwestTransport> {
    transport: T,
    base_url: String,
    policy: RetryPolicy,
}

impl Client<ReqwestTransport> {
    /// Client sending its requests over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Client::with_transport(config, transport))
    }
}

impl<T: Transport> Client<T> {
    /// Client sending its requests through `transport`.
    pub fn with_transport(config: Config, transport: T) -> Self {
        let policy = config.retry_policy();
        Client {
            transport,
            base_url: config.base_url,
            policy,
        }
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Pages of records matching a query.
    ///
    /// The query is validated here, so an invalid query fails before
    /// anything is sent. Nothing is requested until the returned iterator is
    /// advanced. When the query geometry is a polygon or a line, the server
    /// is asked for its bounding box and records which do not intersect the
    /// geometry itself are removed from each page.
    pub fn fetch(&self, query: &Query) -> Result<RefinedPages<Pages<'_, T>>> {
        let params = params::build_params(query)?;
        let descriptor = query.endpoint.descriptor();
        let predicate = match &query.geometry {
            Some(query_geometry) if query.needs_refinement() => {
                if descriptor.envelope != Envelope::FeatureCollection {
                    debug!(
                        "'{}' records carry no geometry, relying on the bounding box only",
                        descriptor.name
                    );
                    None
                } else if query.filters.get("include_geometry") == Some(&FilterValue::Bool(false))
                {
                    return Err(Error::GeometryRequired(geometry::type_name(query_geometry)));
                } else {
                    let prepared = PreparedGeometry::new(query_geometry)?;
                    Some(refine::intersection_predicate(prepared))
                }
            }
            _ => None,
        };
        let url = query.endpoint.url(&self.base_url);
        info!("Querying {} with {:?}", url, params);
        let pages = Pages::new(
            &self.transport,
            &self.policy,
            descriptor.envelope,
            url,
            params,
            query.page_all,
        );
        Ok(RefinedPages::new(pages, predicate))
    }

    /// The entity identified by a Onestop ID, as a single page holding one
    /// document.
    pub fn onestop_id(&self, onestop_id: &str) -> Result<Pages<'_, T>> {
        let url = endpoint::onestop_id_url(&self.base_url, onestop_id)?;
        info!("Looking up {}", url);
        Ok(Pages::new(
            &self.transport,
            &self.policy,
            Envelope::Single,
            url,
            Params::new(),
            false,
        ))
    }
}
