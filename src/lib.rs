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

//! The `transitland` crate is a client of the [transit.land](https://transit.land)
//! API. It builds queries on stops, operators, routes, route stop patterns
//! and schedule stop pairs, pages through the responses lazily and, when
//! the area of interest is a polygon or a line, keeps only the records
//! which really intersect it.

#![deny(missing_docs)]

pub mod client;
pub mod configuration;
pub mod endpoint;
mod error;
pub mod geometry;
pub mod geometry_file;
pub mod http;
pub mod output;
pub mod pagination;
pub mod params;
pub mod refine;
#[doc(hidden)]
pub mod test_utils;
mod version_utils;
pub use version_utils::{binary_full_version, GIT_VERSION};

pub use crate::client::Client;
pub use crate::configuration::Config;
pub use crate::endpoint::Endpoint;
pub use crate::error::{Error, ErrorKind};
pub use crate::pagination::{Page, Pages};
pub use crate::params::{FilterValue, Query};

/// The corresponding result type used by the crate.
pub type Result<T> = std::result::Result<T, Error>;
