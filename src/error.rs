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

//! Errors raised while building, sending and decoding transit.land queries.

use std::path::PathBuf;

/// Broad family of an [`Error`], telling whether retrying or fixing the
/// input can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something invalid; no request was sent.
    Configuration,
    /// The service answered with something that breaks its contract.
    Protocol,
    /// The transport itself failed (connection, I/O, exhausted retries).
    Transport,
}

/// The error type used by the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bounding box and a geometry file were both given.
    #[error("must provide either a bounding box or a geometry file, not both")]
    ConflictingGeometryInputs,

    /// A filter name not documented for the endpoint.
    #[error(
        "filter '{name}' is not supported by '{endpoint}', allowed filters are: {}",
        allowed.join(", ")
    )]
    UnsupportedFilter {
        /// Endpoint name.
        endpoint: &'static str,
        /// Offending filter name.
        name: String,
        /// Filters the endpoint accepts.
        allowed: &'static [&'static str],
    },

    /// The query geometry is neither a point nor an areal/linear geometry.
    #[error("geometry type must be one of {}, got {found}", allowed.join(", "))]
    InvalidGeometryType {
        /// Type of the rejected geometry.
        found: &'static str,
        /// Accepted geometry types.
        allowed: &'static [&'static str],
    },

    /// A date filter not written as `YYYY-MM-DD`.
    #[error("invalid date '{value}' for '{name}', expected format YYYY-MM-DD")]
    InvalidDateFormat {
        /// Filter name.
        name: String,
        /// Rejected value.
        value: String,
    },

    /// A bounding box string that is not `minlon,minlat,maxlon,maxlat`.
    #[error("invalid bounding box '{0}', expected 'minlon,minlat,maxlon,maxlat'")]
    InvalidBoundingBox(String),

    /// A geometry file that could not be turned into a geometry.
    #[error("invalid geometry file {}: {reason}", path.display())]
    GeometryFile {
        /// Path of the file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Geometric refinement was requested while record geometries are
    /// excluded from the results.
    #[error("cannot filter against a {0} when results are requested without geometry")]
    GeometryRequired(&'static str),

    /// A configuration file that could not be read.
    #[error("invalid configuration {}: {reason}", path.display())]
    InvalidConfiguration {
        /// Path of the configuration file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// An empty or unusable Onestop ID.
    #[error("invalid Onestop ID '{0}'")]
    InvalidOnestopId(String),

    /// A response which does not follow the expected envelope.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse {
        /// URL which produced the response.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The optional retry cap was reached.
    #[error("no successful response from {url} after {attempts} attempts (last status {status})")]
    RetriesExhausted {
        /// Requested URL.
        url: String,
        /// Number of requests sent.
        attempts: u32,
        /// Status of the last response.
        status: u16,
    },

    /// Failure of the HTTP transport.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// I/O failure, e.g. while writing records.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization failure while writing records.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Family of the error.
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            ConflictingGeometryInputs
            | UnsupportedFilter { .. }
            | InvalidGeometryType { .. }
            | InvalidDateFormat { .. }
            | InvalidBoundingBox(_)
            | GeometryFile { .. }
            | GeometryRequired(_)
            | InvalidConfiguration { .. }
            | InvalidOnestopId(_) => ErrorKind::Configuration,
            MalformedResponse { .. } => ErrorKind::Protocol,
            RetriesExhausted { .. } | Http(_) | Io(_) | Json(_) => ErrorKind::Transport,
        }
    }

    pub(crate) fn malformed<U, R>(url: U, reason: R) -> Self
    where
        U: Into<String>,
        R: Into<String>,
    {
        Error::MalformedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
