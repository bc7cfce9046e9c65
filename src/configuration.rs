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

//! Settings of the client, optionally read from a JSON file.

use crate::{http::RetryPolicy, Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root of the transit.land REST API.
pub const DEFAULT_BASE_URL: &str = "https://transit.land/api/v1";

/// Delay before sending again a request which did not succeed.
pub const DEFAULT_BACKOFF_MS: u64 = 2000;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Client configuration.
///
/// Below is an example of a configuration file, every field is optional
/// ```text
/// {
///     "base_url": "https://transit.land/api/v1",
///     "backoff_ms": 2000,
///     "max_retries": 30,
///     "timeout_secs": 60,
///     "user_agent": "my-tool/1.0"
/// }
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root URL the endpoint paths are appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fixed delay between two attempts of the same request.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Maximum number of retries of one request, unlimited when absent.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Timeout of a single HTTP call, none when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            backoff_ms: default_backoff_ms(),
            max_retries: None,
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Read the configuration from a JSON file, or use the defaults when no
    /// file is given.
    pub fn read<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        let config_path = match config_path {
            Some(config_path) => config_path,
            None => return Ok(Config::default()),
        };
        let config_path = config_path.as_ref();
        info!("Reading configuration from {:?}", config_path);
        let invalid = |reason: String| Error::InvalidConfiguration {
            path: config_path.to_path_buf(),
            reason,
        };
        let file = File::open(config_path).map_err(|e| invalid(e.to_string()))?;
        let config: Config = serde_json::from_reader(file).map_err(|e| invalid(e.to_string()))?;
        if config.base_url.trim().is_empty() {
            return Err(invalid("'base_url' is empty".to_string()));
        }
        Ok(config)
    }

    /// Retry behaviour of the HTTP layer.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_millis(self.backoff_ms),
            max_retries: self.max_retries,
        }
    }
}
