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

//! Sending a request to the API, retrying until it succeeds.

use crate::{configuration::Config, params::Params, Error, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl Response {
    /// Build a response.
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Response {
            status,
            body: body.into(),
        }
    }
}

/// Performs a single blocking GET request.
///
/// Implementations report a response whatever its status; only failures of
/// the transport itself are errors.
pub trait Transport {
    /// Send `GET url?params`.
    fn get(&self, url: &str, params: &Params) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, params: &Params) -> Result<Response> {
        (**self).get(url, params)
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build the HTTP client described by the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, params: &Params) -> Result<Response> {
        let response = self.client.get(url).query(params).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(Response { status, body })
    }
}

/// When and how often a failed request is sent again.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Fixed delay before each retry.
    pub backoff: Duration,
    /// Maximum number of retries; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            backoff: Duration::from_millis(crate::configuration::DEFAULT_BACKOFF_MS),
            max_retries: None,
        }
    }
}

/// Send a request until the service answers with a `200`.
///
/// The service allows about 60 requests per minute and answers `429` beyond
/// that; any status other than `200` is retried after `policy.backoff`.
/// Statuses other than `429` are also reported as warnings.
pub fn send<T>(transport: &T, policy: &RetryPolicy, url: &str, params: &Params) -> Result<Response>
where
    T: Transport + ?Sized,
{
    let mut retries = 0;
    loop {
        debug!("GET {} {:?}", url, params);
        let response = transport.get(url, params)?;
        match response.status {
            200 => return Ok(response),
            429 => info!("Rate limited on {}, retrying in {:?}", url, policy.backoff),
            status => warn!(
                "Unexpected status {} from {} with parameters {:?}, retrying in {:?}",
                status, url, params, policy.backoff
            ),
        }
        if let Some(max_retries) = policy.max_retries {
            if retries >= max_retries {
                return Err(Error::RetriesExhausted {
                    url: url.to_string(),
                    attempts: retries + 1,
                    status: response.status,
                });
            }
        }
        retries += 1;
        thread::sleep(policy.backoff);
    }
}
