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

//! Lazy iteration over the pages of a response.
//!
//! A [`Pages`] iterator sends one request each time it is advanced: the
//! endpoint URL with the query parameters first, then the `meta.next` URL
//! of the previous response, which already carries every parameter.

use crate::{
    endpoint::Envelope,
    http::{self, RetryPolicy, Transport},
    params::Params,
    Error, Result,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::mem;
use tracing::{debug, info};

/// Records of one response.
pub type Page = Vec<Value>;

#[derive(Debug)]
enum State {
    Requesting { url: String, params: Params },
    Done,
}

/// Iterator over the pages of a query.
///
/// Iteration stops after the first page when `page_all` is `false`, when a
/// response has no `next` cursor, or after the first error.
pub struct Pages<'a, T: ?Sized> {
    transport: &'a T,
    policy: &'a RetryPolicy,
    envelope: Envelope,
    page_all: bool,
    state: State,
}

impl<'a, T: Transport + ?Sized> Pages<'a, T> {
    /// Pages of `url` requested with `params`.
    pub fn new(
        transport: &'a T,
        policy: &'a RetryPolicy,
        envelope: Envelope,
        url: String,
        params: Params,
        page_all: bool,
    ) -> Self {
        Pages {
            transport,
            policy,
            envelope,
            page_all,
            state: State::Requesting { url, params },
        }
    }

    /// `true` when advancing the iterator will send another request.
    pub fn has_next(&self) -> bool {
        matches!(self.state, State::Requesting { .. })
    }
}

impl<T: Transport + ?Sized> Iterator for Pages<'_, T> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let (url, params) = match mem::replace(&mut self.state, State::Done) {
            State::Requesting { url, params } => (url, params),
            State::Done => return None,
        };
        let decoded = http::send(self.transport, self.policy, &url, &params).and_then(|response| {
            let document: Value = serde_json::from_str(&response.body)
                .map_err(|e| Error::malformed(url.as_str(), format!("invalid JSON: {}", e)))?;
            decode(self.envelope, &url, document)
        });
        let (page, next) = match decoded {
            Ok(decoded) => decoded,
            Err(err) => return Some(Err(err)),
        };
        info!("Received {} records from {}", page.len(), url);
        match next {
            Some(next) if self.page_all => {
                debug!("Next page: {}", next);
                self.state = State::Requesting {
                    url: next,
                    params: Params::new(),
                };
            }
            _ => {}
        }
        Some(Ok(page))
    }
}

fn exact_keys(object: &Map<String, Value>, expected: &[&str]) -> bool {
    let keys: BTreeSet<&str> = object.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = expected.iter().copied().collect();
    keys == expected
}

fn next_cursor(url: &str, object: &Map<String, Value>) -> Result<Option<String>> {
    let meta = object
        .get("meta")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::malformed(url, "'meta' is not an object"))?;
    match meta.get("next") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(next)) => Ok(Some(next.clone())),
        Some(other) => Err(Error::malformed(
            url,
            format!("'meta.next' is not a URL: {}", other),
        )),
    }
}

fn records(url: &str, object: &mut Map<String, Value>, key: &str) -> Result<Page> {
    match object.remove(key) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(Error::malformed(url, format!("'{}' is not an array", key))),
    }
}

/// Split a response document into its records and the URL of the next
/// page, checking it follows the envelope of the endpoint.
pub fn decode(envelope: Envelope, url: &str, document: Value) -> Result<(Page, Option<String>)> {
    let mut object = match (envelope, document) {
        (Envelope::Single, document) => return Ok((vec![document], None)),
        (_, Value::Object(object)) => object,
        (_, _) => return Err(Error::malformed(url, "response is not a JSON object")),
    };
    match envelope {
        Envelope::FeatureCollection => {
            if !exact_keys(&object, &["features", "meta", "type"]) {
                return Err(Error::malformed(
                    url,
                    "expected exactly the keys 'features', 'meta' and 'type'",
                ));
            }
            if object.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
                return Err(Error::malformed(url, "'type' is not 'FeatureCollection'"));
            }
            let next = next_cursor(url, &object)?;
            Ok((records(url, &mut object, "features")?, next))
        }
        Envelope::Keyed(key) => {
            if !exact_keys(&object, &[key, "meta"]) {
                return Err(Error::malformed(
                    url,
                    format!("expected exactly the keys '{}' and 'meta'", key),
                ));
            }
            let next = next_cursor(url, &object)?;
            Ok((records(url, &mut object, key)?, next))
        }
        Envelope::Single => unreachable!("single documents are returned above"),
    }
}
