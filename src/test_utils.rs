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

//! Helpers shared by the tests of the crate and of its binaries.

use crate::{
    http::{Response, Transport},
    params::Params,
    Result,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

/// [`Transport`] answering with scripted responses, in order, and recording
/// every request it receives.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: RefCell<VecDeque<Response>>,
    requests: RefCell<Vec<(String, Params)>>,
}

impl FakeTransport {
    /// Transport answering `responses`, one per request.
    pub fn new(responses: Vec<Response>) -> Self {
        FakeTransport {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(vec![]),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<(String, Params)> {
        self.requests.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, params: &Params) -> Result<Response> {
        self.requests
            .borrow_mut()
            .push((url.to_string(), params.clone()));
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response left for {}", url));
        Ok(response)
    }
}

fn meta(next: Option<&str>) -> Value {
    match next {
        Some(next) => json!({ "next": next }),
        None => json!({}),
    }
}

/// Body of a GeoJSON page.
pub fn feature_collection(features: &[Value], next: Option<&str>) -> String {
    json!({
        "type": "FeatureCollection",
        "features": features,
        "meta": meta(next),
    })
    .to_string()
}

/// Body of a page of a plain endpoint.
pub fn keyed_collection(key: &str, records: &[Value], next: Option<&str>) -> String {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), Value::from(records.to_vec()));
    body.insert("meta".to_string(), meta(next));
    Value::Object(body).to_string()
}

/// Create `file_name` in `path` and return its path.
pub fn create_file_with_content(path: &Path, file_name: &str, content: &str) -> PathBuf {
    let file_path = path.join(file_name);
    let mut f = File::create(&file_path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    file_path
}
