// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Clients for the Databricks workspace REST APIs.
//!
//! This module provides:
//! - `DatabricksHttpClient`: low-level HTTP client with retry logic, signed by `BearerAuth`
//! - `DatabricksApiClient`: the workspace API calls the adapter needs (cluster status)

pub mod api;
pub mod http;

pub use api::DatabricksApiClient;
pub use http::{DatabricksHttpClient, HttpClientConfig};

/// Base URL of a workspace. Profiles usually carry a bare hostname, so
/// `https://` is assumed when no scheme is given.
pub fn workspace_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
