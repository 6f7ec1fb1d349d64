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

//! Raw profile model.
//!
//! A profile arrives from the host as a JSON-like mapping. It deserializes
//! into [`ProfileFields`] before any normalization happens; unknown keys are
//! ignored so profiles written for other adapters' options still load.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Value of the profile's `auth_type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Token,
    Oauth,
}

/// A named compute resource a model can select with `databricks_compute`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComputeResource {
    #[serde(default)]
    pub http_path: Option<String>,
    #[serde(default)]
    pub connect_max_idle: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Profile fields as written by the user, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub http_path: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub auth_type: Option<AuthType>,
    #[serde(default, alias = "catalog")]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub compute: IndexMap<String, ComputeResource>,
    #[serde(default)]
    pub session_properties: Map<String, Value>,
    #[serde(default)]
    pub connection_parameters: Map<String, Value>,
    #[serde(default)]
    pub connect_retries: Option<u32>,
    /// Seconds.
    #[serde(default)]
    pub connect_timeout: Option<u64>,
    #[serde(default)]
    pub retry_all: Option<bool>,
    #[serde(default)]
    pub connect_max_idle: Option<Value>,
}
