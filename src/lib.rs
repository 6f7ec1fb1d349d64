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

//! dbt-databricks adapter core for Rust
//!
//! This crate provides the credential handling, authentication and relation
//! config reconciliation that a dbt-style host needs to target Databricks.
//!
//! ## Overview
//!
//! - [`DatabricksCredentials`] - Validated connection profile
//! - [`DatabricksCredentialManager`] - One-time authentication, header factory, API client
//! - [`relation_configs`] - Facet configs built from live relations and from models, and their diff
//!
//! ## Features
//!
//! - **Personal access tokens** and **OAuth M2M** (service principal) authentication
//! - **Named compute**: models can pick another warehouse or cluster from the profile
//! - **Change sets**: decide between in-place alters and full refreshes
//!
//! ## Example
//!
//! ```ignore
//! use dbt_databricks::DatabricksCredentials;
//! use serde_json::json;
//!
//! let credentials = DatabricksCredentials::from_profile(json!({
//!     "host": "my-workspace.cloud.databricks.com",
//!     "http_path": "/sql/1.0/warehouses/abc123",
//!     "token": "dapi...",
//!     "catalog": "main",
//!     "schema": "analytics",
//! }))?;
//!
//! let params = credentials.connection_params(None)?;
//! let headers = (params.credentials_provider)()()?;
//! ```
//!
//! ## Profile Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `host` | | Workspace hostname |
//! | `http_path` | | SQL warehouse or cluster HTTP path |
//! | `token` | | Personal access token |
//! | `auth_type` | | `token` or `oauth` |
//! | `client_id` / `client_secret` | | Service principal for OAuth M2M |
//! | `catalog` / `database` | `hive_metastore` | Default catalog |
//! | `schema` | | Default schema |
//! | `compute` | | Named compute resources (`http_path`, `connect_max_idle`) |
//! | `session_properties` | | Spark session configuration |
//! | `connection_parameters` | `_socket_timeout: 600` | Extra SQL driver parameters |
//! | `connect_retries` | 1 | Connection attempts after the first |
//! | `connect_timeout` | 120 (auth) | Seconds |
//! | `retry_all` | false | Retry on any error |
//! | `connect_max_idle` | 600 | Seconds an idle connection is kept |
//!
//! ## Environment
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `DBT_DATABRICKS_INVOCATION_ENV` | Appended to the user agent |
//! | `DBT_DATABRICKS_HTTP_SESSION_HEADERS` | JSON object of reserved session headers |
//! | `DBT_DATABRICKS_LOG_LEVEL` / `DBT_DATABRICKS_LOG_FILE` | Logging |

pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod relation_configs;
pub mod types;

// Re-export main types
pub use credentials::{
    ConnectionParams, CredentialsProvider, DatabricksCredentialManager, DatabricksCredentials,
    RetryPolicy,
};
pub use error::{Error, ErrorKind, Result};

// Re-export auth and client types for advanced users
pub use auth::{AuthConfig, AuthConfigBuilder, AuthProvider, HeaderFactory};
pub use client::{DatabricksApiClient, DatabricksHttpClient, HttpClientConfig};

pub use relation_configs::{
    DatabricksComponentConfig, DatabricksRelationConfig, ProcessorRegistry, RelationChangeSet,
};
