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

//! Clusters API types.
//!
//! Only the fields the adapter reads are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an all-purpose cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    Pending,
    Running,
    Restarting,
    Resizing,
    Terminating,
    Terminated,
    Error,
    #[serde(other)]
    Unknown,
}

impl ClusterState {
    /// Whether the cluster is (or is about to be) able to accept work
    /// without an explicit start.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            ClusterState::Running | ClusterState::Resizing | ClusterState::Pending | ClusterState::Restarting
        )
    }
}

/// Response from `GET /api/2.0/clusters/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterDetails {
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    pub state: ClusterState,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub spark_version: Option<String>,
}

impl ClusterDetails {
    /// Databricks Runtime `(major, minor)` parsed from `spark_version`
    /// (e.g. `15.4.x-scala2.12`).
    pub fn dbr_version(&self) -> Option<(u32, u32)> {
        let version = self.spark_version.as_deref()?;
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some((major, minor))
    }
}

/// Request body for `POST /api/2.0/clusters/start`.
#[derive(Debug, Clone, Serialize)]
pub struct StartClusterRequest {
    pub cluster_id: String,
}
