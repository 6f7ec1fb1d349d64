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

//! Workspace API client.
//!
//! Wraps the handful of REST endpoints the adapter calls outside of SQL
//! sessions. Authentication comes from the credential manager through the
//! [`DatabricksHttpClient`] it was built with.

use crate::client::{workspace_url, DatabricksHttpClient};
use crate::error::{Error, Result};
use crate::types::{ClusterDetails, ClusterState, StartClusterRequest};
use reqwest::Method;
use std::sync::Arc;
use tracing::debug;

/// Client for the Databricks workspace REST API.
#[derive(Debug, Clone)]
pub struct DatabricksApiClient {
    http_client: Arc<DatabricksHttpClient>,
    host: String,
}

impl DatabricksApiClient {
    pub fn new(http_client: Arc<DatabricksHttpClient>, host: impl Into<String>) -> Self {
        Self {
            http_client,
            host: host.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn base_url(&self) -> String {
        format!("{}/api/2.0", workspace_url(&self.host))
    }

    /// `GET /api/2.0/clusters/get`
    pub async fn get_cluster(&self, cluster_id: &str) -> Result<ClusterDetails> {
        let url = format!("{}/clusters/get", self.base_url());
        debug!("Getting cluster {} at {}", cluster_id, url);

        let request = self
            .http_client
            .inner()
            .request(Method::GET, &url)
            .query(&[("cluster_id", cluster_id)])
            .build()
            .map_err(|e| Error::io(format!("Failed to build request: {}", e)))?;

        let response = self.http_client.execute(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::io(format!("Failed to read response: {}", e)))?;

        let details: ClusterDetails = serde_json::from_str(&body).map_err(|e| {
            Error::io(format!(
                "Failed to parse cluster response: {} - body: {}",
                e, body
            ))
        })?;

        debug!(
            "Cluster {} is {:?} (spark_version={:?})",
            details.cluster_id, details.state, details.spark_version
        );
        Ok(details)
    }

    /// `POST /api/2.0/clusters/start`
    pub async fn start_cluster(&self, cluster_id: &str) -> Result<()> {
        let url = format!("{}/clusters/start", self.base_url());
        debug!("Starting cluster {}", cluster_id);

        let request = self
            .http_client
            .inner()
            .request(Method::POST, &url)
            .json(&StartClusterRequest {
                cluster_id: cluster_id.to_string(),
            })
            .build()
            .map_err(|e| Error::io(format!("Failed to build request: {}", e)))?;

        self.http_client.execute(request).await?;
        Ok(())
    }

    /// Starts the cluster if it is terminated. Returns the state observed
    /// before any start request.
    pub async fn ensure_cluster_running(&self, cluster_id: &str) -> Result<ClusterState> {
        let details = self.get_cluster(cluster_id).await?;
        match details.state {
            ClusterState::Terminated | ClusterState::Terminating => {
                self.start_cluster(cluster_id).await?;
            }
            ClusterState::Error | ClusterState::Unknown => {
                return Err(Error::runtime(format!(
                    "Cluster {} is in state {:?}: {}",
                    cluster_id,
                    details.state,
                    details.state_message.unwrap_or_default()
                )));
            }
            _ => {}
        }
        Ok(details.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HeaderFactory;
    use crate::client::HttpClientConfig;
    use crate::credentials::manager::BearerAuth;
    use std::collections::HashMap;

    fn client(host: &str) -> DatabricksApiClient {
        let factory: HeaderFactory = Arc::new(|| Ok(HashMap::new()));
        let http =
            DatabricksHttpClient::new(HttpClientConfig::default(), BearerAuth::new(factory))
                .unwrap();
        DatabricksApiClient::new(Arc::new(http), host)
    }

    #[test]
    fn test_base_url() {
        let client = client("example.cloud.databricks.com");
        assert_eq!(
            client.base_url(),
            "https://example.cloud.databricks.com/api/2.0"
        );
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let client = client("https://example.cloud.databricks.com/");
        assert_eq!(
            client.base_url(),
            "https://example.cloud.databricks.com/api/2.0"
        );
    }
}
