// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Workspace API client against a mock server.

use dbt_databricks::types::ClusterState;
use dbt_databricks::{DatabricksCredentials, ErrorKind};
use mockito::Matcher;
use serde_json::json;

fn pat_profile(host: &str) -> DatabricksCredentials {
    DatabricksCredentials::from_profile(json!({
        "host": host,
        "http_path": "sql/protocolv1/o/1234/0123-456789-abc",
        "token": "dapi-test",
    }))
    .expect("Failed to load profile")
}

#[tokio::test]
async fn test_get_cluster() {
    //* Given
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/2.0/clusters/get")
        .match_query(Matcher::UrlEncoded(
            "cluster_id".into(),
            "0123-456789-abc".into(),
        ))
        .match_header("authorization", "Bearer dapi-test")
        .with_status(200)
        .with_body(
            json!({
                "cluster_id": "0123-456789-abc",
                "state": "RUNNING",
                "spark_version": "14.3.x-scala2.12"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let credentials = pat_profile(&server.url());
    let cluster_id = credentials.cluster_id().unwrap();

    //* When
    let client = credentials.authenticate().unwrap().api_client().unwrap();
    let details = client.get_cluster(&cluster_id).await.unwrap();

    //* Then
    assert_eq!(details.state, ClusterState::Running);
    assert_eq!(details.dbr_version(), Some((14, 3)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ensure_cluster_running_starts_terminated_cluster() {
    //* Given
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/api/2.0/clusters/get")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"cluster_id": "c1", "state": "TERMINATED"}"#)
        .expect(1)
        .create_async()
        .await;
    let start = server
        .mock("POST", "/api/2.0/clusters/start")
        .match_header("authorization", "Bearer dapi-test")
        .match_body(Matcher::Json(json!({"cluster_id": "c1"})))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let credentials = pat_profile(&server.url());

    //* When
    let client = credentials.manager().api_client().unwrap();
    let state = client.ensure_cluster_running("c1").await.unwrap();

    //* Then
    assert_eq!(state, ClusterState::Terminated);
    get.assert_async().await;
    start.assert_async().await;
}

#[tokio::test]
async fn test_get_cluster_not_found() {
    //* Given
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/2.0/clusters/get")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error_code":"INVALID_PARAMETER_VALUE"}"#)
        .expect(1)
        .create_async()
        .await;
    let credentials = pat_profile(&server.url());

    //* When
    let client = credentials.manager().api_client().unwrap();
    let err = client.get_cluster("missing").await.unwrap_err();

    //* Then
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.message().starts_with("HTTP 400"));
    mock.assert_async().await;
}
