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

//! User agent and HTTP session headers.
//!
//! Two environment variables shape what the adapter sends on every session:
//! `DBT_DATABRICKS_INVOCATION_ENV` tags the user agent with the environment
//! the run was launched from, and `DBT_DATABRICKS_HTTP_SESSION_HEADERS` holds
//! a JSON object of headers that the environment reserves for itself.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const INVOCATION_ENV_VAR: &str = "DBT_DATABRICKS_INVOCATION_ENV";
pub const HTTP_SESSION_HEADERS_VAR: &str = "DBT_DATABRICKS_HTTP_SESSION_HEADERS";

const ADAPTER_NAME: &str = "dbt-databricks";

// The user agent ends up inside a Thrift field that rejects nested parentheses.
static INVOCATION_ENV_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

/// Checks an invocation environment name.
pub fn validate_invocation_env(value: &str) -> Result<()> {
    if INVOCATION_ENV_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "Invalid invocation environment: {}",
            value
        )))
    }
}

/// Reads `DBT_DATABRICKS_INVOCATION_ENV`. Unset and empty are both `None`.
pub fn get_invocation_env() -> Result<Option<String>> {
    match std::env::var(INVOCATION_ENV_VAR) {
        Ok(value) if !value.is_empty() => {
            validate_invocation_env(&value)?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

/// `dbt-databricks/<version>`, followed by `; <env>` when an invocation
/// environment is given.
pub fn user_agent_entry_for(invocation_env: Option<&str>) -> String {
    let base = format!("{}/{}", ADAPTER_NAME, env!("CARGO_PKG_VERSION"));
    match invocation_env {
        Some(env) => format!("{}; {}", base, env),
        None => base,
    }
}

/// User agent entry for the current process environment.
pub fn user_agent_entry() -> Result<String> {
    let invocation_env = get_invocation_env()?;
    Ok(user_agent_entry_for(invocation_env.as_deref()))
}

/// Merges the environment's reserved headers (a JSON object, non-string
/// values JSON-encoded) with the user's headers.
///
/// Environment headers come first. A key present on both sides is an error;
/// the user cannot override a reserved header.
pub fn merge_http_headers(
    env_json: Option<&str>,
    user_headers: &IndexMap<String, String>,
) -> Result<Vec<(String, String)>> {
    let mut merged: IndexMap<String, String> = IndexMap::new();

    if let Some(raw) = env_json {
        let parsed: Value = serde_json::from_str(raw).map_err(|e| {
            Error::configuration(format!(
                "{} is not valid JSON: {}",
                HTTP_SESSION_HEADERS_VAR, e
            ))
        })?;
        let Value::Object(object) = parsed else {
            return Err(Error::configuration(format!(
                "{} must be a JSON object",
                HTTP_SESSION_HEADERS_VAR
            )));
        };
        for (key, value) in object {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            merged.insert(key, value);
        }
    }

    let mut overlap: Vec<&str> = user_headers
        .keys()
        .filter(|key| merged.contains_key(key.as_str()))
        .map(String::as_str)
        .collect();
    if !overlap.is_empty() {
        overlap.sort_unstable();
        return Err(Error::configuration(format!(
            "Intersection with reserved http_headers in keys: {{{}}}",
            overlap
                .iter()
                .map(|key| format!("'{}'", key))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    merged.extend(
        user_headers
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    Ok(merged.into_iter().collect())
}

/// [`merge_http_headers`] against `DBT_DATABRICKS_HTTP_SESSION_HEADERS`.
pub fn compute_all_http_headers(
    user_headers: &IndexMap<String, String>,
) -> Result<Vec<(String, String)>> {
    let env_json = std::env::var(HTTP_SESSION_HEADERS_VAR).ok();
    merge_http_headers(env_json.as_deref(), user_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn headers(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_invocation_env_validation() {
        assert!(validate_invocation_env("databricks-workflows").is_ok());
        assert!(validate_invocation_env("ci2").is_ok());

        let err = validate_invocation_env("(bad)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.message(), "Invalid invocation environment: (bad)");
        assert!(validate_invocation_env("has space").is_err());
    }

    #[test]
    fn test_user_agent_entry() {
        let version = env!("CARGO_PKG_VERSION");
        assert_eq!(
            user_agent_entry_for(None),
            format!("dbt-databricks/{}", version)
        );
        assert_eq!(
            user_agent_entry_for(Some("ci")),
            format!("dbt-databricks/{}; ci", version)
        );
    }

    #[test]
    fn test_merge_without_env() {
        let user = headers(&[("x-user", "1")]);
        let merged = merge_http_headers(None, &user).unwrap();
        assert_eq!(merged, vec![("x-user".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_merge_disjoint_is_union() {
        let user = headers(&[("x-user", "1")]);
        let merged =
            merge_http_headers(Some(r#"{"x-env": "a", "x-num": 5, "x-obj": {"k": true}}"#), &user)
                .unwrap();
        assert_eq!(
            merged,
            vec![
                ("x-env".to_string(), "a".to_string()),
                ("x-num".to_string(), "5".to_string()),
                ("x-obj".to_string(), r#"{"k":true}"#.to_string()),
                ("x-user".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_overlap_is_error() {
        let user = headers(&[("x-env", "mine"), ("x-user", "1")]);
        let err = merge_http_headers(Some(r#"{"x-env": "a"}"#), &user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.message(),
            "Intersection with reserved http_headers in keys: {'x-env'}"
        );
    }

    #[test]
    fn test_merge_malformed_env() {
        let user = IndexMap::new();
        let err = merge_http_headers(Some("not json"), &user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = merge_http_headers(Some("[1, 2]"), &user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
