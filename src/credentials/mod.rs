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

//! Databricks connection credentials.
//!
//! [`DatabricksCredentials`] is the validated, normalized form of a profile.
//! Normalization happens once at construction and fails fast; connect-time
//! checks (host, path, auth) are deferred to [`DatabricksCredentials::validate_creds`]
//! so that a profile can be loaded by commands that never connect.

pub mod headers;
pub mod manager;
pub mod profile;

use crate::auth::{AuthConfigBuilder, DatabricksAuthConfigBuilder};
use crate::error::{Error, Result};
use crate::logging::{init_logging, LogConfig};
use crate::relation_configs::ModelNode;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use headers::{compute_all_http_headers, merge_http_headers, user_agent_entry};
pub use manager::{BearerAuth, CredentialsProvider, DatabricksCredentialManager};
pub use profile::{AuthType, ComputeResource, ProfileFields};

/// Session property that doubles as the catalog.
pub const CATALOG_KEY_IN_SESSION_PROPERTIES: &str = "databricks.catalog";
pub const DEFAULT_DATABASE: &str = "hive_metastore";
/// Model config key naming a compute resource from the profile.
pub const COMPUTE_CONFIG_KEY: &str = "databricks_compute";
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(600);
pub const DEFAULT_SOCKET_TIMEOUT: u64 = 600;
pub const DEFAULT_CONNECT_RETRIES: u32 = 1;

/// Connection parameters the adapter sets itself.
const RESERVED_CONNECTION_PARAMETERS: &[&str] = &[
    "server_hostname",
    "http_path",
    "access_token",
    "client_id",
    "client_secret",
    "session_configuration",
    "catalog",
    "schema",
    "_user_agent_entry",
];

static CLUSTER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/?sql/protocolv1/o/\d+/(.*)").unwrap());

/// Retry settings for opening connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_retries: u32,
    pub connect_timeout: Option<Duration>,
    pub retry_all: bool,
}

/// Everything the SQL driver needs to open one session.
#[derive(Clone)]
pub struct ConnectionParams {
    pub server_hostname: String,
    pub http_path: String,
    pub credentials_provider: CredentialsProvider,
    pub http_headers: Vec<(String, String)>,
    pub session_configuration: Map<String, Value>,
    pub catalog: String,
    pub schema: Option<String>,
    pub user_agent_entry: String,
    pub max_idle: Duration,
    /// Remaining user connection parameters, `http_headers` excluded.
    pub extra: Map<String, Value>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("server_hostname", &self.server_hostname)
            .field("http_path", &self.http_path)
            .field("http_headers", &self.http_headers)
            .field("session_configuration", &self.session_configuration)
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("user_agent_entry", &self.user_agent_entry)
            .field("max_idle", &self.max_idle)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

/// Validated credentials of one Databricks profile.
#[derive(Clone)]
pub struct DatabricksCredentials {
    host: Option<String>,
    http_path: Option<String>,
    token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_type: Option<AuthType>,
    database: String,
    schema: Option<String>,
    compute: IndexMap<String, ComputeResource>,
    session_properties: Map<String, Value>,
    connection_parameters: Map<String, Value>,
    connect_retries: u32,
    connect_timeout: Option<u64>,
    retry_all: bool,
    connect_max_idle: Option<Value>,
    manager: Arc<DatabricksCredentialManager>,
}

impl fmt::Debug for DatabricksCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabricksCredentials")
            .field("host", &self.host)
            .field("http_path", &self.http_path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("auth_type", &self.auth_type)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("compute", &self.compute)
            .field("session_properties", &self.session_properties)
            .field("connection_parameters", &self.connection_parameters)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn compute_name(model: &dyn ModelNode) -> Result<Option<&str>> {
    match model.config_extra().get(COMPUTE_CONFIG_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.as_str())),
        Some(other) => Err(Error::runtime(format!(
            "{} must be the name of a compute resource, got {}, relation: {}",
            COMPUTE_CONFIG_KEY,
            other,
            model.relation_name().unwrap_or_default()
        ))),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_max_idle(value: &Value) -> Result<Duration> {
    let invalid = || {
        Error::runtime(format!(
            "{} is not a valid value for connect_max_idle. Must be a number of seconds.",
            render(value)
        ))
    };
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

impl DatabricksCredentials {
    /// Deserializes and normalizes a raw profile. Also initializes logging
    /// from the environment on first use.
    pub fn from_profile(profile: Value) -> Result<Self> {
        init_logging(&LogConfig::from_env());
        let fields: ProfileFields = serde_json::from_value(profile)
            .map_err(|e| Error::configuration(format!("Invalid Databricks profile: {}", e)))?;
        Self::new(fields)
    }

    pub fn new(fields: ProfileFields) -> Result<Self> {
        Self::with_auth_builder(fields, Arc::new(DatabricksAuthConfigBuilder))
    }

    /// Like [`DatabricksCredentials::new`], with a custom builder for the
    /// manager's auth config.
    pub fn with_auth_builder(
        fields: ProfileFields,
        auth_builder: Arc<dyn AuthConfigBuilder>,
    ) -> Result<Self> {
        let ProfileFields {
            host,
            http_path,
            token,
            client_id,
            client_secret,
            auth_type,
            database,
            schema,
            compute,
            mut session_properties,
            mut connection_parameters,
            connect_retries,
            connect_timeout,
            retry_all,
            connect_max_idle,
        } = fields;

        if let Some(ref schema) = schema {
            if schema.contains('.') {
                return Err(Error::validation(format!(
                    "The schema should not contain '.': {}\n\
                     If you are trying to set a catalog, please use `catalog` instead.\n",
                    schema
                )));
            }
        }

        let mut database = database;
        if let Some(catalog) = session_properties.remove(CATALOG_KEY_IN_SESSION_PROPERTIES) {
            if database.is_some() {
                return Err(Error::validation(format!(
                    "Got duplicate keys: (`{}` in session_properties) all map to \"database\"",
                    CATALOG_KEY_IN_SESSION_PROPERTIES
                )));
            }
            match catalog {
                Value::String(catalog) => database = Some(catalog),
                other => {
                    return Err(Error::validation(format!(
                        "`{}` in session_properties must be a string: {}",
                        CATALOG_KEY_IN_SESSION_PROPERTIES, other
                    )))
                }
            }
        }

        let database = database
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        for key in RESERVED_CONNECTION_PARAMETERS {
            if connection_parameters.contains_key(*key) {
                return Err(Error::configuration(format!(
                    "The connection parameter `{}` is reserved.",
                    key
                )));
            }
        }
        if let Some(http_headers) = connection_parameters.get("http_headers") {
            let well_formed = http_headers
                .as_object()
                .is_some_and(|headers| headers.values().all(Value::is_string));
            if !well_formed {
                return Err(Error::configuration(format!(
                    "The connection parameter `http_headers` should be dict of strings: {}.",
                    http_headers
                )));
            }
        }
        connection_parameters
            .entry("_socket_timeout")
            .or_insert_with(|| Value::from(DEFAULT_SOCKET_TIMEOUT));

        let timeout = connect_timeout
            .map(Duration::from_secs)
            .unwrap_or(manager::DEFAULT_AUTH_TIMEOUT);
        let manager = Arc::new(DatabricksCredentialManager::with_builder(
            host.clone().unwrap_or_default(),
            client_id.clone().unwrap_or_default(),
            client_secret.clone().unwrap_or_default(),
            token.clone(),
            timeout,
            auth_builder,
        ));

        debug!(
            "Loaded Databricks credentials for host {:?} (catalog={}, schema={:?})",
            host, database, schema
        );

        Ok(Self {
            host,
            http_path,
            token,
            client_id,
            client_secret,
            auth_type,
            database,
            schema,
            compute,
            session_properties,
            connection_parameters,
            connect_retries: connect_retries.unwrap_or(DEFAULT_CONNECT_RETRIES),
            connect_timeout,
            retry_all: retry_all.unwrap_or(false),
            connect_max_idle: connect_max_idle.filter(|v| !v.is_null()),
            manager,
        })
    }

    pub fn type_name(&self) -> &'static str {
        "databricks"
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn http_path(&self) -> Option<&str> {
        self.http_path.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn auth_type(&self) -> Option<AuthType> {
        self.auth_type
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn compute(&self) -> &IndexMap<String, ComputeResource> {
        &self.compute
    }

    pub fn session_properties(&self) -> &Map<String, Value> {
        &self.session_properties
    }

    pub fn connection_parameters(&self) -> &Map<String, Value> {
        &self.connection_parameters
    }

    pub fn manager(&self) -> Arc<DatabricksCredentialManager> {
        Arc::clone(&self.manager)
    }

    /// Checks that the profile carries what a connection needs.
    pub fn validate_creds(&self) -> Result<()> {
        for (key, value) in [("host", &self.host), ("http_path", &self.http_path)] {
            if non_empty(value).is_none() {
                return Err(Error::configuration(format!(
                    "The config '{}' is required to connect to Databricks",
                    key
                )));
            }
        }
        if non_empty(&self.token).is_none() && self.auth_type != Some(AuthType::Oauth) {
            return Err(Error::validation(
                "The config `auth_type: oauth` is required when not using access token",
            ));
        }
        if non_empty(&self.client_id).is_none() && non_empty(&self.client_secret).is_some() {
            return Err(Error::configuration(
                "The config 'client_id' is required to connect to Databricks when \
                 'client_secret' is present",
            ));
        }
        Ok(())
    }

    /// Cluster id embedded in an all-purpose cluster http_path
    /// (`sql/protocolv1/o/<org>/<cluster>`).
    pub fn extract_cluster_id(http_path: &str) -> Option<String> {
        let captures = CLUSTER_ID_PATTERN.captures(http_path)?;
        let cluster_id = captures.get(1)?.as_str().trim();
        (!cluster_id.is_empty()).then(|| cluster_id.to_string())
    }

    /// Cluster id for cluster paths, warehouse id for SQL warehouse paths.
    pub fn cluster_id(&self) -> Option<String> {
        let http_path = self.http_path.as_deref()?;
        Self::extract_cluster_id(http_path).or_else(|| {
            http_path
                .trim_end_matches('/')
                .strip_prefix("/sql/1.0/warehouses/")
                .or_else(|| http_path.trim_end_matches('/').strip_prefix("sql/1.0/warehouses/"))
                .filter(|id| !id.is_empty() && !id.contains('/'))
                .map(str::to_string)
        })
    }

    /// Identifies the profile's target; the host.
    pub fn unique_field(&self) -> &str {
        self.host.as_deref().unwrap_or_default()
    }

    /// Keys shown by `dbt debug` (`with_aliases == false`) or used to render
    /// the profile (`with_aliases == true`), with their values.
    pub fn connection_info(&self, with_aliases: bool) -> impl Iterator<Item = (&'static str, Value)> + '_ {
        let mut keys = vec!["host", "http_path", "schema"];
        if with_aliases {
            keys.insert(2, "database");
        } else if !self.database.is_empty() {
            keys.insert(2, "catalog");
        }
        if !self.session_properties.is_empty() {
            keys.push("session_properties");
        }
        if with_aliases {
            keys.push("catalog");
        }

        keys.into_iter().map(move |key| {
            let value = match key {
                "host" => self.host.clone().map(Value::String),
                "http_path" => self.http_path.clone().map(Value::String),
                "database" | "catalog" => Some(Value::String(self.database.clone())),
                "schema" => self.schema.clone().map(Value::String),
                _ => Some(Value::Object(self.session_properties.clone())),
            };
            (key, value.unwrap_or(Value::Null))
        })
    }

    /// Validates the connect-time settings and returns the manager after its
    /// one-time authentication.
    pub fn authenticate(&self) -> Result<&DatabricksCredentialManager> {
        self.validate_creds()?;
        self.manager.ensure_authenticated()?;
        Ok(&self.manager)
    }

    /// The http_path to connect with for `model`: the path of the compute
    /// resource it names, or the profile's own path.
    pub fn resolve_http_path(&self, model: Option<&dyn ModelNode>) -> Result<Option<String>> {
        if let Some(model) = model {
            if let Some(name) = compute_name(model)? {
                let http_path = self
                    .compute
                    .get(name)
                    .and_then(|compute| compute.http_path.as_deref())
                    .filter(|path| !path.is_empty());
                return match http_path {
                    Some(path) => Ok(Some(path.to_string())),
                    None => Err(Error::runtime(format!(
                        "Compute resource {} does not exist or does not specify http_path, \
                         relation: {}",
                        name,
                        model.relation_name().unwrap_or_default()
                    ))),
                };
            }
        }
        Ok(self.http_path.clone())
    }

    /// How long an idle connection may be kept for `model`.
    pub fn resolve_max_idle(&self, model: Option<&dyn ModelNode>) -> Result<Duration> {
        let name = match model {
            Some(model) => compute_name(model)?,
            None => None,
        };
        let from_compute = name
            .and_then(|name| self.compute.get(name))
            .and_then(|compute| compute.connect_max_idle.as_ref())
            .filter(|value| !value.is_null());
        match from_compute.or(self.connect_max_idle.as_ref()) {
            Some(value) => parse_max_idle(value),
            None => Ok(DEFAULT_MAX_IDLE),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connect_retries: self.connect_retries,
            connect_timeout: self.connect_timeout.map(Duration::from_secs),
            retry_all: self.retry_all,
        }
    }

    /// Authenticates and assembles the parameters for a SQL session running
    /// `model`.
    pub fn connection_params(&self, model: Option<&dyn ModelNode>) -> Result<ConnectionParams> {
        let manager = self.authenticate()?;
        let http_path = self.resolve_http_path(model)?.unwrap_or_default();

        let mut extra = self.connection_parameters.clone();
        let user_headers: IndexMap<String, String> = match extra.remove("http_headers") {
            Some(Value::Object(headers)) => headers
                .into_iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key, v.to_string())))
                .collect(),
            _ => IndexMap::new(),
        };

        Ok(ConnectionParams {
            server_hostname: self.unique_field().to_string(),
            http_path,
            credentials_provider: manager.credentials_provider()?,
            http_headers: compute_all_http_headers(&user_headers)?,
            session_configuration: self.session_properties.clone(),
            catalog: self.database.clone(),
            schema: self.schema.clone(),
            user_agent_entry: user_agent_entry()?,
            max_idle: self.resolve_max_idle(model)?,
            extra,
        })
    }
}
