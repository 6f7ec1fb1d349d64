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

//! Live authentication context for a profile.
//!
//! [`DatabricksCredentialManager`] holds the secrets of one profile and builds
//! its [`AuthConfig`] the first time anything needs to authenticate. The
//! build runs the auth handshake, so it happens at most once per manager even
//! when many sessions ask for it concurrently.

use crate::auth::{
    AuthConfig, AuthConfigBuilder, AuthParams, DatabricksAuthConfigBuilder, HeaderFactory,
};
use crate::client::{DatabricksApiClient, DatabricksHttpClient, HttpClientConfig};
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Request;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Handshake deadline used when the profile sets no `connect_timeout`.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Factory of header factories, the shape the SQL driver expects.
///
/// The driver calls the provider once per connection and then calls the
/// returned [`HeaderFactory`] whenever it needs fresh headers.
pub type CredentialsProvider = Arc<dyn Fn() -> HeaderFactory + Send + Sync>;

/// Writes the header factory's headers onto outgoing requests.
///
/// Headers already on the request are replaced, so the factory's
/// `Authorization` always wins over anything set elsewhere.
#[derive(Clone)]
pub struct BearerAuth {
    header_factory: HeaderFactory,
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

impl BearerAuth {
    pub fn new(header_factory: HeaderFactory) -> Self {
        Self { header_factory }
    }

    pub fn headers(&self) -> Result<HashMap<String, String>> {
        (self.header_factory)()
    }

    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        for (name, value) in self.headers()? {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::internal(format!("Invalid header name {}: {}", name, e)))?;
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| Error::internal(format!("Invalid value for header {}: {}", name, e)))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }
        Ok(())
    }

    pub fn sign(&self, request: &mut Request) -> Result<()> {
        self.apply(request.headers_mut())
    }
}

/// Owns the authentication configuration of one profile.
pub struct DatabricksCredentialManager {
    host: String,
    client_id: String,
    client_secret: String,
    token: Option<String>,
    timeout: Duration,
    builder: Arc<dyn AuthConfigBuilder>,
    config: OnceCell<AuthConfig>,
}

impl fmt::Debug for DatabricksCredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabricksCredentialManager")
            .field("host", &self.host)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("builder", &self.builder)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl DatabricksCredentialManager {
    pub fn new(
        host: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self::with_builder(
            host,
            client_id,
            client_secret,
            token,
            timeout,
            Arc::new(DatabricksAuthConfigBuilder),
        )
    }

    /// Uses `builder` instead of the default PAT / OAuth M2M selection.
    pub fn with_builder(
        host: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        builder: Arc<dyn AuthConfigBuilder>,
    ) -> Self {
        Self {
            host: host.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token,
            timeout,
            builder,
            config: OnceCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_authenticated(&self) -> bool {
        self.config.get().is_some()
    }

    fn params(&self) -> AuthParams {
        AuthParams {
            host: self.host.clone(),
            token: self.token.clone(),
            client_id: Some(self.client_id.clone()),
            client_secret: Some(self.client_secret.clone()),
            timeout: self.timeout,
        }
    }

    /// Builds the auth config on first use and returns it.
    ///
    /// Concurrent first callers block until the single build finishes. A
    /// failed build leaves the manager unauthenticated, so a later call
    /// retries.
    pub fn ensure_authenticated(&self) -> Result<&AuthConfig> {
        self.config.get_or_try_init(|| {
            debug!("Building auth config for {}", self.host);
            let config = self.builder.build(&self.params())?;
            debug!("Authenticated to {} with {:?}", self.host, config.method());
            Ok(config)
        })
    }

    /// The built auth config, if authentication already happened.
    pub fn config(&self) -> Option<&AuthConfig> {
        self.config.get()
    }

    pub fn header_factory(&self) -> Result<HeaderFactory> {
        self.config
            .get()
            .map(AuthConfig::header_factory)
            .ok_or_else(|| Error::internal("Header factory is not set."))
    }

    /// Provider handed to the SQL driver. Each call of the provider yields
    /// the header factory; each call of the factory yields current headers.
    pub fn credentials_provider(&self) -> Result<CredentialsProvider> {
        let header_factory = self.header_factory()?;
        Ok(Arc::new(move || Arc::clone(&header_factory)))
    }

    /// Workspace API client signed with this profile's credentials.
    pub fn api_client(&self) -> Result<DatabricksApiClient> {
        let config = self.ensure_authenticated()?;
        let auth = BearerAuth::new(config.header_factory());
        let http_client = DatabricksHttpClient::new(HttpClientConfig::default(), auth)?;
        Ok(DatabricksApiClient::new(Arc::new(http_client), self.host.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthMethod, PersonalAccessToken, AUTHORIZATION_HEADER};
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[derive(Debug, Default)]
    struct CountingBuilder {
        builds: AtomicUsize,
        fail_first: bool,
    }

    impl AuthConfigBuilder for CountingBuilder {
        fn build(&self, params: &AuthParams) -> Result<AuthConfig> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(Error::authentication("handshake failed"));
            }
            std::thread::sleep(Duration::from_millis(20));
            Ok(AuthConfig::new(
                params.host.clone(),
                AuthMethod::PersonalAccessToken,
                Arc::new(PersonalAccessToken::new(format!("token-{}", n + 1))),
            ))
        }
    }

    fn manager(builder: Arc<CountingBuilder>) -> DatabricksCredentialManager {
        DatabricksCredentialManager::with_builder(
            "example.cloud.databricks.com",
            "",
            "",
            Some("t".to_string()),
            DEFAULT_AUTH_TIMEOUT,
            builder,
        )
    }

    #[test]
    fn test_header_factory_before_authentication() {
        let manager = manager(Arc::new(CountingBuilder::default()));
        let err = manager.header_factory().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "Header factory is not set.");
        assert!(manager.credentials_provider().is_err());
    }

    #[test]
    fn test_builds_once() {
        let builder = Arc::new(CountingBuilder::default());
        let manager = manager(builder.clone());

        manager.ensure_authenticated().unwrap();
        manager.ensure_authenticated().unwrap();
        assert!(manager.is_authenticated());
        assert_eq!(builder.builds.load(Ordering::SeqCst), 1);

        let headers = (manager.header_factory().unwrap())().unwrap();
        assert_eq!(headers.get(AUTHORIZATION_HEADER).unwrap(), "Bearer token-1");
    }

    #[test]
    fn test_failed_build_can_be_retried() {
        let builder = Arc::new(CountingBuilder {
            fail_first: true,
            ..Default::default()
        });
        let manager = manager(builder.clone());

        let err = manager.ensure_authenticated().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!manager.is_authenticated());

        manager.ensure_authenticated().unwrap();
        assert_eq!(builder.builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let builder = Arc::new(CountingBuilder::default());
        let manager = Arc::new(manager(builder.clone()));
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    manager.ensure_authenticated().map(|config| config.method())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(
                handle.join().unwrap().unwrap(),
                AuthMethod::PersonalAccessToken
            );
        }
        assert_eq!(builder.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_credentials_provider_is_two_level() {
        let manager = manager(Arc::new(CountingBuilder::default()));
        manager.ensure_authenticated().unwrap();

        let provider = manager.credentials_provider().unwrap();
        let header_factory = provider();
        let headers = header_factory().unwrap();
        assert_eq!(headers.get(AUTHORIZATION_HEADER).unwrap(), "Bearer token-1");
    }

    #[test]
    fn test_bearer_auth_replaces_authorization() {
        let factory: HeaderFactory = Arc::new(|| {
            Ok(HashMap::from([(
                "Authorization".to_string(),
                "Bearer fresh".to_string(),
            )]))
        });
        let auth = BearerAuth::new(factory);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic c3RhbGU="));
        headers.insert("x-other", HeaderValue::from_static("kept"));
        auth.apply(&mut headers).unwrap();

        assert_eq!(headers.get_all("authorization").iter().count(), 1);
        assert_eq!(headers["authorization"], "Bearer fresh");
        assert_eq!(headers["x-other"], "kept");
    }

    #[test]
    fn test_debug_is_redacted() {
        let manager = DatabricksCredentialManager::new(
            "h",
            "id",
            "s3cr3t",
            Some("dapi123".to_string()),
            DEFAULT_AUTH_TIMEOUT,
        );
        let rendered = format!("{:?}", manager);
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("dapi123"));
    }
}
