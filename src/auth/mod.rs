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

//! Authentication providers and the authentication configuration built from
//! a profile.
//!
//! - [`AuthProvider`]: produces the `Authorization` header value
//! - [`PersonalAccessToken`]: static bearer token
//! - [`OAuthM2M`]: OAuth client-credentials (service principal) flow
//! - [`AuthConfig`]: the provider selected for a profile plus its header factory
//! - [`AuthConfigBuilder`]: builds an [`AuthConfig`] from [`AuthParams`]

pub mod oauth;

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use oauth::{OAuthM2M, OidcTokenSource, Token, TokenSource};

/// Name of the header every provider fills in.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Callable producing the current set of authorization headers.
///
/// Invoking it may refresh an expired token, so callers should invoke it for
/// every new request or connection rather than caching its output.
pub type HeaderFactory = Arc<dyn Fn() -> Result<HashMap<String, String>> + Send + Sync>;

/// Source of the `Authorization` header value.
pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// Returns the full header value, e.g. `Bearer <token>`.
    fn get_auth_header(&self) -> Result<String>;
}

/// Personal access token authentication.
#[derive(Clone)]
pub struct PersonalAccessToken {
    token: String,
}

impl PersonalAccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonalAccessToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for PersonalAccessToken {
    fn get_auth_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.token))
    }
}

/// Which authentication flow an [`AuthConfig`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    PersonalAccessToken,
    OAuthM2M,
}

/// Inputs to an [`AuthConfigBuilder`].
#[derive(Clone, Default)]
pub struct AuthParams {
    pub host: String,
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Deadline for the handshake and for each token exchange.
    pub timeout: Duration,
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Live authentication context for one profile.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    host: String,
    method: AuthMethod,
    provider: Arc<dyn AuthProvider>,
}

impl AuthConfig {
    pub fn new(host: impl Into<String>, method: AuthMethod, provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            host: host.into(),
            method,
            provider,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn provider(&self) -> Arc<dyn AuthProvider> {
        Arc::clone(&self.provider)
    }

    /// Headers for a single request.
    pub fn authenticate(&self) -> Result<HashMap<String, String>> {
        let value = self.provider.get_auth_header()?;
        Ok(HashMap::from([(AUTHORIZATION_HEADER.to_string(), value)]))
    }

    pub fn header_factory(&self) -> HeaderFactory {
        let provider = Arc::clone(&self.provider);
        Arc::new(move || {
            let value = provider.get_auth_header()?;
            Ok(HashMap::from([(AUTHORIZATION_HEADER.to_string(), value)]))
        })
    }
}

/// Builds the [`AuthConfig`] for a profile. Implementations perform the
/// initial handshake, so a build is the expensive step the credential manager
/// runs only once.
pub trait AuthConfigBuilder: Send + Sync + fmt::Debug {
    fn build(&self, params: &AuthParams) -> Result<AuthConfig>;
}

/// Default builder: a personal access token when one is configured,
/// otherwise OAuth M2M against the workspace's OIDC endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabricksAuthConfigBuilder;

impl AuthConfigBuilder for DatabricksAuthConfigBuilder {
    fn build(&self, params: &AuthParams) -> Result<AuthConfig> {
        if let Some(token) = params.token.as_deref().filter(|t| !t.is_empty()) {
            debug!("Using personal access token authentication for {}", params.host);
            return Ok(AuthConfig::new(
                params.host.clone(),
                AuthMethod::PersonalAccessToken,
                Arc::new(PersonalAccessToken::new(token)),
            ));
        }

        let client_id = params.client_id.as_deref().filter(|v| !v.is_empty());
        let client_secret = params.client_secret.as_deref().filter(|v| !v.is_empty());
        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => {
                debug!(
                    "Using OAuth M2M authentication for {} with client {}",
                    params.host, client_id
                );
                let source =
                    OidcTokenSource::new(&params.host, client_id, client_secret, params.timeout)?;
                let provider = OAuthM2M::new(Arc::new(source), params.timeout);
                // The first exchange is the handshake; failures surface here.
                provider.get_auth_header()?;
                Ok(AuthConfig::new(
                    params.host.clone(),
                    AuthMethod::OAuthM2M,
                    Arc::new(provider),
                ))
            }
            _ => Err(Error::configuration(
                "OAuth authentication requires both 'client_id' and 'client_secret'; \
                 the browser-based OAuth flow is not supported",
            )),
        }
    }
}
