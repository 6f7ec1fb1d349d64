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

//! OAuth machine-to-machine (service principal) authentication.
//!
//! Tokens come from a [`TokenSource`] and are cached until shortly before
//! they expire. Refreshes are serialized so concurrent callers that find an
//! expired token trigger a single exchange.

use crate::auth::AuthProvider;
use crate::client::workspace_url;
use crate::error::{Error, Result};
use crate::types::TokenResponse;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Upper bound on a token's lifetime, whatever the endpoint reports.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Scope requested for workspace-level access.
pub const ALL_APIS_SCOPE: &str = "all-apis";

/// An access token and the instant it stops being valid.
#[derive(Clone)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Instant,
}

impl Token {
    /// `expires_in` is capped at [`MAX_TOKEN_LIFETIME`].
    pub fn new(access_token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Instant::now() + expires_in.min(MAX_TOKEN_LIFETIME),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_SKEW >= self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Performs one token exchange.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn fetch_token(&self) -> Result<Token>;
}

/// Client-credentials grant against the workspace OIDC endpoint.
pub struct OidcTokenSource {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for OidcTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcTokenSource")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl OidcTokenSource {
    pub fn new(
        host: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        // Exchanges run on short-lived runtimes, so pooled connections would
        // outlive the runtime that opened them.
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::io(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: format!("{}/oidc/v1/token", workspace_url(host)),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenSource for OidcTokenSource {
    async fn fetch_token(&self) -> Result<Token> {
        debug!("Requesting OAuth token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", ALL_APIS_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| Error::io(format!("OAuth token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::io(format!("Failed to read token response: {}", e)))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::authentication(format!(
                "OAuth token request was rate limited by {}",
                self.token_url
            )));
        }
        if !status.is_success() {
            return Err(Error::authentication(format!(
                "OAuth token request failed with HTTP {} - {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            Error::authentication(format!("Failed to parse token response: {}", e))
        })?;

        debug!(
            "Received OAuth token (type={:?}, expires_in={}s)",
            parsed.token_type,
            parsed.expires_in_secs()
        );
        Ok(Token::new(
            parsed.access_token.clone(),
            Duration::from_secs(parsed.expires_in_secs()),
        ))
    }
}

/// OAuth M2M provider with a cached, lazily refreshed token.
pub struct OAuthM2M {
    source: Arc<dyn TokenSource>,
    timeout: Duration,
    cache: RwLock<Option<Token>>,
    fetch_lock: Mutex<()>,
}

impl fmt::Debug for OAuthM2M {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthM2M")
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OAuthM2M {
    /// `timeout` bounds every exchange with the token source.
    pub fn new(source: Arc<dyn TokenSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            cache: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    fn cached(&self) -> Result<Option<String>> {
        let guard = self
            .cache
            .read()
            .map_err(|_| Error::internal("OAuth token cache lock poisoned"))?;
        Ok(guard
            .as_ref()
            .filter(|token| !token.is_expired())
            .map(|token| token.access_token.clone()))
    }

    /// Returns a valid access token, fetching a new one if the cached token
    /// is missing or about to expire.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached()? {
            return Ok(token);
        }

        let _guard = self.fetch_lock.lock().await;
        if let Some(token) = self.cached()? {
            return Ok(token);
        }

        let token = tokio::time::timeout(self.timeout, self.source.fetch_token())
            .await
            .map_err(|_| {
                Error::authentication(format!(
                    "Timed out after {:?} waiting for an OAuth token",
                    self.timeout
                ))
            })??;

        let value = token.access_token.clone();
        *self
            .cache
            .write()
            .map_err(|_| Error::internal("OAuth token cache lock poisoned"))? = Some(token);
        Ok(value)
    }

    /// Blocking variant of [`OAuthM2M::access_token`] for synchronous callers.
    pub fn blocking_access_token(&self) -> Result<String> {
        if let Some(token) = self.cached()? {
            return Ok(token);
        }
        block_on(self.access_token())
    }
}

impl AuthProvider for OAuthM2M {
    fn get_auth_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.blocking_access_token()?))
    }
}

/// Drives `future` to completion from synchronous code, whether or not the
/// caller is already inside a tokio runtime.
fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
    T: Send,
{
    let run = move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::internal(format!("Failed to create Tokio runtime: {}", e)))?;
        rt.block_on(future)
    };

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(run)
        }
        // block_in_place is not allowed on a current-thread runtime.
        Ok(_) => std::thread::scope(|scope| scope.spawn(run).join())
            .map_err(|_| Error::internal("OAuth token exchange thread panicked"))?,
        Err(_) => run(),
    }
}
