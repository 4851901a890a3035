//! Credentials
//!
//! Bearer tokens for the authenticated transport: none, a static token, or
//! Google Application Default Credentials (ADC) with token caching.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for ADC tokens
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a static bearer token
pub const TOKEN_ENV: &str = "RESOURCE_CLIENT_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Credentials attached to every request
#[derive(Clone)]
pub enum Credentials {
    /// No Authorization header
    Anonymous,
    /// Fixed bearer token
    Static(String),
    /// Application Default Credentials
    Adc(AdcCredentials),
}

impl Credentials {
    /// Use Application Default Credentials with the given scopes
    pub async fn adc(scopes: Vec<String>) -> Result<Self> {
        Ok(Self::Adc(AdcCredentials::new(scopes).await?))
    }

    /// Bearer token for the next request, `None` for anonymous access
    pub async fn token(&self) -> Result<Option<String>> {
        match self {
            Self::Anonymous => Ok(None),
            Self::Static(token) => Ok(Some(token.clone())),
            Self::Adc(adc) => adc.get_token().await.map(Some),
        }
    }
}

// Security: never print token material
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::Adc(adc) => f.debug_tuple("Adc").field(&adc.scopes).finish(),
        }
    }
}

/// ADC holder with token caching
#[derive(Clone)]
pub struct AdcCredentials {
    provider: Arc<dyn TokenProvider>,
    scopes: Vec<String>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl AdcCredentials {
    /// Initialise ADC; an empty scope list falls back to [`DEFAULT_SCOPES`]
    pub async fn new(scopes: Vec<String>) -> Result<Self> {
        let provider = gcp_auth::provider().await.context(
            "Failed to initialize authentication. Run 'gcloud auth application-default login'",
        )?;

        Ok(Self::with_provider(provider, scopes))
    }

    /// Wrap an existing token provider
    pub fn with_provider(provider: Arc<dyn TokenProvider>, scopes: Vec<String>) -> Self {
        let scopes = if scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            scopes
        };

        Self {
            provider,
            scopes,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token, reusing the cached one while it is valid
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let token = self
            .provider
            .token(&scopes)
            .await
            .context("Failed to get access token")?;

        let token_str = token.as_str().to_string();
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }
}
