// ABOUTME: Bearer credential providers injected into provider clients at construction
// ABOUTME: Static tokens for scripts and tests, OAuth refresh-token grant with cached expiry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fitness_core::constants::oauth_providers;
use fitness_core::errors::provider::{ProviderError, ProviderResult};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Refresh this long before the provider-reported expiry
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Supplies a bearer credential on demand
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token
    async fn access_token(&self) -> ProviderResult<String>;

    /// Force a new access token, e.g. after the provider answered 401
    async fn refresh(&self) -> ProviderResult<String>;
}

/// Fixed access token with no refresh capability
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap an access token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> ProviderResult<String> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> ProviderResult<String> {
        Err(ProviderError::AuthenticationFailed {
            provider: oauth_providers::STRAVA.to_owned(),
            reason: "static access token rejected and no refresh token configured".to_owned(),
        })
    }
}

/// OAuth client credentials plus a long-lived refresh token
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// Application client id
    pub client_id: String,
    /// Application client secret
    pub client_secret: String,
    /// Refresh token issued at authorization
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

#[derive(Debug, Default)]
struct CachedToken {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn usable(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        match self.expires_at {
            Some(expires_at) if expires_at - Duration::minutes(REFRESH_MARGIN_MINUTES) <= now => {
                None
            }
            _ => Some(token),
        }
    }
}

/// Exchanges a refresh token for short-lived access tokens
///
/// The cached token and the rotating refresh token sit behind separate
/// `RwLock`s that are only taken around reads and writes, never across the
/// token endpoint call. Readers share the cached token until it is within
/// five minutes of expiry.
pub struct RefreshingTokenProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: RwLock<String>,
    cached: RwLock<CachedToken>,
}

impl RefreshingTokenProvider {
    /// Provider with no cached access token; the first call refreshes
    #[must_use]
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        credentials: OAuthCredentials,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            refresh_token: RwLock::new(credentials.refresh_token),
            cached: RwLock::new(CachedToken::default()),
        }
    }

    /// Seed the cache with a known access token
    #[must_use]
    pub fn with_access_token(
        self,
        access_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            cached: RwLock::new(CachedToken {
                access_token: Some(access_token.into()),
                expires_at,
            }),
            ..self
        }
    }

    #[instrument(skip(self), fields(token_url = %self.token_url))]
    async fn request_new_token(&self) -> ProviderResult<TokenResponse> {
        let refresh_token = self.refresh_token.read().await.clone();
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(strava_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token refresh rejected");
            return Err(ProviderError::AuthenticationFailed {
                provider: oauth_providers::STRAVA.to_owned(),
                reason: format!("token endpoint returned {status}: {body}"),
            });
        }

        response.json::<TokenResponse>().await.map_err(strava_error)
    }
}

fn strava_error(error: reqwest::Error) -> ProviderError {
    ProviderError::from(error).for_provider(oauth_providers::STRAVA)
}

#[async_trait]
impl TokenProvider for RefreshingTokenProvider {
    async fn access_token(&self) -> ProviderResult<String> {
        if let Some(token) = self.cached.read().await.usable(Utc::now()) {
            return Ok(token.to_owned());
        }
        debug!("access token missing or near expiry");
        self.refresh().await
    }

    async fn refresh(&self) -> ProviderResult<String> {
        let response = self.request_new_token().await?;

        if let Some(rotated) = response.refresh_token {
            *self.refresh_token.write().await = rotated;
        }
        let expires_at = response
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        {
            let mut cached = self.cached.write().await;
            cached.access_token = Some(response.access_token.clone());
            cached.expires_at = expires_at;
        }

        info!(?expires_at, "access token refreshed");
        Ok(response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_expires_inside_margin() {
        let now = Utc::now();
        let cached = CachedToken {
            access_token: Some("abc".to_owned()),
            expires_at: Some(now + Duration::minutes(3)),
        };
        assert!(cached.usable(now).is_none());

        let fresh = CachedToken {
            access_token: Some("abc".to_owned()),
            expires_at: Some(now + Duration::hours(1)),
        };
        assert_eq!(fresh.usable(now), Some("abc"));
    }

    #[test]
    fn test_cached_token_without_expiry_is_usable() {
        let cached = CachedToken {
            access_token: Some("abc".to_owned()),
            expires_at: None,
        };
        assert_eq!(cached.usable(Utc::now()), Some("abc"));
    }

    #[tokio::test]
    async fn test_static_provider_cannot_refresh() {
        let provider = StaticTokenProvider::new("token");
        assert_eq!(provider.access_token().await.ok().as_deref(), Some("token"));
        assert!(matches!(
            provider.refresh().await,
            Err(ProviderError::AuthenticationFailed { .. })
        ));
    }
}
