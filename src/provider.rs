use std::future::Future;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::error::Error;
use crate::http;
use crate::session::Session;
use crate::types::{Identity, IdentityId};

/// Identity provider configuration.
///
/// Required fields are constructor parameters, so there are no runtime
/// "missing field" errors.
///
/// ```rust,ignore
/// use retainly_client::ProviderConfig;
///
/// let config = ProviderConfig::new("https://auth.retainly.io/v1".parse()?, "pk_live_...");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub(crate) base_url: Url,
    pub(crate) api_key: String,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Provider base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Publishable API key sent with every request.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("provider URL cannot be a base")
            .pop_if_empty()
            .push(segment);
        url
    }
}

/// User payload returned by the identity provider.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ProviderUser {
    pub id: IdentityId,
    pub email: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub email_confirmed_at: Option<OffsetDateTime>,
}

impl ProviderUser {
    /// Create a `ProviderUser` with the required fields (test stubs and
    /// custom [`IdentityProvider`] implementations).
    #[must_use]
    pub fn new(id: IdentityId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            email_confirmed_at: None,
        }
    }

    /// Set the confirmation timestamp.
    #[must_use]
    pub fn with_email_confirmed_at(mut self, at: OffsetDateTime) -> Self {
        self.email_confirmed_at = Some(at);
        self
    }

    /// Collapse the provider payload into the application identity.
    #[must_use]
    pub fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email,
            email_confirmed: self.email_confirmed_at.is_some(),
        }
    }
}

/// Token-grant response from the provider.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: ProviderUser,
}

impl SessionResponse {
    /// Stamp the receipt time and convert into an application session.
    #[must_use]
    pub fn into_session(self, issued_at: OffsetDateTime) -> Session {
        Session {
            identity: self.user.into_identity(),
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            provider_expires_in: self.expires_in,
            issued_at,
        }
    }
}

/// Sign-up metadata attached to the provider account.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpMetadata {
    pub full_name: String,
    pub business_name: String,
}

/// Narrow request/response contract with the managed identity provider.
///
/// Implemented over HTTP by [`ProviderClient`]; tests substitute stubs.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Password-grant sign-in.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Create an account with profile metadata attached. The returned user
    /// is unverified until the emailed one-time code is exchanged.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> impl Future<Output = Result<ProviderUser, Error>> + Send;

    /// Exchange a signup one-time code for a confirmed session.
    fn verify_otp(
        &self,
        email: &str,
        token: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Re-trigger delivery of the signup verification email.
    fn resend_verification(&self, email: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Revoke the credential provider-side.
    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// HTTP client for the identity provider.
pub struct ProviderClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl ProviderClient {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}

impl IdentityProvider for ProviderClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let response = self
            .http
            .post(self.config.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response = http::ensure_success(response, "sign-in").await?;
        let payload = response.json::<SessionResponse>().await?;
        Ok(payload.into_session(OffsetDateTime::now_utc()))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<ProviderUser, Error> {
        let response = self
            .http
            .post(self.config.endpoint("signup"))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;

        let response = http::ensure_success(response, "sign-up").await?;
        response.json::<ProviderUser>().await.map_err(Into::into)
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<Session, Error> {
        let response = self
            .http
            .post(self.config.endpoint("verify"))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({
                "email": email,
                "token": token,
                "type": "signup",
            }))
            .send()
            .await?;

        let response = http::ensure_success(response, "email verification").await?;
        let payload = response.json::<SessionResponse>().await?;
        Ok(payload.into_session(OffsetDateTime::now_utc()))
    }

    async fn resend_verification(&self, email: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.endpoint("resend"))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "email": email, "type": "signup" }))
            .send()
            .await?;

        http::ensure_success(response, "resend verification").await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.endpoint("logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        http::ensure_success(response, "sign-out").await?;
        Ok(())
    }
}
