use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::expiry;
use crate::provider::ProviderConfig;

/// Client configuration.
///
/// Required endpoints are constructor parameters; optional knobs use `with_*`
/// chaining. Use [`from_env()`](ClientConfig::from_env) for convention-based
/// setup.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) provider: ProviderConfig,
    pub(crate) functions_url: Url,
    pub(crate) rest_url: Url,
    pub(crate) site_url: Url,
    pub(crate) expiry_check_interval: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(provider: ProviderConfig, functions_url: Url, rest_url: Url, site_url: Url) -> Self {
        Self {
            provider,
            functions_url,
            rest_url,
            site_url,
            expiry_check_interval: expiry::CHECK_INTERVAL,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Required env vars
    /// - `RETAINLY_PROVIDER_URL`: identity provider base URL
    /// - `RETAINLY_PROVIDER_KEY`: publishable API key
    /// - `RETAINLY_FUNCTIONS_URL`: backend functions base URL
    /// - `RETAINLY_REST_URL`: hosted store REST base URL
    ///
    /// # Optional env vars
    /// - `RETAINLY_SITE_URL`: public site origin used for checkout return
    ///   URLs (default `https://app.retainly.io`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required variables are missing or URLs
    /// are invalid.
    pub fn from_env() -> Result<Self, Error> {
        let provider_url = require_url("RETAINLY_PROVIDER_URL")?;
        let provider_key = std::env::var("RETAINLY_PROVIDER_KEY")
            .map_err(|_| Error::Config("RETAINLY_PROVIDER_KEY is required".into()))?;
        let functions_url = require_url("RETAINLY_FUNCTIONS_URL")?;
        let rest_url = require_url("RETAINLY_REST_URL")?;
        let site_url = match std::env::var("RETAINLY_SITE_URL") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("RETAINLY_SITE_URL: {e}")))?,
            Err(_) => "https://app.retainly.io"
                .parse()
                .expect("valid default URL"),
        };

        Ok(Self::new(
            ProviderConfig::new(provider_url, provider_key),
            functions_url,
            rest_url,
            site_url,
        ))
    }

    /// Override the expiry-check cadence (default 60 s). Mainly for tests.
    #[must_use]
    pub fn with_expiry_check_interval(mut self, interval: Duration) -> Self {
        self.expiry_check_interval = interval;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    #[must_use]
    pub fn functions_url(&self) -> &Url {
        &self.functions_url
    }

    #[must_use]
    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    #[must_use]
    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    #[must_use]
    pub fn expiry_check_interval(&self) -> Duration {
        self.expiry_check_interval
    }
}

fn require_url(var: &'static str) -> Result<Url, Error> {
    let raw =
        std::env::var(var).map_err(|_| Error::Config(format!("{var} is required")))?;
    raw.parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}
