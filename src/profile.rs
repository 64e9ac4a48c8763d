use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use url::Url;

use crate::error::Error;
use crate::http;
use crate::session::{SessionStore, SubscriptionHandle};
use crate::types::{AccountType, IdentityId, Profile};

/// Trial window granted to every new account.
pub const TRIAL_WINDOW: Duration = Duration::days(7);

/// New profile record written at sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: IdentityId,
    pub full_name: String,
    pub business_name: String,
    pub account_type: AccountType,
    #[serde(with = "time::serde::rfc3339")]
    pub trial_ends_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login_at: OffsetDateTime,
    pub login_count: i64,
}

impl NewProfile {
    /// Initial trial profile for a just-created identity.
    #[must_use]
    pub fn trial(
        id: IdentityId,
        full_name: impl Into<String>,
        business_name: impl Into<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            business_name: business_name.into(),
            account_type: AccountType::Trial,
            trial_ends_at: now + TRIAL_WINDOW,
            last_login_at: now,
            login_count: 1,
        }
    }
}

/// Profile records on the hosted relational store, keyed by identity id.
///
/// Implemented over HTTP by [`ProfileApi`]; tests substitute stubs.
pub trait ProfileStore: Send + Sync + 'static {
    fn fetch(
        &self,
        id: IdentityId,
    ) -> impl Future<Output = Result<Option<Profile>, Error>> + Send;

    fn create(&self, profile: &NewProfile) -> impl Future<Output = Result<(), Error>> + Send;

    /// Stamp a successful sign-in (last login time, login counter).
    fn record_login(
        &self,
        id: IdentityId,
        at: OffsetDateTime,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// HTTP client for the hosted store's REST surface.
pub struct ProfileApi {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl ProfileApi {
    #[must_use]
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .expect("store URL cannot be a base");
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }
}

impl ProfileStore for ProfileApi {
    async fn fetch(&self, id: IdentityId) -> Result<Option<Profile>, Error> {
        let response = self
            .http
            .get(self.endpoint(&["user_profiles"]))
            .query(&[
                ("id", format!("eq.{id}")),
                ("select", "*".to_owned()),
                ("limit", "1".to_owned()),
            ])
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let response = http::ensure_success(response, "profile fetch").await?;
        let mut rows = response.json::<Vec<Profile>>().await?;
        Ok(rows.pop())
    }

    async fn create(&self, profile: &NewProfile) -> Result<(), Error> {
        let response = self
            .http
            .post(self.endpoint(&["user_profiles"]))
            .header("apikey", &self.api_key)
            .header("Prefer", "return=minimal")
            .json(profile)
            .send()
            .await?;

        http::ensure_success(response, "profile create").await?;
        Ok(())
    }

    async fn record_login(&self, id: IdentityId, at: OffsetDateTime) -> Result<(), Error> {
        #[derive(Serialize)]
        struct RecordLogin {
            identity_id: IdentityId,
            #[serde(with = "time::serde::rfc3339")]
            at: OffsetDateTime,
        }

        // The store owns the counter increment; a read-modify-write from the
        // client would race concurrent sign-ins.
        let response = self
            .http
            .post(self.endpoint(&["rpc", "record_login"]))
            .header("apikey", &self.api_key)
            .json(&RecordLogin { identity_id: id, at })
            .send()
            .await?;

        http::ensure_success(response, "login tracking").await?;
        Ok(())
    }
}

/// Fetches and caches the business profile for the current identity.
///
/// A missing or unloadable profile is never an authentication failure: read
/// sites tolerate `None` and render a placeholder instead.
pub struct ProfileLoader<R> {
    store: Arc<SessionStore>,
    profiles: Arc<R>,
    cell: Mutex<Option<Profile>>,
    loading: AtomicBool,
}

impl<R: ProfileStore> ProfileLoader<R> {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, profiles: Arc<R>) -> Arc<Self> {
        Arc::new(Self {
            store,
            profiles,
            cell: Mutex::new(None),
            loading: AtomicBool::new(false),
        })
    }

    /// Latest loaded profile, if any.
    #[must_use]
    pub fn current(&self) -> Option<Profile> {
        self.cell.lock().expect("profile lock").clone()
    }

    /// True while a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Re-derive the profile for the current identity.
    ///
    /// Signed out clears the cached profile. A response fetched for an
    /// identity that no longer matches the current session is discarded
    /// (the later writer wins).
    pub async fn refresh(&self) {
        let Some(identity) = self.store.identity() else {
            *self.cell.lock().expect("profile lock") = None;
            return;
        };

        self.loading.store(true, Ordering::Release);
        let fetched = self.profiles.fetch(identity.id).await;

        if self.store.identity().map(|current| current.id) != Some(identity.id) {
            tracing::debug!(identity = %identity.id, "discarding stale profile response");
            self.loading.store(false, Ordering::Release);
            return;
        }

        match fetched {
            Ok(profile) => {
                *self.cell.lock().expect("profile lock") = profile;
            }
            Err(error) => {
                tracing::warn!(identity = %identity.id, error = %error, "profile load failed");
                *self.cell.lock().expect("profile lock") = None;
            }
        }
        self.loading.store(false, Ordering::Release);
    }

    /// Subscribe the loader to the session store so every session change
    /// triggers a refresh. Keep the handle alive for the owning view's
    /// lifetime; dropping it detaches the loader.
    #[must_use]
    pub fn attach(self: &Arc<Self>) -> SubscriptionHandle {
        let loader = Arc::clone(self);
        self.store.subscribe(move |_| {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move {
                loader.refresh().await;
            });
        })
    }
}
