use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::AuthController;
use crate::checkout::{CheckoutBackend, CheckoutFlow, FunctionsClient};
use crate::config::ClientConfig;
use crate::expiry::ExpiryMonitor;
use crate::guard::{self, RouteDecision};
use crate::notify::Notifier;
use crate::profile::{ProfileApi, ProfileLoader, ProfileStore};
use crate::provider::{IdentityProvider, ProviderClient};
use crate::session::{SessionStore, SubscriptionHandle};

/// Owns the session lifecycle for one application run.
///
/// Created at application start, torn down on drop: the expiry monitor is
/// aborted and the profile loader's subscription released, so isolated
/// instances never leak timers or callbacks across runs.
pub struct SessionContext<P, R, B, N> {
    store: Arc<SessionStore>,
    auth: AuthController<P, R, N>,
    profiles: Arc<ProfileLoader<R>>,
    checkout: CheckoutFlow<B, R, N>,
    _profile_subscription: SubscriptionHandle,
    _monitor: ExpiryMonitor,
}

/// Context wired to the HTTP clients.
pub type HttpSessionContext<N> = SessionContext<ProviderClient, ProfileApi, FunctionsClient, N>;

impl<N: Notifier> SessionContext<ProviderClient, ProfileApi, FunctionsClient, N> {
    /// Assemble a context from configuration, wiring the HTTP clients.
    /// Must be called within a Tokio runtime (the expiry monitor is spawned
    /// here).
    #[must_use]
    pub fn connect(config: &ClientConfig, notifier: N) -> Self {
        let api_key = config.provider().api_key().to_owned();
        Self::assemble(
            Arc::new(ProviderClient::new(config.provider().clone())),
            Arc::new(ProfileApi::new(config.rest_url().clone(), api_key.clone())),
            Arc::new(FunctionsClient::new(config.functions_url().clone(), api_key)),
            Arc::new(notifier),
            config.site_url().clone(),
            config.expiry_check_interval(),
        )
    }
}

impl<P, R, B, N> SessionContext<P, R, B, N>
where
    P: IdentityProvider,
    R: ProfileStore,
    B: CheckoutBackend,
    N: Notifier,
{
    /// Assemble a context from explicit collaborators. Tests substitute
    /// stubs here.
    #[must_use]
    pub fn assemble(
        provider: Arc<P>,
        profile_store: Arc<R>,
        backend: Arc<B>,
        notifier: Arc<N>,
        site_url: Url,
        expiry_interval: Duration,
    ) -> Self {
        let store = SessionStore::new();
        let profiles = ProfileLoader::new(Arc::clone(&store), Arc::clone(&profile_store));
        let profile_subscription = profiles.attach();
        let monitor = ExpiryMonitor::spawn(
            Arc::clone(&store),
            Arc::clone(&provider),
            Arc::clone(&notifier),
            expiry_interval,
        );
        let auth = AuthController::new(
            Arc::clone(&provider),
            profile_store,
            Arc::clone(&store),
            Arc::clone(&notifier),
        );
        let checkout = CheckoutFlow::new(
            backend,
            Arc::clone(&store),
            Arc::clone(&profiles),
            notifier,
            site_url,
        );
        Self {
            store,
            auth,
            profiles,
            checkout,
            _profile_subscription: profile_subscription,
            _monitor: monitor,
        }
    }

    /// The session store (read access for views and guards).
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// The auth lifecycle controller.
    #[must_use]
    pub fn auth(&self) -> &AuthController<P, R, N> {
        &self.auth
    }

    /// The profile loader.
    #[must_use]
    pub fn profiles(&self) -> &Arc<ProfileLoader<R>> {
        &self.profiles
    }

    /// The checkout flow.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutFlow<B, R, N> {
        &self.checkout
    }

    /// Route-guard decision for protected views at this instant.
    #[must_use]
    pub fn route_decision(&self) -> RouteDecision {
        let identity = self.store.identity();
        guard::protect(identity.as_ref(), !self.store.is_resolved())
    }
}
