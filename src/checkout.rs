use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::error::Error;
use crate::http;
use crate::notify::{Notification, Notifier};
use crate::profile::{ProfileLoader, ProfileStore};
use crate::session::SessionStore;
use crate::types::{AccountType, IdentityId, PlanId, SubscriptionStatus};

/// Pause before the post-confirmation redirect, so the user can read the
/// confirmation before navigation.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(3);

/// Route navigated to once a confirmed checkout has been displayed.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// One entry of the client-side plan catalog. Prices are monthly, in pence
/// (GBP), and mirror the backend's processor catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PlanInfo {
    pub id: PlanId,
    pub name: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub monthly_price_pence: u32,
}

static PLANS: [PlanInfo; 3] = [
    PlanInfo {
        id: PlanId::Growth,
        name: "Growth Plan",
        description: "Up to 500 subscribers with basic recovery and churn prediction",
        features: &[
            "Up to 500 subscribers",
            "Basic recovery",
            "Churn prediction",
            "Email notifications",
            "Standard support",
        ],
        monthly_price_pence: 4_900,
    },
    PlanInfo {
        id: PlanId::Scale,
        name: "Scale Plan",
        description: "Up to 2,000 subscribers with advanced recovery and AI churn prevention",
        features: &[
            "Up to 2,000 subscribers",
            "Advanced recovery",
            "AI churn prevention",
            "Win-back campaigns",
            "Priority support",
        ],
        monthly_price_pence: 9_900,
    },
    PlanInfo {
        id: PlanId::Pro,
        name: "Pro Plan",
        description: "Unlimited subscribers with enterprise features and dedicated support",
        features: &[
            "Unlimited subscribers",
            "Enterprise features",
            "Custom retention workflows",
            "Dedicated account manager",
            "24/7 premium support",
        ],
        monthly_price_pence: 19_900,
    },
];

/// The subscription plans offered at checkout.
#[must_use]
pub fn subscription_plans() -> &'static [PlanInfo; 3] {
    &PLANS
}

/// Checkout session opened on the payment processor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CheckoutSession {
    pub session_id: String,
    /// Processor-hosted page the caller redirects the user to.
    pub url: String,
}

/// Request body for the checkout-session-creation function.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckout {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Response from the confirmation function. Ephemeral: constructed per
/// call, never persisted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ConfirmResponse {
    pub success: bool,
    #[serde(default)]
    pub plan: Option<PlanId>,
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
}

/// Backend functions fronting the payment processor. The client never talks
/// to the processor itself.
///
/// Implemented over HTTP by [`FunctionsClient`]; tests substitute stubs.
pub trait CheckoutBackend: Send + Sync + 'static {
    fn create_session(
        &self,
        access_token: &str,
        request: &CreateCheckout,
    ) -> impl Future<Output = Result<CheckoutSession, Error>> + Send;

    fn confirm(
        &self,
        access_token: &str,
        reference: &str,
        identity: IdentityId,
    ) -> impl Future<Output = Result<ConfirmResponse, Error>> + Send;
}

/// HTTP client for the backend functions.
pub struct FunctionsClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl FunctionsClient {
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

    fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("functions URL cannot be a base")
            .pop_if_empty()
            .push(segment);
        url
    }
}

impl CheckoutBackend for FunctionsClient {
    async fn create_session(
        &self,
        access_token: &str,
        request: &CreateCheckout,
    ) -> Result<CheckoutSession, Error> {
        let response = self
            .http
            .post(self.endpoint("create-checkout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        let response = http::ensure_success(response, "checkout creation").await?;
        response.json::<CheckoutSession>().await.map_err(Into::into)
    }

    async fn confirm(
        &self,
        access_token: &str,
        reference: &str,
        identity: IdentityId,
    ) -> Result<ConfirmResponse, Error> {
        let response = self
            .http
            .post(self.endpoint("confirm-checkout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .json(&serde_json::json!({
                "sessionId": reference,
                "userId": identity,
            }))
            .send()
            .await?;

        let response = http::ensure_success(response, "checkout confirmation").await?;
        response.json::<ConfirmResponse>().await.map_err(Into::into)
    }
}

/// Plan and trial details displayed after a confirmed checkout, plus the
/// scheduled navigation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CheckoutConfirmation {
    pub plan: Option<PlanId>,
    pub status: Option<SubscriptionStatus>,
    pub is_trial: bool,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub redirect: RedirectPlan,
}

/// Deferred navigation instruction for the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPlan {
    pub to: &'static str,
    pub after: Duration,
}

/// Confirms completed checkouts and reflects the outcome into the profile.
pub struct CheckoutFlow<B, R, N> {
    backend: Arc<B>,
    store: Arc<SessionStore>,
    profiles: Arc<ProfileLoader<R>>,
    notifier: Arc<N>,
    site_url: Url,
}

impl<B, R, N> CheckoutFlow<B, R, N>
where
    B: CheckoutBackend,
    R: ProfileStore,
    N: Notifier,
{
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        store: Arc<SessionStore>,
        profiles: Arc<ProfileLoader<R>>,
        notifier: Arc<N>,
        site_url: Url,
    ) -> Self {
        Self {
            backend,
            store,
            profiles,
            notifier,
            site_url,
        }
    }

    /// Open a processor checkout session for `plan`. The caller redirects
    /// the user to the returned URL; the processor substitutes the session
    /// id into the success URL template on return.
    pub async fn begin_checkout(&self, plan: PlanId) -> Result<CheckoutSession, Error> {
        let Some(session) = self.store.current() else {
            return Err(Error::Checkout("You must be signed in to subscribe.".into()));
        };

        let base = self.site_url.as_str().trim_end_matches('/');
        let request = CreateCheckout {
            price_id: plan.price_lookup_key().to_owned(),
            success_url: format!("{base}/checkout-success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/checkout?cancelled=true"),
        };

        match self.backend.create_session(&session.access_token, &request).await {
            Ok(checkout) => {
                tracing::info!(plan = plan.display_name(), session_id = %checkout.session_id, "checkout session created");
                Ok(checkout)
            }
            Err(error) => {
                tracing::error!(error = %error, plan = plan.display_name(), "checkout creation failed");
                self.notifier.notify(Notification::error(
                    "Checkout error",
                    "Failed to create checkout session. Please try again.",
                ));
                Err(error)
            }
        }
    }

    /// Confirm a completed checkout by its processor reference.
    ///
    /// Guards run before any network call; the backend is reached exactly
    /// once. Never retried automatically; calling it again with the same
    /// reference is tolerated, idempotency is the backend's contract.
    pub async fn confirm_checkout(
        &self,
        reference: Option<&str>,
    ) -> Result<CheckoutConfirmation, Error> {
        let Some(reference) = reference.filter(|reference| !reference.is_empty()) else {
            return Err(Error::Checkout("Missing checkout session ID.".into()));
        };
        let Some(session) = self.store.current() else {
            return Err(Error::Checkout(
                "You must be signed in to confirm a subscription.".into(),
            ));
        };

        let response = match self
            .backend
            .confirm(&session.access_token, reference, session.identity.id)
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(error = %error, reference, "checkout confirmation failed");
                self.notifier.notify(Notification::error(
                    "Checkout error",
                    "There was a problem processing your subscription.",
                ));
                return Err(error);
            }
        };

        if !response.success {
            self.notifier.notify(Notification::error(
                "Checkout error",
                "Subscription could not be verified. Please contact support if you believe this is an error.",
            ));
            return Err(Error::Checkout("subscription could not be verified".into()));
        }

        // The backend has written the subscription fields server-side;
        // re-derive the profile so read sites see them.
        self.profiles.refresh().await;

        let plan_name = response.plan.map_or("selected", PlanId::display_name);
        self.notifier.notify(Notification::success(
            "Subscription activated",
            format!("You have successfully subscribed to the {plan_name} plan."),
        ));
        tracing::info!(identity = %session.identity.id, plan = plan_name, "subscription confirmed");

        Ok(CheckoutConfirmation {
            plan: response.plan,
            status: response.status,
            is_trial: response.is_trial,
            trial_ends_at: response.trial_ends_at,
            redirect: RedirectPlan {
                to: DASHBOARD_ROUTE,
                after: REDIRECT_DELAY,
            },
        })
    }

    /// Neutral message for a cancelled checkout return.
    pub fn checkout_cancelled(&self) {
        self.notifier.notify(Notification::info(
            "Checkout cancelled",
            "Checkout was cancelled. Please try again when you're ready.",
        ));
    }
}
