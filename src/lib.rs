#![doc = include_str!("../README.md")]

pub mod auth;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod expiry;
pub mod guard;
mod http;
pub mod notify;
pub mod profile;
pub mod provider;
pub mod session;
#[cfg(test)]
mod testutil;
pub mod types;

// Re-exports for convenient access
pub use auth::{AuthController, SignIn, SignUpRequest};
pub use checkout::{
    CheckoutBackend, CheckoutConfirmation, CheckoutFlow, CheckoutSession, ConfirmResponse,
    CreateCheckout, DASHBOARD_ROUTE, FunctionsClient, PlanInfo, REDIRECT_DELAY, RedirectPlan,
    subscription_plans,
};
pub use config::ClientConfig;
pub use context::{HttpSessionContext, SessionContext};
pub use error::Error;
pub use expiry::{CHECK_INTERVAL, ExpiryMonitor};
pub use guard::{RouteDecision, protect};
pub use notify::{MemoryNotifier, Notification, Notifier, Severity, TracingNotifier};
pub use profile::{NewProfile, ProfileApi, ProfileLoader, ProfileStore, TRIAL_WINDOW};
pub use provider::{
    IdentityProvider, ProviderClient, ProviderConfig, ProviderUser, SessionResponse,
    SignUpMetadata,
};
pub use session::{SESSION_CEILING, Session, SessionStore, SubscriptionHandle};
pub use types::{
    AccountStanding, AccountType, Identity, IdentityId, PlanId, Profile, SubscriptionStatus,
};
