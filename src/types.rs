use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

/// Identity subject identifier issued by the provider (ULID format).
///
/// Immutable, unique per account. The application stores this as the sole
/// link between a [`Profile`] and its identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct IdentityId(pub Ulid);

/// Authenticated identity derived from the provider's user payload.
///
/// Read-only from the application's perspective: all mutation happens at the
/// identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub email_confirmed: bool,
}

/// Paid subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Growth,
    Scale,
    Pro,
}

impl PlanId {
    /// Human-facing plan name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Growth => "Growth",
            Self::Scale => "Scale",
            Self::Pro => "Pro",
        }
    }

    /// Price lookup key understood by the checkout-session backend.
    #[must_use]
    pub fn price_lookup_key(self) -> &'static str {
        match self {
            Self::Growth => "price_growth",
            Self::Scale => "price_scale",
            Self::Pro => "price_pro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Trial,
    Paid,
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
}

/// Derived account standing, recomputed on every read.
///
/// Exactly one of the three holds at any instant; see
/// [`Profile::standing_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStanding {
    /// Active paid subscription.
    Active,
    /// Trial account with a live trial window.
    Trialing,
    /// Neither: read-only, limited by policy.
    Demo,
}

/// Business-level user profile, one per identity.
///
/// Created at sign-up with a 7-day trial window; mutated by checkout
/// confirmation and backend subscription sync; never deleted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: IdentityId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    pub account_type: AccountType,
    #[serde(default)]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub subscription_plan: Option<PlanId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub subscription_current_period_end: Option<OffsetDateTime>,
    /// Deletion deadline for demo accounts (backend policy, display only).
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub account_expires_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub login_count: i64,
}

impl Profile {
    /// Active paid subscription: status is `active` AND the account is `paid`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription_status == Some(SubscriptionStatus::Active)
            && self.account_type == AccountType::Paid
    }

    /// Live trial: the account is `trial` AND a trial end exists AND it is
    /// strictly in the future.
    #[must_use]
    pub fn is_trialing_at(&self, now: OffsetDateTime) -> bool {
        self.account_type == AccountType::Trial
            && self.trial_ends_at.is_some_and(|ends| ends > now)
    }

    /// Classify the account. Never cache the result across profile updates.
    #[must_use]
    pub fn standing_at(&self, now: OffsetDateTime) -> AccountStanding {
        if self.is_active() {
            AccountStanding::Active
        } else if self.is_trialing_at(now) {
            AccountStanding::Trialing
        } else {
            AccountStanding::Demo
        }
    }

    /// Whole days left on the current period (active subscriptions) or the
    /// trial window, rounded up. `None` when no end date applies.
    #[must_use]
    pub fn days_remaining_at(&self, now: OffsetDateTime) -> Option<i64> {
        let end = if self.subscription_status == Some(SubscriptionStatus::Active) {
            self.subscription_current_period_end
        } else {
            self.trial_ends_at
        }?;
        Some(days_until(end, now))
    }

    /// Whole days until a demo account is deleted, rounded up.
    #[must_use]
    pub fn demo_days_remaining_at(&self, now: OffsetDateTime) -> Option<i64> {
        self.account_expires_at.map(|ends| days_until(ends, now))
    }
}

fn days_until(end: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let seconds = (end - now).whole_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 86_399) / 86_400
    }
}
