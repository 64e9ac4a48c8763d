use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::Error;
use crate::notify::{Notification, Notifier};
use crate::profile::{NewProfile, ProfileStore};
use crate::provider::{IdentityProvider, SignUpMetadata};
use crate::session::{Session, SessionStore};
use crate::types::Identity;

/// Outcome of a sign-in attempt that did not hard-fail.
#[derive(Debug, Clone)]
pub enum SignIn {
    /// Credentials accepted; the session store now holds this session.
    /// `session.identity.email_confirmed` distinguishes the verified and
    /// unverified signed-in states.
    SignedIn(Session),
    /// The provider rejected the attempt because the address is unconfirmed.
    /// Not a failure: route the user to the verification flow instead of an
    /// error banner.
    EmailVerificationNeeded,
}

/// Sign-up form input, validated locally before any network call.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub full_name: String,
    pub business_name: String,
}

impl SignUpRequest {
    fn validate(&self) -> Result<(), Error> {
        if self.email.trim().is_empty() {
            return Err(Error::Validation("email is required".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }
        if self.full_name.trim().is_empty() {
            return Err(Error::Validation("full name is required".into()));
        }
        if self.business_name.trim().is_empty() {
            return Err(Error::Validation("business name is required".into()));
        }
        if self.password != self.password_confirmation {
            return Err(Error::Validation("passwords do not match".into()));
        }
        Ok(())
    }
}

/// Orchestrates the authentication lifecycle against the identity provider.
///
/// Remote errors are normalized and returned to the caller, never thrown
/// across the boundary. Every completed transition emits exactly one
/// user-facing notification.
pub struct AuthController<P, R, N> {
    provider: Arc<P>,
    profiles: Arc<R>,
    store: Arc<SessionStore>,
    notifier: Arc<N>,
}

impl<P, R, N> AuthController<P, R, N>
where
    P: IdentityProvider,
    R: ProfileStore,
    N: Notifier,
{
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        profiles: Arc<R>,
        store: Arc<SessionStore>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            provider,
            profiles,
            store,
            notifier,
        }
    }

    /// Sign in with email and password.
    ///
    /// An unconfirmed address comes back as
    /// [`SignIn::EmailVerificationNeeded`] with the store untouched and no
    /// error notification shown.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, Error> {
        match self.provider.sign_in(email, password).await {
            Ok(session) => {
                self.store.replace(Some(session.clone()));
                if let Err(error) = self
                    .profiles
                    .record_login(session.identity.id, session.issued_at)
                    .await
                {
                    // Bookkeeping only; the sign-in itself already succeeded.
                    tracing::warn!(identity = %session.identity.id, error = %error, "login tracking failed");
                }
                tracing::info!(identity = %session.identity.id, "sign-in succeeded");
                self.notifier.notify(Notification::success(
                    "Welcome back!",
                    format!("You're now signed in as {email}"),
                ));
                Ok(SignIn::SignedIn(session))
            }
            Err(error) if error.is_email_not_confirmed() => {
                tracing::info!(email, "sign-in pending email verification");
                Ok(SignIn::EmailVerificationNeeded)
            }
            Err(error) => {
                self.notifier.notify(Notification::error(
                    "Authentication failed",
                    error.to_string(),
                ));
                Err(error)
            }
        }
    }

    /// Create an account and its initial 7-day-trial profile.
    ///
    /// Validation failures are reported before any network call. The new
    /// identity is unverified until [`verify_email`](Self::verify_email).
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<Identity, Error> {
        request.validate()?;

        let metadata = SignUpMetadata {
            full_name: request.full_name.clone(),
            business_name: request.business_name.clone(),
        };
        let user = match self
            .provider
            .sign_up(&request.email, &request.password, &metadata)
            .await
        {
            Ok(user) => user,
            Err(error) => {
                self.notifier
                    .notify(Notification::error("Signup failed", error.to_string()));
                return Err(error);
            }
        };

        let identity = user.into_identity();
        let profile = NewProfile::trial(
            identity.id,
            request.full_name.clone(),
            request.business_name.clone(),
            OffsetDateTime::now_utc(),
        );
        // The account already exists at this point; a failed profile write is
        // recoverable backend-side and must not fail the sign-up.
        if let Err(error) = self.profiles.create(&profile).await {
            tracing::warn!(identity = %identity.id, error = %error, "initial profile write failed");
        }

        tracing::info!(identity = %identity.id, "sign-up succeeded, verification pending");
        self.notifier.notify(Notification::info(
            "Verify your email",
            format!("We've sent a confirmation code to {}.", request.email),
        ));
        Ok(identity)
    }

    /// Exchange a one-time verification code for a confirmed session.
    pub async fn verify_email(&self, email: &str, token: &str) -> Result<Session, Error> {
        match self.provider.verify_otp(email, token).await {
            Ok(session) => {
                self.store.replace(Some(session.clone()));
                self.notifier.notify(Notification::success(
                    "Email verified",
                    "Your email has been successfully verified.",
                ));
                Ok(session)
            }
            Err(error) => {
                self.notifier
                    .notify(Notification::error("Verification failed", error.to_string()));
                Err(error)
            }
        }
    }

    /// Re-trigger delivery of the verification email. Always safe to retry;
    /// provider failures (rate limiting included) surface without changing
    /// local state.
    pub async fn resend_verification_email(&self, email: &str) -> Result<(), Error> {
        match self.provider.resend_verification(email).await {
            Ok(()) => {
                self.notifier.notify(Notification::success(
                    "Verification email sent",
                    "Please check your inbox for the verification code.",
                ));
                Ok(())
            }
            Err(error) => {
                self.notifier
                    .notify(Notification::error("Error", error.to_string()));
                Err(error)
            }
        }
    }

    /// Sign out. Local state is cleared first and unconditionally; a failed
    /// remote revocation is logged, never surfaced. Degraded but safe.
    pub async fn sign_out(&self) {
        let previous = self.store.current();
        self.store.replace(None);
        if let Some(session) = previous {
            if let Err(error) = self.provider.sign_out(&session.access_token).await {
                tracing::warn!(error = %error, "remote sign-out failed");
            }
        }
        self.notifier.notify(Notification::info(
            "Signed out",
            "You have been signed out successfully.",
        ));
    }

    /// Seed the store from a session persisted by the host application.
    ///
    /// The session ceiling is enforced here too: an already-expired persisted
    /// session goes through the neutral expiry path instead of being seeded.
    pub async fn bootstrap(&self, persisted: Option<Session>) {
        let now = OffsetDateTime::now_utc();
        match persisted {
            Some(session) if session.is_expired_at(now) => {
                tracing::info!(identity = %session.identity.id, "persisted session already expired");
                if let Err(error) = self.provider.sign_out(&session.access_token).await {
                    tracing::warn!(error = %error, "remote sign-out failed during bootstrap");
                }
                self.store.replace(None);
                self.notifier.notify(Notification::info(
                    "Session expired",
                    "Your session has expired. Please sign in again.",
                ));
            }
            other => self.store.replace(other),
        }
    }
}
