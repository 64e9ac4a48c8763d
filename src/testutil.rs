//! In-memory collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

use crate::auth::SignUpRequest;
use crate::checkout::{CheckoutBackend, CheckoutSession, ConfirmResponse, CreateCheckout};
use crate::error::Error;
use crate::profile::{NewProfile, ProfileStore, TRIAL_WINDOW};
use crate::provider::{IdentityProvider, ProviderUser, SignUpMetadata};
use crate::session::{Session, SessionStore};
use crate::types::{AccountType, Identity, IdentityId, Profile};

pub(crate) fn test_identity() -> Identity {
    Identity {
        id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse().unwrap(),
        email: "owner@example.com".into(),
        email_confirmed: true,
    }
}

pub(crate) fn fresh_session(issued_at: OffsetDateTime) -> Session {
    Session {
        identity: test_identity(),
        access_token: "access-token".into(),
        token_type: "bearer".into(),
        refresh_token: Some("refresh-token".into()),
        provider_expires_in: Some(3_600),
        issued_at,
    }
}

pub(crate) fn trial_profile(id: IdentityId, now: OffsetDateTime) -> Profile {
    Profile {
        id,
        full_name: Some("Ada Owner".into()),
        business_name: Some("Owner & Co".into()),
        account_type: AccountType::Trial,
        subscription_status: None,
        subscription_plan: None,
        trial_ends_at: Some(now + TRIAL_WINDOW),
        subscription_current_period_end: None,
        account_expires_at: None,
        last_login_at: Some(now),
        login_count: 1,
    }
}

pub(crate) fn signup_request() -> SignUpRequest {
    SignUpRequest {
        email: "owner@example.com".into(),
        password: "hunter2!".into(),
        password_confirmation: "hunter2!".into(),
        full_name: "Ada Owner".into(),
        business_name: "Owner & Co".into(),
    }
}

pub(crate) fn unverified_user() -> ProviderUser {
    ProviderUser::new(test_identity().id, "owner@example.com")
}

pub(crate) fn provider_error(code: Option<&str>, detail: &str) -> Error {
    Error::Provider {
        operation: "sign-in",
        status: Some(400),
        code: code.map(str::to_owned),
        detail: detail.into(),
    }
}

/// Identity provider whose responses are scripted per test.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    sign_in: Mutex<Option<Result<Session, Error>>>,
    sign_up: Mutex<Option<Result<ProviderUser, Error>>>,
    verify: Mutex<Option<Result<Session, Error>>>,
    resend: Mutex<Option<Result<(), Error>>>,
    sign_out_fails: AtomicBool,
    pub(crate) network_calls: AtomicUsize,
    pub(crate) sign_out_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn script_sign_in(&self, result: Result<Session, Error>) {
        *self.sign_in.lock().unwrap() = Some(result);
    }

    pub(crate) fn script_sign_up(&self, result: Result<ProviderUser, Error>) {
        *self.sign_up.lock().unwrap() = Some(result);
    }

    pub(crate) fn script_verify(&self, result: Result<Session, Error>) {
        *self.verify.lock().unwrap() = Some(result);
    }

    pub(crate) fn script_resend(&self, result: Result<(), Error>) {
        *self.resend.lock().unwrap() = Some(result);
    }

    pub(crate) fn fail_sign_out(&self) {
        self.sign_out_fails.store(true, Ordering::SeqCst);
    }
}

impl IdentityProvider for ScriptedProvider {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, Error> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_in
            .lock()
            .unwrap()
            .take()
            .expect("unscripted sign_in call")
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _metadata: &SignUpMetadata,
    ) -> Result<ProviderUser, Error> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_up
            .lock()
            .unwrap()
            .take()
            .expect("unscripted sign_up call")
    }

    async fn verify_otp(&self, _email: &str, _token: &str) -> Result<Session, Error> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.verify
            .lock()
            .unwrap()
            .take()
            .expect("unscripted verify_otp call")
    }

    async fn resend_verification(&self, _email: &str) -> Result<(), Error> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.resend
            .lock()
            .unwrap()
            .take()
            .expect("unscripted resend call")
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), Error> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.sign_out_fails.load(Ordering::SeqCst) {
            Err(provider_error(None, "revocation failed"))
        } else {
            Ok(())
        }
    }
}

/// In-memory profile records.
#[derive(Default)]
pub(crate) struct MemoryProfiles {
    rows: Mutex<HashMap<IdentityId, Profile>>,
    created: Mutex<Vec<NewProfile>>,
    logins: Mutex<Vec<IdentityId>>,
    fail_next_fetch: AtomicBool,
    fail_next_create: AtomicBool,
    clear_store_during_fetch: Mutex<Option<Arc<SessionStore>>>,
}

impl MemoryProfiles {
    pub(crate) fn insert(&self, profile: Profile) {
        self.rows.lock().unwrap().insert(profile.id, profile);
    }

    pub(crate) fn created(&self) -> Vec<NewProfile> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn logins(&self) -> Vec<IdentityId> {
        self.logins.lock().unwrap().clone()
    }

    pub(crate) fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Sign the store out while a fetch is in flight (stale-response setup).
    pub(crate) fn clear_store_during_fetch(&self, store: Arc<SessionStore>) {
        *self.clear_store_during_fetch.lock().unwrap() = Some(store);
    }
}

impl ProfileStore for MemoryProfiles {
    async fn fetch(&self, id: IdentityId) -> Result<Option<Profile>, Error> {
        if let Some(store) = self.clear_store_during_fetch.lock().unwrap().take() {
            store.replace(None);
        }
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(provider_error(None, "profile fetch failed"));
        }
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, profile: &NewProfile) -> Result<(), Error> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(provider_error(None, "profile create failed"));
        }
        self.created.lock().unwrap().push(profile.clone());
        Ok(())
    }

    async fn record_login(&self, id: IdentityId, _at: OffsetDateTime) -> Result<(), Error> {
        self.logins.lock().unwrap().push(id);
        Ok(())
    }
}

/// Checkout backend whose responses are scripted per test.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    confirm: Mutex<Option<Result<ConfirmResponse, Error>>>,
    create: Mutex<Option<Result<CheckoutSession, Error>>>,
    seen: Mutex<Vec<(String, IdentityId)>>,
    create_requests: Mutex<Vec<CreateCheckout>>,
    pub(crate) confirm_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn script_confirm(&self, result: Result<ConfirmResponse, Error>) {
        *self.confirm.lock().unwrap() = Some(result);
    }

    pub(crate) fn script_create(&self, result: Result<CheckoutSession, Error>) {
        *self.create.lock().unwrap() = Some(result);
    }

    pub(crate) fn seen(&self) -> Vec<(String, IdentityId)> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn create_requests(&self) -> Vec<CreateCheckout> {
        self.create_requests.lock().unwrap().clone()
    }
}

impl CheckoutBackend for ScriptedBackend {
    async fn create_session(
        &self,
        _access_token: &str,
        request: &CreateCheckout,
    ) -> Result<CheckoutSession, Error> {
        self.create_requests.lock().unwrap().push(request.clone());
        self.create
            .lock()
            .unwrap()
            .take()
            .expect("unscripted create_session call")
    }

    async fn confirm(
        &self,
        _access_token: &str,
        reference: &str,
        identity: IdentityId,
    ) -> Result<ConfirmResponse, Error> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((reference.to_owned(), identity));
        self.confirm
            .lock()
            .unwrap()
            .take()
            .expect("unscripted confirm call")
    }
}
