//! Authentication view models: log in, create account, reset password,
//! OAuth sign-in, verification notice, and log out.
//!
//! Every submit clears the form's error first, returns early on blank
//! required fields or when a submission is already in flight, and on success
//! returns the route to navigate to. Backend failures become the form's
//! single error string.

use crate::{
    backend::IdentityProvider,
    errors::BackendError,
    forms::{Slot, SubmitFlag},
    model::{OAuthProvider, Persistence, ProfileUpdate},
    routes::{Route, resolve},
    validators::require_filled,
};

#[derive(Debug, Default)]
pub struct LoginForm {
    email: Slot<String>,
    password: Slot<String>,
    error: Slot<String>,
    loading: SubmitFlag,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_email(&self, email: impl Into<String>) {
        self.email.set(email.into());
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.password.set(password.into());
    }

    pub fn email(&self) -> String {
        self.email.get()
    }

    /// Current error text; empty when there is none.
    pub fn error(&self) -> String {
        self.error.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    /// Signs in with a session-scoped persistence and navigates home.
    pub async fn submit<P: IdentityProvider>(&self, provider: &P) -> Option<Route> {
        self.error.set(String::new());
        let (email, password) = (self.email.get(), self.password.get());
        require_filled(&[("email", email.as_str()), ("password", password.as_str())]).ok()?;
        let _in_flight = self.loading.try_begin()?;

        let result = async {
            provider.set_persistence(Persistence::Session).await?;
            provider.sign_in(&email, &password).await
        }
        .await;

        match result {
            Ok(identity) => {
                log::info!("signed in {}", identity.uid);
                Some(Route::Home)
            }
            Err(err) => {
                log::warn!("sign-in failed: {}", err.code);
                self.error.set(err.message);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct CreateAccountForm {
    name: Slot<String>,
    email: Slot<String>,
    password: Slot<String>,
    error: Slot<String>,
    loading: SubmitFlag,
}

impl CreateAccountForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.name.set(name.into());
    }

    pub fn set_email(&self, email: impl Into<String>) {
        self.email.set(email.into());
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.password.set(password.into());
    }

    pub fn error(&self) -> String {
        self.error.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    /// Creates the account, sets its display name, and sends the verification email.
    pub async fn submit<P: IdentityProvider>(&self, provider: &P) -> Option<Route> {
        self.error.set(String::new());
        let (name, email, password) = (self.name.get(), self.email.get(), self.password.get());
        require_filled(&[("name", name.as_str()), ("email", email.as_str()), ("password", password.as_str())]).ok()?;
        let _in_flight = self.loading.try_begin()?;

        let result: Result<_, BackendError> = async {
            let identity = provider.sign_up(&email, &password).await?;
            let identity = provider.update_profile(&identity, ProfileUpdate::display_name(name)).await?;
            provider.send_verification_email(&identity).await?;
            Ok(identity)
        }
        .await;

        match result {
            Ok(identity) => {
                log::info!("created account {} and sent verification email", identity.uid);
                Some(Route::Home)
            }
            Err(err) => {
                log::warn!("account creation failed: {}", err.code);
                self.error.set(err.message);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ResetPasswordForm {
    email: Slot<String>,
    error: Slot<String>,
    loading: SubmitFlag,
}

impl ResetPasswordForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_email(&self, email: impl Into<String>) {
        self.email.set(email.into());
    }

    pub fn email(&self) -> String {
        self.email.get()
    }

    /// Current error; for this form it is the backend code, e.g. `auth/user-not-found`.
    pub fn error(&self) -> String {
        self.error.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    /// Sends the reset email, clears the form, and navigates to login.
    pub async fn submit<P: IdentityProvider>(&self, provider: &P) -> Option<Route> {
        self.error.set(String::new());
        let email = self.email.get();
        require_filled(&[("email", email.as_str())]).ok()?;
        let _in_flight = self.loading.try_begin()?;

        match provider.send_password_reset_email(&email).await {
            Ok(()) => {
                self.email.set(String::new());
                self.error.set(String::new());
                Some(Route::Login)
            }
            Err(err) => {
                log::warn!("password reset failed: {}", err.code);
                self.error.set(err.code);
                None
            }
        }
    }
}

/// "Continue with ..." button shown under the login and create-account forms.
#[derive(Debug)]
pub struct OAuthButton {
    provider: OAuthProvider,
    error: Slot<String>,
    loading: SubmitFlag,
}

impl OAuthButton {
    pub fn new(provider: OAuthProvider) -> Self {
        Self {
            provider,
            error: Slot::default(),
            loading: SubmitFlag::new(),
        }
    }

    pub fn provider(&self) -> OAuthProvider {
        self.provider
    }

    pub fn error(&self) -> String {
        self.error.get()
    }

    pub async fn click<P: IdentityProvider>(&self, provider: &P) -> Option<Route> {
        self.error.set(String::new());
        let _in_flight = self.loading.try_begin()?;
        match provider.sign_in_with_provider(self.provider).await {
            Ok(_) => Some(Route::Home),
            Err(err) => {
                log::warn!("{} sign-in failed: {}", self.provider.id(), err.code);
                self.error.set(err.message);
                None
            }
        }
    }
}

/// Shown on the verification route until the email address is confirmed.
#[derive(Debug, Default)]
pub struct VerificationNotice {
    status: Slot<String>,
    loading: SubmitFlag,
}

impl VerificationNotice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> String {
        self.status.get()
    }

    /// Sends the verification email again to the current identity.
    pub async fn resend<P: IdentityProvider>(&self, provider: &P) -> bool {
        let Some(_in_flight) = self.loading.try_begin() else {
            return false;
        };
        let Some(identity) = provider.current_identity().await else {
            self.status.set("Log in first.".to_string());
            return false;
        };
        match provider.send_verification_email(&identity).await {
            Ok(()) => {
                self.status.set("Verification email sent.".to_string());
                true
            }
            Err(err) => {
                self.status.set(err.message);
                false
            }
        }
    }

    /// Re-runs the gate for home; yields home once the address is verified.
    pub async fn continue_to<P: IdentityProvider>(&self, provider: &P) -> Route {
        let identity = provider.current_identity().await;
        resolve(Route::Home.path(), identity.as_ref())
    }
}

pub const LOG_OUT_PROMPT: &str = "Are you sure you want to log out?";

/// Log-out action of the navigation bar. Asks for confirmation first.
pub async fn log_out<P, F>(provider: &P, confirm: F) -> Option<Route>
where
    P: IdentityProvider,
    F: FnOnce(&str) -> bool,
{
    if !confirm(LOG_OUT_PROMPT) {
        return None;
    }
    match provider.sign_out().await {
        Ok(()) => Some(Route::Login),
        Err(err) => {
            log::error!("sign-out failed: {err}");
            None
        }
    }
}
