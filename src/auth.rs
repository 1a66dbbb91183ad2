//! Account flows: registration, email verification, login, logout, password
//! reset and profile edits.
//!
//! Forms are validated before any request is made. Backend failures are
//! turned into the fixed user-facing messages from
//! [`SeismodashError::user_message`]. The session is written to an
//! injectable [`SessionStore`] which may mirror it to the local store.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::errors::SeismodashError;
use crate::models::{LoginRequest, ProfileUpdate, RegisterRequest, UserSession, VerifyRequest};
use crate::storage::{LocalStore, SESSION_KEY};

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Number of digits in an email verification code.
pub const CODE_LEN: usize = 6;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex")
});

/// Check an email address against the basic `local@domain.tld` shape.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

/// Form field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Password,
    ConfirmPassword,
    NewPassword,
    Terms,
    Code,
}

/// At most one message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    fn add(&mut self, field: Field, message: &'static str) {
        self.0.entry(field).or_insert(message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(f, m)| (*f, *m))
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Registration form contents.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

impl RegistrationForm {
    /// Client-side checks run before submission.
    ///
    /// # Errors
    ///
    /// Returns one message per offending field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.first_name.trim().is_empty() {
            errors.add(Field::FirstName, "First name is required.");
        }
        if self.last_name.trim().is_empty() {
            errors.add(Field::LastName, "Last name is required.");
        }
        if !is_valid_email(&self.email) {
            errors.add(Field::Email, "Enter a valid email address.");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(Field::Password, "Password must be at least 8 characters.");
        }
        if self.password != self.confirm_password {
            errors.add(Field::ConfirmPassword, "Passwords do not match.");
        }
        if !self.accept_terms {
            errors.add(Field::Terms, "You must accept the terms of use.");
        }
        errors.into_result()
    }
}

/// Login form contents.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Client-side checks run before submission.
    ///
    /// # Errors
    ///
    /// Returns one message per offending field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if !is_valid_email(&self.email) {
            errors.add(Field::Email, "Enter a valid email address.");
        }
        if self.password.is_empty() {
            errors.add(Field::Password, "Password is required.");
        }
        errors.into_result()
    }
}

/// Check a verification code: exactly six ASCII digits.
///
/// # Errors
///
/// Returns the message for the code field.
pub fn validate_code(code: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    let code = code.trim();
    if code.len() != CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        errors.add(Field::Code, "Enter the 6-digit code from your email.");
    }
    errors.into_result()
}

/// Password change form contents.
#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChangeForm {
    /// Client-side checks run before submission.
    ///
    /// # Errors
    ///
    /// Returns one message per offending field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.current_password.is_empty() {
            errors.add(Field::Password, "Current password is required.");
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(Field::NewPassword, "Password must be at least 8 characters.");
        }
        if self.new_password != self.confirm_password {
            errors.add(Field::ConfirmPassword, "Passwords do not match.");
        }
        errors.into_result()
    }
}

/// Backend operations the account flows depend on.
pub trait AuthBackend {
    fn register(&self, request: &RegisterRequest) -> Result<(), SeismodashError>;
    fn login(&self, request: &LoginRequest) -> Result<UserSession, SeismodashError>;
    fn verify(&self, request: &VerifyRequest) -> Result<Option<UserSession>, SeismodashError>;
    fn resend_verification(&self, email: &str) -> Result<(), SeismodashError>;
    fn forgot_password(&self, email: &str) -> Result<(), SeismodashError>;
    fn logout(&self) -> Result<(), SeismodashError>;
    fn update_profile(&self, update: &ProfileUpdate) -> Result<UserSession, SeismodashError>;
    fn change_password(&self, current: &str, new: &str) -> Result<(), SeismodashError>;
}

impl AuthBackend for ApiClient {
    fn register(&self, request: &RegisterRequest) -> Result<(), SeismodashError> {
        ApiClient::register(self, request)
    }

    fn login(&self, request: &LoginRequest) -> Result<UserSession, SeismodashError> {
        ApiClient::login(self, request)
    }

    fn verify(&self, request: &VerifyRequest) -> Result<Option<UserSession>, SeismodashError> {
        ApiClient::verify(self, request)
    }

    fn resend_verification(&self, email: &str) -> Result<(), SeismodashError> {
        ApiClient::resend_verification(self, email)
    }

    fn forgot_password(&self, email: &str) -> Result<(), SeismodashError> {
        ApiClient::forgot_password(self, email)
    }

    fn logout(&self) -> Result<(), SeismodashError> {
        ApiClient::logout(self)
    }

    fn update_profile(&self, update: &ProfileUpdate) -> Result<UserSession, SeismodashError> {
        ApiClient::update_profile(self, update)
    }

    fn change_password(&self, current: &str, new: &str) -> Result<(), SeismodashError> {
        ApiClient::change_password(self, current, new)
    }
}

/// Holds the logged-in user, optionally mirrored to the local store.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    user: Option<UserSession>,
    mirror: Option<LocalStore>,
}

impl SessionStore {
    /// Restore the mirrored user, if any.
    #[must_use]
    pub fn load(store: LocalStore) -> Self {
        let user = store.get::<UserSession>(SESSION_KEY).unwrap_or_else(|e| {
            warn!("ignoring stored session: {}", e);
            None
        });
        Self {
            user,
            mirror: Some(store),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserSession> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user.is_none()
    }

    pub fn set(&mut self, user: UserSession) {
        if let Some(store) = &self.mirror {
            if let Err(e) = store.set(SESSION_KEY, &user) {
                warn!("failed to mirror session: {}", e);
            }
        }
        self.user = Some(user);
    }

    pub fn clear(&mut self) {
        if let Some(store) = &self.mirror {
            if let Err(e) = store.remove(SESSION_KEY) {
                warn!("failed to clear mirrored session: {}", e);
            }
        }
        self.user = None;
    }
}

/// Where the account flow currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Registering,
    AwaitingVerification { email: String },
    Authenticated,
    ForgotPassword,
    ResetSent { email: String },
}

/// How a successful verification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verified {
    /// The session now holds the verified user
    SignedIn,
    /// No session exists yet; the user has to log in
    LoginRequired,
}

/// Why a flow step did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected before any request; one message per field
    #[error("{}", joined(.0))]
    Invalid(FieldErrors),
    /// Backend or transport failure, as user-facing text
    #[error("{0}")]
    Failed(String),
    /// The step is not available in the current state
    #[error("That action is not available right now.")]
    WrongState,
}

fn joined(errors: &FieldErrors) -> String {
    errors.iter().map(|(_, m)| m).collect::<Vec<_>>().join(" ")
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

impl From<SeismodashError> for AuthError {
    fn from(e: SeismodashError) -> Self {
        Self::Failed(e.user_message())
    }
}

/// The account state machine.
pub struct AuthFlow<B> {
    backend: B,
    state: AuthState,
    session: SessionStore,
}

impl<B: AuthBackend> AuthFlow<B> {
    /// Start in `Authenticated` when the session store already holds a user.
    pub fn new(backend: B, session: SessionStore) -> Self {
        let state = if session.is_empty() {
            AuthState::Anonymous
        } else {
            AuthState::Authenticated
        };
        Self {
            backend,
            state,
            session,
        }
    }

    #[must_use]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register, then log in with the same credentials so the session exists
    /// before the email is confirmed. A failed auto-login does not block the
    /// move to verification.
    ///
    /// # Errors
    ///
    /// Fails on invalid input or when the register call fails.
    pub fn register(&mut self, form: &RegistrationForm) -> Result<(), AuthError> {
        if self.state != AuthState::Anonymous {
            return Err(AuthError::WrongState);
        }
        form.validate()?;

        self.state = AuthState::Registering;
        let email = form.email.trim().to_string();
        let request = RegisterRequest {
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: email.clone(),
            password: form.password.clone(),
        };
        if let Err(e) = self.backend.register(&request) {
            self.state = AuthState::Anonymous;
            return Err(e.into());
        }
        info!(%email, "registered");

        let login = LoginRequest {
            email: email.clone(),
            password: form.password.clone(),
        };
        match self.backend.login(&login) {
            Ok(user) => self.session.set(user),
            Err(e) => warn!("auto-login after registration failed: {}", e),
        }

        self.state = AuthState::AwaitingVerification { email };
        Ok(())
    }

    /// Submit the emailed code.
    ///
    /// Without a session to carry over (the auto-login after registration
    /// failed and the backend returned no user) the flow goes back to
    /// `Anonymous` and reports [`Verified::LoginRequired`].
    ///
    /// # Errors
    ///
    /// Fails on a malformed code, outside verification, or when the verify
    /// call fails.
    pub fn verify(&mut self, code: &str) -> Result<Verified, AuthError> {
        let AuthState::AwaitingVerification { email } = &self.state else {
            return Err(AuthError::WrongState);
        };
        validate_code(code)?;

        let request = VerifyRequest {
            email: email.clone(),
            code: code.trim().to_string(),
        };
        let refreshed = self.backend.verify(&request)?;
        match refreshed {
            Some(user) => self.session.set(user),
            None => match self.session.user().cloned() {
                Some(mut user) => {
                    user.is_verified = true;
                    self.session.set(user);
                }
                None => {
                    info!(email = %request.email, "email verified, login required");
                    self.state = AuthState::Anonymous;
                    return Ok(Verified::LoginRequired);
                }
            },
        }

        info!(email = %request.email, "email verified");
        self.state = AuthState::Authenticated;
        Ok(Verified::SignedIn)
    }

    /// Ask for another code; the state does not change.
    ///
    /// # Errors
    ///
    /// Fails outside verification or when the call fails.
    pub fn resend_code(&mut self) -> Result<(), AuthError> {
        let AuthState::AwaitingVerification { email } = &self.state else {
            return Err(AuthError::WrongState);
        };
        self.backend.resend_verification(email)?;
        Ok(())
    }

    /// Log in directly. Only available while signed out, including from the
    /// password reset branch.
    ///
    /// # Errors
    ///
    /// Fails outside those states, on invalid input, or when the login call
    /// fails.
    pub fn login(&mut self, form: &LoginForm) -> Result<&UserSession, AuthError> {
        if !matches!(
            self.state,
            AuthState::Anonymous | AuthState::ForgotPassword | AuthState::ResetSent { .. }
        ) {
            return Err(AuthError::WrongState);
        }
        form.validate()?;

        let user = self.backend.login(&LoginRequest {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        })?;
        info!(email = %user.email, "logged in");
        self.session.set(user);
        self.state = AuthState::Authenticated;
        self.session.user().ok_or(AuthError::WrongState)
    }

    /// Open the password reset branch.
    ///
    /// # Errors
    ///
    /// Fails when already logged in.
    pub fn begin_password_reset(&mut self) -> Result<(), AuthError> {
        match self.state {
            AuthState::Anonymous | AuthState::ForgotPassword | AuthState::ResetSent { .. } => {
                self.state = AuthState::ForgotPassword;
                Ok(())
            }
            _ => Err(AuthError::WrongState),
        }
    }

    /// Send the reset email.
    ///
    /// # Errors
    ///
    /// Fails outside the reset branch, on an invalid email, or when the call
    /// fails.
    pub fn request_password_reset(&mut self, email: &str) -> Result<(), AuthError> {
        if self.state != AuthState::ForgotPassword {
            return Err(AuthError::WrongState);
        }
        if !is_valid_email(email) {
            let mut errors = FieldErrors::default();
            errors.add(Field::Email, "Enter a valid email address.");
            return Err(errors.into());
        }
        let email = email.trim().to_string();
        self.backend.forgot_password(&email)?;
        self.state = AuthState::ResetSent { email };
        Ok(())
    }

    /// Re-enter verification for `email` when the flow starts fresh, as a
    /// later CLI invocation does. Only an anonymous flow or one holding an
    /// unverified user may resume.
    ///
    /// # Errors
    ///
    /// Fails on an invalid email or when the current user is verified.
    pub fn resume_verification(&mut self, email: &str) -> Result<(), AuthError> {
        let allowed = match self.state {
            AuthState::Anonymous | AuthState::AwaitingVerification { .. } => true,
            AuthState::Authenticated => self.session.user().is_some_and(|u| !u.is_verified),
            _ => false,
        };
        if !allowed {
            return Err(AuthError::WrongState);
        }
        if !is_valid_email(email) {
            let mut errors = FieldErrors::default();
            errors.add(Field::Email, "Enter a valid email address.");
            return Err(errors.into());
        }
        self.state = AuthState::AwaitingVerification {
            email: email.trim().to_string(),
        };
        Ok(())
    }

    /// Leave the reset branch or abandon verification.
    pub fn cancel(&mut self) {
        if matches!(
            self.state,
            AuthState::ForgotPassword | AuthState::ResetSent { .. }
        ) {
            self.state = AuthState::Anonymous;
        }
    }

    /// Clear the local session. The backend call's failure is logged and
    /// otherwise ignored; it is never retried.
    pub fn logout(&mut self) {
        if let Err(e) = self.backend.logout() {
            warn!("logout request failed, clearing local session anyway: {}", e);
        }
        self.session.clear();
        self.state = AuthState::Anonymous;
        info!("logged out");
    }

    /// Edit the current user's profile and refresh the stored session.
    ///
    /// # Errors
    ///
    /// Fails when logged out, on an invalid email, or when the call fails.
    pub fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&UserSession, AuthError> {
        if self.state != AuthState::Authenticated {
            return Err(AuthError::WrongState);
        }
        let mut errors = FieldErrors::default();
        if update.first_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.add(Field::FirstName, "First name is required.");
        }
        if update.last_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.add(Field::LastName, "Last name is required.");
        }
        if update.email.as_deref().is_some_and(|e| !is_valid_email(e)) {
            errors.add(Field::Email, "Enter a valid email address.");
        }
        errors.into_result()?;

        let user = self.backend.update_profile(update)?;
        self.session.set(user);
        self.session.user().ok_or(AuthError::WrongState)
    }

    /// Change the current user's password.
    ///
    /// # Errors
    ///
    /// Fails when logged out, on invalid input, or when the call fails.
    pub fn change_password(&mut self, form: &PasswordChangeForm) -> Result<(), AuthError> {
        if self.state != AuthState::Authenticated {
            return Err(AuthError::WrongState);
        }
        form.validate()?;
        self.backend
            .change_password(&form.current_password, &form.new_password)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        calls: RefCell<Vec<&'static str>>,
        fail_register: Option<u16>,
        fail_login: Option<u16>,
        fail_logout: bool,
    }

    fn user(email: &str) -> UserSession {
        UserSession {
            id: "1".into(),
            email: email.into(),
            first_name: "Deniz".into(),
            last_name: "Kaya".into(),
            authorities: vec!["ROLE_USER".into()],
            is_verified: false,
        }
    }

    fn status(code: u16) -> SeismodashError {
        SeismodashError::Api {
            status: code,
            message: String::new(),
        }
    }

    impl AuthBackend for FakeBackend {
        fn register(&self, _: &RegisterRequest) -> Result<(), SeismodashError> {
            self.calls.borrow_mut().push("register");
            self.fail_register.map_or(Ok(()), |c| Err(status(c)))
        }

        fn login(&self, request: &LoginRequest) -> Result<UserSession, SeismodashError> {
            self.calls.borrow_mut().push("login");
            match self.fail_login {
                Some(c) => Err(status(c)),
                None => Ok(user(&request.email)),
            }
        }

        fn verify(&self, _: &VerifyRequest) -> Result<Option<UserSession>, SeismodashError> {
            self.calls.borrow_mut().push("verify");
            Ok(None)
        }

        fn resend_verification(&self, _: &str) -> Result<(), SeismodashError> {
            self.calls.borrow_mut().push("resend");
            Ok(())
        }

        fn forgot_password(&self, _: &str) -> Result<(), SeismodashError> {
            self.calls.borrow_mut().push("forgot");
            Ok(())
        }

        fn logout(&self) -> Result<(), SeismodashError> {
            self.calls.borrow_mut().push("logout");
            if self.fail_logout {
                Err(SeismodashError::InvalidResponse("connection reset".into()))
            } else {
                Ok(())
            }
        }

        fn update_profile(&self, update: &ProfileUpdate) -> Result<UserSession, SeismodashError> {
            self.calls.borrow_mut().push("update_profile");
            let mut u = user("deniz@example.com");
            if let Some(name) = &update.first_name {
                u.first_name.clone_from(name);
            }
            Ok(u)
        }

        fn change_password(&self, _: &str, _: &str) -> Result<(), SeismodashError> {
            self.calls.borrow_mut().push("change_password");
            Ok(())
        }
    }

    fn registration() -> RegistrationForm {
        RegistrationForm {
            first_name: "Deniz".into(),
            last_name: "Kaya".into(),
            email: "deniz@example.com".into(),
            password: "correct-horse".into(),
            confirm_password: "correct-horse".into(),
            accept_terms: true,
        }
    }

    fn calls(flow: &AuthFlow<FakeBackend>) -> Vec<&'static str> {
        flow.backend().calls.borrow().clone()
    }

    fn flow(backend: FakeBackend) -> AuthFlow<FakeBackend> {
        AuthFlow::new(backend, SessionStore::default())
    }

    #[test]
    fn test_mismatched_confirmation_never_calls_backend() {
        let mut flow = flow(FakeBackend::default());
        let form = RegistrationForm {
            confirm_password: "something-else".into(),
            ..registration()
        };

        let Err(AuthError::Invalid(errors)) = flow.register(&form) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(Field::ConfirmPassword), Some("Passwords do not match."));
        assert!(calls(&flow).is_empty());
        assert_eq!(flow.state(), &AuthState::Anonymous);
    }

    #[test]
    fn test_register_logs_in_then_awaits_verification() {
        let mut flow = flow(FakeBackend::default());
        flow.register(&registration()).expect("register");

        assert_eq!(calls(&flow), vec!["register", "login"]);
        assert_eq!(
            flow.state(),
            &AuthState::AwaitingVerification {
                email: "deniz@example.com".into()
            }
        );
        assert!(!flow.session().is_empty());
    }

    #[test]
    fn test_failed_auto_login_still_awaits_verification() {
        let mut flow = flow(FakeBackend {
            fail_login: Some(403),
            ..FakeBackend::default()
        });
        flow.register(&registration()).expect("register");
        assert!(matches!(flow.state(), AuthState::AwaitingVerification { .. }));
        assert!(flow.session().is_empty());
    }

    #[test]
    fn test_register_conflict_maps_message() {
        let mut flow = flow(FakeBackend {
            fail_register: Some(409),
            ..FakeBackend::default()
        });
        let err = flow.register(&registration()).expect_err("conflict");
        assert_eq!(
            err,
            AuthError::Failed("An account with this email already exists.".into())
        );
        assert_eq!(flow.state(), &AuthState::Anonymous);
        assert_eq!(calls(&flow), vec!["register"]);
    }

    #[test]
    fn test_verify_code() {
        let mut flow = flow(FakeBackend::default());
        flow.register(&registration()).expect("register");

        assert!(matches!(flow.verify("12ab56"), Err(AuthError::Invalid(_))));
        flow.resend_code().expect("resend");
        assert!(matches!(flow.state(), AuthState::AwaitingVerification { .. }));

        assert_eq!(flow.verify("123456"), Ok(Verified::SignedIn));
        assert_eq!(flow.state(), &AuthState::Authenticated);
        assert!(flow.session().user().is_some_and(|u| u.is_verified));
        assert_eq!(calls(&flow), vec!["register", "login", "resend", "verify"]);
    }

    #[test]
    fn test_verify_without_session_asks_for_login() {
        let mut flow = flow(FakeBackend {
            fail_login: Some(403),
            ..FakeBackend::default()
        });
        flow.register(&registration()).expect("register");

        assert_eq!(flow.verify("123456"), Ok(Verified::LoginRequired));
        assert_eq!(flow.state(), &AuthState::Anonymous);
        assert!(flow.session().is_empty());
        assert_eq!(
            flow.change_password(&PasswordChangeForm {
                current_password: "correct-horse".into(),
                new_password: "battery-staple".into(),
                confirm_password: "battery-staple".into(),
            }),
            Err(AuthError::WrongState)
        );
    }

    #[test]
    fn test_login_only_while_signed_out() {
        let form = LoginForm {
            email: "deniz@example.com".into(),
            password: "correct-horse".into(),
        };

        let mut flow = flow(FakeBackend::default());
        flow.register(&registration()).expect("register");
        assert!(matches!(flow.login(&form), Err(AuthError::WrongState)));

        flow.logout();
        flow.begin_password_reset().expect("begin");
        flow.request_password_reset("deniz@example.com").expect("reset");
        flow.login(&form).expect("login after reset");
        assert_eq!(flow.state(), &AuthState::Authenticated);
        assert!(matches!(flow.login(&form), Err(AuthError::WrongState)));
    }

    #[test]
    fn test_resume_verification_in_new_flow() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = SessionStore::load(LocalStore::new(dir.path()));
        session.set(user("deniz@example.com"));

        let mut flow = AuthFlow::new(FakeBackend::default(), session);
        assert_eq!(flow.state(), &AuthState::Authenticated);
        assert!(matches!(flow.resume_verification("nope"), Err(AuthError::Invalid(_))));

        flow.resume_verification("deniz@example.com").expect("resume");
        flow.verify("654321").expect("verify");
        assert_eq!(flow.state(), &AuthState::Authenticated);
        assert_eq!(
            flow.resume_verification("deniz@example.com"),
            Err(AuthError::WrongState)
        );
    }

    #[test]
    fn test_login_validation() {
        let mut flow = flow(FakeBackend::default());
        let form = LoginForm {
            email: "not-an-email".into(),
            password: String::new(),
        };
        let Err(AuthError::Invalid(errors)) = flow.login(&form) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 2);
        assert!(calls(&flow).is_empty());

        let form = LoginForm {
            email: "deniz@example.com".into(),
            password: "x".into(),
        };
        flow.login(&form).expect("login");
        assert_eq!(flow.state(), &AuthState::Authenticated);
    }

    #[test]
    fn test_failed_logout_still_clears_session() {
        let mut flow = flow(FakeBackend {
            fail_logout: true,
            ..FakeBackend::default()
        });
        flow.login(&LoginForm {
            email: "deniz@example.com".into(),
            password: "pw".into(),
        })
        .expect("login");

        flow.logout();
        assert!(flow.session().is_empty());
        assert_eq!(flow.state(), &AuthState::Anonymous);
        assert_eq!(calls(&flow), vec!["login", "logout"]);
    }

    #[test]
    fn test_password_reset_branch() {
        let mut flow = flow(FakeBackend::default());
        assert_eq!(
            flow.request_password_reset("deniz@example.com"),
            Err(AuthError::WrongState)
        );
        flow.begin_password_reset().expect("begin");
        assert!(flow.request_password_reset("nope").is_err());
        flow.request_password_reset("deniz@example.com").expect("reset");
        assert_eq!(
            flow.state(),
            &AuthState::ResetSent {
                email: "deniz@example.com".into()
            }
        );
        flow.cancel();
        assert_eq!(flow.state(), &AuthState::Anonymous);
    }

    #[test]
    fn test_profile_requires_login() {
        let mut flow = flow(FakeBackend::default());
        let update = ProfileUpdate {
            first_name: Some("Ece".into()),
            ..ProfileUpdate::default()
        };
        assert_eq!(
            flow.update_profile(&update).map(|u| u.first_name.clone()),
            Err(AuthError::WrongState)
        );

        flow.login(&LoginForm {
            email: "deniz@example.com".into(),
            password: "pw".into(),
        })
        .expect("login");
        let updated = flow.update_profile(&update).expect("update");
        assert_eq!(updated.first_name, "Ece");
    }

    #[test]
    fn test_password_change_validation() {
        let form = PasswordChangeForm {
            current_password: "old".into(),
            new_password: "short".into(),
            confirm_password: "short".into(),
        };
        let errors = form.validate().expect_err("too short");
        assert_eq!(errors.len(), 1);
        assert!(errors.get(Field::NewPassword).is_some());
    }

    #[test]
    fn test_session_mirror() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::load(LocalStore::new(dir.path()));
        assert!(store.is_empty());

        store.set(user("a@b.co"));
        let restored = SessionStore::load(LocalStore::new(dir.path()));
        assert_eq!(restored.user().map(|u| u.email.as_str()), Some("a@b.co"));

        store.clear();
        assert!(SessionStore::load(LocalStore::new(dir.path())).is_empty());
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email(" user@example.com.tr "));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example@x.com"));
        assert!(!is_valid_email(""));
    }
}
