//! Credential form controller.
//!
//! Owns the form, the provider client, the busy flag, the notice area and the
//! authentication result. Every presentation surface (the full-screen UI, the
//! `token` command) drives this one type.
//!
//! ## Submission
//!
//! A sign-in/sign-up is split in two halves so callers can put an await (or a
//! task boundary) in between:
//!
//! ```text
//! begin(op) ──► AuthRequest::run() ──► complete(outcome)
//!   validate      provider calls        busy := Idle
//!   busy := op    (only suspension)     store result / notice
//!   clear notice
//! ```
//!
//! `run()` turns every failure into an `AuthOutcome` value instead of an early
//! return, so `complete()` is reached on both paths and the busy flag always
//! clears. `sign_in()` / `sign_up()` chain the three steps for callers that can
//! simply await.
//!
//! ## Phases
//!
//! ```text
//! Unconfigured ──client built──► Ready ──begin──► Busy ──ok──► Authenticated
//!                                  ▲                │                │
//!                                  └────failure─────┘◄────reset()────┘
//! ```

use crate::provider::{AuthClient, AuthProvider, ProviderError, Session};
use crate::store::{API_KEY_STORAGE_KEY, SettingsStore};

/// Notice title for local validation failures.
pub const REQUIRED_FIELDS_TITLE: &str = "Required fields missing";
/// Notice body for local validation failures.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Web API Key, e-mail and password are required";
/// Notice title for provider failures (sign-in and sign-up alike).
pub const LOGIN_FAILED_TITLE: &str = "Login failed";
/// Notice title after an account was created.
pub const USER_CREATED_TITLE: &str = "User created";

// ============================================================================
// Form
// ============================================================================

/// Form field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ApiKey,
    Email,
    Password,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::ApiKey, Field::Email, Field::Password];

    pub fn label(self) -> &'static str {
        match self {
            Field::ApiKey => "Web API Key",
            Field::Email => "E-mail",
            Field::Password => "Password",
        }
    }
}

/// Raw form contents. `None` means the field was never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl FormInput {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::ApiKey => self.api_key.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Password => self.password.as_deref(),
        }
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::ApiKey => &mut self.api_key,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Operation state
// ============================================================================

/// Which provider call a submission makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOp {
    SignIn,
    SignUp,
}

impl AuthOp {
    fn busy_state(self) -> BusyState {
        match self {
            AuthOp::SignIn => BusyState::LoggingIn,
            AuthOp::SignUp => BusyState::SigningUp,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuthOp::SignIn => "sign_in",
            AuthOp::SignUp => "sign_up",
        }
    }
}

/// In-flight operation, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyState {
    #[default]
    Idle,
    LoggingIn,
    SigningUp,
}

impl BusyState {
    pub fn is_idle(self) -> bool {
        matches!(self, BusyState::Idle)
    }
}

/// Titled notice shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultNotice {
    pub title: String,
    pub message: String,
}

impl ResultNotice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Session plus the token minted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub session: Session,
    pub token: String,
}

/// UI-level state, derived from the controller fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unconfigured,
    Ready,
    Busy,
    Authenticated,
}

// ============================================================================
// Client memoization
// ============================================================================

/// Memoizes `api_key -> client` by the last key seen.
///
/// At most one client is alive; a different key replaces it with a freshly
/// constructed one, the same key returns the existing one.
#[derive(Debug)]
pub struct ClientCache<C> {
    current: Option<C>,
}

impl<C> Default for ClientCache<C> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<C: AuthClient> ClientCache<C> {
    /// Returns the client for `api_key`, constructing it if the key changed.
    /// Empty keys are ignored and leave the current client in place.
    ///
    /// # Errors
    /// Returns the provider error when construction fails; the previous client
    /// is kept in that case.
    pub fn ensure<P>(&mut self, provider: &P, api_key: &str) -> Result<Option<&C>, ProviderError>
    where
        P: AuthProvider<Client = C>,
    {
        if api_key.is_empty() {
            return Ok(self.current.as_ref());
        }

        let stale = self
            .current
            .as_ref()
            .is_none_or(|client| client.api_key() != api_key);
        if stale {
            self.current = Some(provider.connect(api_key)?);
        }
        Ok(self.current.as_ref())
    }

    pub fn current(&self) -> Option<&C> {
        self.current.as_ref()
    }
}

// ============================================================================
// Submission
// ============================================================================

/// A validated submission, detached from the controller so it can be awaited
/// elsewhere (e.g. on a spawned task).
#[derive(Clone)]
pub struct AuthRequest<C> {
    pub op: AuthOp,
    client: C,
    email: String,
    password: String,
}

impl<C> std::fmt::Debug for AuthRequest<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("op", &self.op)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl<C: AuthClient> AuthRequest<C> {
    /// Performs the provider calls. Never panics, never returns early: every
    /// path ends in an `AuthOutcome`.
    pub async fn run(self) -> AuthOutcome {
        let Self {
            op,
            client,
            email,
            password,
        } = self;

        let session = match op {
            AuthOp::SignIn => client.sign_in(&email, &password).await,
            AuthOp::SignUp => client.create_account(&email, &password).await,
        };

        let result = match session {
            Ok(session) => match client.id_token(&session).await {
                Ok(token) => Ok(AuthResult { session, token }),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        AuthOutcome { op, email, result }
    }
}

/// What came back from the provider for one submission.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub op: AuthOp,
    pub email: String,
    pub result: Result<AuthResult, ProviderError>,
}

// ============================================================================
// Controller
// ============================================================================

/// The credential form controller.
pub struct CredentialController<P: AuthProvider, S> {
    provider: P,
    store: S,
    form: FormInput,
    clients: ClientCache<P::Client>,
    busy: BusyState,
    notice: Option<ResultNotice>,
    auth: Option<AuthResult>,
}

impl<P, S> CredentialController<P, S>
where
    P: AuthProvider,
    S: SettingsStore,
{
    /// Creates a controller, loading the cached API key from `store` and
    /// binding a client to it when present.
    pub fn new(provider: P, store: S) -> Self {
        let cached = match store.load(API_KEY_STORAGE_KEY) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "could not read cached API key");
                None
            }
        };

        let mut controller = Self {
            provider,
            store,
            form: FormInput::default(),
            clients: ClientCache::default(),
            busy: BusyState::Idle,
            notice: None,
            auth: None,
        };

        if let Some(key) = cached.filter(|key| !key.is_empty()) {
            tracing::debug!("loaded cached API key");
            controller.form.api_key = Some(key);
            controller.ensure_client();
        }

        controller
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn busy(&self) -> BusyState {
        self.busy
    }

    pub fn notice(&self) -> Option<&ResultNotice> {
        self.notice.as_ref()
    }

    pub fn auth(&self) -> Option<&AuthResult> {
        self.auth.as_ref()
    }

    pub fn client(&self) -> Option<&P::Client> {
        self.clients.current()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        if !self.busy.is_idle() {
            Phase::Busy
        } else if self.auth.is_some() {
            Phase::Authenticated
        } else if self.clients.current().is_some() {
            Phase::Ready
        } else {
            Phase::Unconfigured
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Updates one field. Edits to the API key are written through to the
    /// store (even when empty) and rebind the client.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();

        if field == Field::ApiKey {
            if let Err(err) = self.store.persist(API_KEY_STORAGE_KEY, &value) {
                tracing::warn!(error = %format!("{err:#}"), "could not persist API key");
            }
            *self.form.slot(field) = Some(value);
            self.ensure_client();
        } else {
            *self.form.slot(field) = Some(value);
        }
    }

    /// Binds a client to the current API key if it changed. Construction
    /// failures are logged; the controller stays without a (new) client.
    pub fn ensure_client(&mut self) {
        let key = self.form.api_key.as_deref().unwrap_or_default();
        if let Err(err) = self.clients.ensure(&self.provider, key) {
            tracing::warn!(error = %err, "could not initialize provider client");
        }
    }

    /// Validates the form and marks the operation as in flight.
    ///
    /// Returns `None` (and makes no provider call) when another operation is
    /// already running or required fields are missing; the latter sets the
    /// "Required fields missing" notice.
    pub fn begin(&mut self, op: AuthOp) -> Option<AuthRequest<P::Client>> {
        if !self.busy.is_idle() {
            tracing::debug!(op = op.label(), busy = ?self.busy, "ignoring submission while busy");
            return None;
        }

        self.ensure_client();

        let (Some(client), Some(email), Some(password)) = (
            self.clients.current(),
            non_empty(self.form.email.as_deref()),
            non_empty(self.form.password.as_deref()),
        ) else {
            self.notice = Some(ResultNotice::new(
                REQUIRED_FIELDS_TITLE,
                REQUIRED_FIELDS_MESSAGE,
            ));
            return None;
        };

        let request = AuthRequest {
            op,
            client: client.clone(),
            email: email.to_string(),
            password: password.to_string(),
        };

        self.notice = None;
        self.busy = op.busy_state();
        tracing::info!(op = op.label(), "authentication started");
        Some(request)
    }

    /// Applies a finished submission. The busy flag clears first, whatever
    /// the outcome.
    pub fn complete(&mut self, outcome: AuthOutcome) {
        self.busy = BusyState::Idle;

        let AuthOutcome { op, email, result } = outcome;
        match result {
            Ok(auth) => {
                tracing::info!(op = op.label(), user_id = auth.session.user_id(), "authentication succeeded");
                if op == AuthOp::SignUp {
                    self.notice = Some(ResultNotice::new(
                        USER_CREATED_TITLE,
                        format!(
                            "User ID: '{}' and e-mail '{}' created.",
                            auth.session.user_id(),
                            email
                        ),
                    ));
                }
                self.auth = Some(auth);
            }
            Err(err) => {
                tracing::warn!(op = op.label(), kind = %err.kind, error = %err, "authentication failed");
                self.notice = Some(ResultNotice::new(LOGIN_FAILED_TITLE, err.message));
            }
        }
    }

    /// Signs in with the current form values.
    pub async fn sign_in(&mut self) {
        self.submit(AuthOp::SignIn).await;
    }

    /// Creates an account with the current form values.
    pub async fn sign_up(&mut self) {
        self.submit(AuthOp::SignUp).await;
    }

    /// `begin` → `run` → `complete`.
    pub async fn submit(&mut self, op: AuthOp) {
        let Some(request) = self.begin(op) else {
            return;
        };
        let outcome = request.run().await;
        self.complete(outcome);
    }

    /// Drops the authentication result and returns to the form. Form values
    /// and the cached key are kept.
    pub fn reset(&mut self) {
        self.auth = None;
    }

    /// Clears the notice area.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
