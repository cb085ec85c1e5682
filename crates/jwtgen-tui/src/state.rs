//! Application state.
//!
//! ```text
//! AppState
//! ├── controller: CredentialController  (form values, client, busy, notice, auth)
//! ├── editors: FieldEditors             (cursor + text per input)
//! ├── focus: Focus                      (which input/button has focus)
//! ├── reveal_password: bool
//! ├── flash: Option<Flash>              (short-lived feedback line)
//! ├── token_scroll: usize               (first visible token row)
//! └── spinner_frame, viewport, should_quit
//! ```
//!
//! The controller owns the authoritative form values; the editors mirror them
//! and add cursor state. Every edit goes through `CredentialController::set_field`.

use std::time::{Duration, Instant};

use jwtgen_core::controller::{CredentialController, Field, Phase};
use jwtgen_core::provider::AuthProvider;
use jwtgen_core::store::SettingsStore;

use crate::input::FieldEditor;

/// How long copy feedback stays on screen.
pub const FLASH_DURATION: Duration = Duration::from_secs(2);

/// Focusable elements of the form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input(Field),
    Login,
    SignUp,
}

impl Focus {
    pub const ORDER: [Focus; 5] = [
        Focus::Input(Field::ApiKey),
        Focus::Input(Field::Email),
        Focus::Input(Field::Password),
        Focus::Login,
        Focus::SignUp,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let len = Self::ORDER.len();
        Self::ORDER[(self.position() + len - 1) % len]
    }
}

/// One editor per form field.
#[derive(Debug, Clone, Default)]
pub struct FieldEditors {
    pub api_key: FieldEditor,
    pub email: FieldEditor,
    pub password: FieldEditor,
}

impl FieldEditors {
    pub fn get(&self, field: Field) -> &FieldEditor {
        match field {
            Field::ApiKey => &self.api_key,
            Field::Email => &self.email,
            Field::Password => &self.password,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut FieldEditor {
        match field {
            Field::ApiKey => &mut self.api_key,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }
}

/// Feedback line that expires on its own.
#[derive(Debug, Clone)]
pub struct Flash {
    pub text: String,
    pub is_error: bool,
    pub shown_at: Instant,
}

impl Flash {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            shown_at: Instant::now(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::info(text)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= FLASH_DURATION
    }
}

pub struct AppState<P: AuthProvider, S> {
    pub controller: CredentialController<P, S>,
    pub editors: FieldEditors,
    pub focus: Focus,
    pub reveal_password: bool,
    pub flash: Option<Flash>,
    /// First token row shown in the token view; clamped when rendering.
    pub token_scroll: usize,
    pub spinner_frame: usize,
    pub viewport: (u16, u16),
    pub should_quit: bool,
}

impl<P, S> AppState<P, S>
where
    P: AuthProvider,
    S: SettingsStore,
{
    /// Wraps a controller. Editors start from the controller's form values,
    /// and focus starts on the first empty field.
    pub fn new(controller: CredentialController<P, S>) -> Self {
        let form = controller.form();
        let editors = FieldEditors {
            api_key: FieldEditor::with_text(form.api_key.clone().unwrap_or_default()),
            email: FieldEditor::with_text(form.email.clone().unwrap_or_default()),
            password: FieldEditor::with_text(form.password.clone().unwrap_or_default()),
        };

        let focus = Field::ALL
            .into_iter()
            .find(|field| editors.get(*field).text().is_empty())
            .map_or(Focus::Login, Focus::Input);

        Self {
            controller,
            editors,
            focus,
            reveal_password: false,
            flash: None,
            token_scroll: 0,
            spinner_frame: 0,
            viewport: (0, 0),
            should_quit: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// Token shown in the token view, if authenticated.
    pub fn token(&self) -> Option<&str> {
        self.controller.auth().map(|auth| auth.token.as_str())
    }
}
