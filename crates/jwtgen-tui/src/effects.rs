//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! The reducer never spawns tasks or touches the terminal itself.

use jwtgen_core::controller::AuthRequest;

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug)]
pub enum UiEffect<C> {
    /// Quit the application.
    Quit,

    /// Run a validated submission in the background and report back with
    /// `UiEvent::AuthFinished`.
    Authenticate { request: AuthRequest<C> },

    /// Copy text to the clipboard.
    CopyToClipboard { text: String },
}
