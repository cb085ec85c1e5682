//! UI event types.
//!
//! Everything the reducer reacts to: terminal input, timer ticks and results
//! of effects the runtime executed.

use crossterm::event::Event;
use jwtgen_core::controller::AuthOutcome;

use crate::clipboard::CopyMethod;

#[derive(Debug)]
pub enum UiEvent {
    /// Periodic tick (animation, timed feedback).
    Tick,

    /// Emitted once per loop iteration with the current terminal size.
    Frame { width: u16, height: u16 },

    /// Raw terminal input.
    Terminal(Event),

    /// A sign-in or sign-up finished (successfully or not).
    AuthFinished { outcome: AuthOutcome },

    /// The token was handed to a clipboard transport.
    ClipboardCopied { method: CopyMethod },

    /// Copying failed on every transport.
    ClipboardFailed { error: String },
}
