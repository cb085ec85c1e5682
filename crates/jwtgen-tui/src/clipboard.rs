//! Copying the token out of the terminal.
//!
//! The system clipboard (`arboard`) is tried first because it is the only
//! transport that can confirm the copy. OSC 52 is the fallback for sessions
//! without a display server (SSH, bare consoles); the terminal may silently
//! ignore it, so callers report it as "sent" rather than "copied".

use std::fmt;
use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Which transport accepted the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    /// Written to the system clipboard.
    System,
    /// Handed to the terminal as an OSC 52 escape sequence.
    Terminal,
}

/// Clipboard handle owned by the runtime.
///
/// The `arboard` handle is kept alive between copies: on X11 and Wayland the
/// contents are served by the process that set them and vanish once the
/// handle is dropped.
#[derive(Default)]
pub struct Clipboard {
    system: Option<arboard::Clipboard>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies text, trying the system clipboard before OSC 52.
    ///
    /// # Errors
    /// Returns an error carrying both failures when neither transport
    /// accepted the text.
    pub fn copy(&mut self, text: &str) -> Result<CopyMethod, ClipboardError> {
        let system = &mut self.system;
        copy_with(
            text,
            |text| copy_system(system, text),
            |text| copy_osc52(&mut std::io::stdout(), text),
        )
    }
}

fn copy_with(
    text: &str,
    system: impl FnOnce(&str) -> Result<(), String>,
    terminal: impl FnOnce(&str) -> Result<(), String>,
) -> Result<CopyMethod, ClipboardError> {
    let system_err = match system(text) {
        Ok(()) => return Ok(CopyMethod::System),
        Err(err) => err,
    };
    tracing::debug!(error = %system_err, "system clipboard unavailable, using OSC 52");

    match terminal(text) {
        Ok(()) => Ok(CopyMethod::Terminal),
        Err(terminal_err) => Err(ClipboardError {
            system: system_err,
            terminal: terminal_err,
        }),
    }
}

fn copy_system(handle: &mut Option<arboard::Clipboard>, text: &str) -> Result<(), String> {
    if handle.is_none() {
        *handle = Some(arboard::Clipboard::new().map_err(|e| e.to_string())?);
    }
    let Some(clipboard) = handle.as_mut() else {
        return Err("system clipboard not initialized".to_string());
    };
    clipboard.set_text(text).map_err(|e| {
        // A broken handle is rebuilt on the next copy.
        *handle = None;
        e.to_string()
    })
}

fn copy_osc52(out: &mut impl Write, text: &str) -> Result<(), String> {
    out.write_all(osc52_sequence(text).as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| e.to_string())
}

/// `ESC ] 52 ; c ; <base64> ESC \`, targeting the system clipboard.
fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x1b\\", STANDARD.encode(text))
}

/// Both transports refused the text.
#[derive(Debug)]
pub struct ClipboardError {
    pub system: String,
    pub terminal: String,
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system clipboard failed: {}; OSC 52 failed: {}",
            self.system, self.terminal
        )
    }
}

impl std::error::Error for ClipboardError {}
