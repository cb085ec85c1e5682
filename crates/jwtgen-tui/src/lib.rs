//! Full-screen terminal UI for jwtgen.

pub mod clipboard;
pub mod effects;
pub mod events;
pub mod input;
pub mod render;
pub mod render_utils;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stderr, stdout};

use anyhow::Result;
use jwtgen_core::config::Config;
use jwtgen_core::controller::CredentialController;
use jwtgen_core::provider::IdentityToolkit;
use jwtgen_core::store::FileStore;
pub use runtime::TuiRuntime;

/// Runs the interactive UI until the user quits. Must be called from within
/// a multi-threaded tokio runtime.
///
/// # Errors
/// Returns an error if stdout/stderr are not terminals or the terminal
/// cannot be driven.
pub fn run_interactive(config: &Config) -> Result<()> {
    if !stdout().is_terminal() || !stderr().is_terminal() {
        anyhow::bail!(
            "Interactive mode requires a terminal.\n\
             Use `jwtgen token --email ... --password ...` for non-interactive use."
        );
    }

    let provider = IdentityToolkit::from_config(&config.provider);
    let store = FileStore::open_default();
    tracing::info!(
        base_url = provider.base_url(),
        state = %store.path().display(),
        "starting interactive session"
    );

    let controller = CredentialController::new(provider, store);
    let mut runtime = TuiRuntime::new(controller)?;
    runtime.run()?;

    tracing::info!("interactive session ended");
    Ok(())
}
