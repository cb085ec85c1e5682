//! Interactive UI command handler.

use anyhow::Result;
use jwtgen_core::config::Config;

pub fn run(config: &Config) -> Result<()> {
    jwtgen_tui::run_interactive(config)
}
