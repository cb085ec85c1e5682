//! CLI command handlers.

pub mod config;
pub mod token;
pub mod tui;
