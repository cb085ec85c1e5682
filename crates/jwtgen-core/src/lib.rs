//! Core library for jwtgen.
//!
//! Holds everything that is not presentation: the credential form controller,
//! the identity provider client, the persisted settings store, configuration
//! and logging setup.

pub mod config;
pub mod controller;
pub mod logging;
pub mod provider;
pub mod store;
pub mod token;
