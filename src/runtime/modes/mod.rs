//! Execution modes
//!
//! - server: HTTP proxy (default)
//! - cli: one-shot maintenance commands

pub mod cli;
pub mod server;

pub use server::run_server;
