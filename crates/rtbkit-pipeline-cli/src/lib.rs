//! rtbkit-pipeline CLI library
//!
//! Exposes the CLI entry point and the helpers it is built from, so the
//! binary stays a one-liner and the resolution paths can be tested directly.

mod cli;

pub use cli::{format_settings_text, resolve_key, run};
