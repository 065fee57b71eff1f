//! Core domain + application logic for the suggestion-box moderation bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and SQLite live
//! behind ports (traits) implemented in adapter crates.

pub mod action;
pub mod blocklist;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod forward;
pub mod logging;
pub mod messaging;
pub mod reply;
pub mod router;
pub mod status;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
