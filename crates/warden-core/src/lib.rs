//! Core moderation + command-authorization logic for the warden group bot.
//!
//! This crate is intentionally framework-agnostic. The messaging-protocol
//! client lives behind a port (trait) implemented by an adapter crate; the
//! core only decides which enforcement actions and privileged commands run.

pub mod commands;
pub mod config;
pub mod domain;
pub mod enforce;
pub mod errors;
pub mod events;
pub mod logging;
pub mod msglog;
pub mod mute;
pub mod ports;
pub mod roster;
pub mod utils;

pub use errors::{Error, Result};
