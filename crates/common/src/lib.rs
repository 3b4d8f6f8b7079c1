//! Common utilities and types shared across the Pro Video client crates.

#![warn(clippy::pedantic)]

/// Module for SDK-assigned and locally minted identifiers
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
