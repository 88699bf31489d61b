//! Lost & Found coordination library.
//!
//! Houses the claim/escrow lifecycle engine plus the configuration and
//! telemetry plumbing shared with the API service crate.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
