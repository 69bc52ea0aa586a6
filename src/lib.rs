//! GNOME Shell search provider for Kolibri content.
//!
//! Concurrent searches from the default endpoint and the per-channel
//! endpoints are coalesced into one daemon query, then filtered per caller.

pub mod config;
pub mod core;
pub mod logging;
pub mod orchestration;
pub mod service;
