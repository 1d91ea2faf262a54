//! Core domain + application logic for the RingCentral chat-bot gateway.
//!
//! This crate is framework-agnostic. The chat transport, the token storage backend and
//! the platform REST client live behind ports (traits) implemented in adapter crates.

pub mod cache;
pub mod commands;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod oauth;
pub mod paging;
pub mod ports;
pub mod session;
pub mod token_store;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
