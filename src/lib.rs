//! keyward - a key-hiding proxy backend for AI and media APIs
//!
//! This library provides the core functionality for the keyward proxy,
//! including configuration, request validation and the upstream clients.

pub mod config;
pub mod error;
pub mod proxy;
pub mod upstream;

pub use config::Config;
pub use error::{Error, Result};
