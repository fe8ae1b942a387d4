//! HTTP proxy server module.
//!
//! This module provides the HTTP API that validates client requests and
//! forwards them to the upstream providers, keeping API keys server-side.

mod extract;
mod handlers;
mod server;
pub mod types;

pub use extract::{Valid, ValidQuery};
pub use server::{create_router, run_server, AppState, REQUEST_ID_HEADER};
pub use types::{ChatReply, ChatRequest, Content, ImageSource, Part, Validate};
