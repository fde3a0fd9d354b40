//! CBI Proxy Library
//!
//! Token-caching proxy in front of the CB Insights chat API, plus trend
//! extraction from answer text.
//!
//! # Components
//!
//! - **Token Cache + Authenticator**: bearer token from `/v2/authorize`,
//!   reused while more than a 60 s safety margin remains
//! - **Chat Forwarder**: validates, authenticates, forwards to
//!   `/v2/chatcbi`, normalizes the response shape
//! - **HTTP Front Door**: `POST /api/chatcbi` + `GET /health` with
//!   permissive CORS
//! - **Trend Parser**: ordered `{priority, name}` records from free text
//! - **Batch Fetch**: one-shot snapshot file for static front-ends

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod forwarder;
pub mod server;
pub mod trends;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
