//! Authenticated HTTP clients for the Gym Tracker services
//!
//! The Gym Tracker application talks to two independent services: the primary
//! backend (accounts, exercises, workouts, administration) and the assistant
//! service (chat). Both expect the same bearer credential, and both answer
//! with a 401 when it has expired. This crate builds the two client stacks
//! and hides the recovery from their callers:
//!
//! * every outgoing request carries a fresh `x-request-id` and, when a
//!   credential is stored, a `Bearer` authorization header,
//! * the first 401 on an otherwise healthy session triggers exactly one
//!   cookie-authenticated refresh call, no matter how many requests fail at
//!   the same time — the rest queue up and are replayed in arrival order once
//!   the new credential lands,
//! * a request is replayed at most once; if the refresh itself is rejected,
//!   the stored credential is dropped and the session is declared expired so
//!   the embedding application can return to its login entry point.
//!
//! ```no_run
//! use gymtrack_client::{ClientConfig, GymClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GymClient::new(ClientConfig::from_env()?)?;
//!
//! let exercises = client.exercises().list().await?;
//! println!("{} exercises", exercises.len());
//! # Ok(())
//! # }
//! ```
//!
//! Failures carry a user-facing rendering via
//! [`ApiError::user_message`], so UI layers can surface a message without
//! inspecting status codes themselves.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod api;
mod client;
pub mod config;
mod error;
mod health;
mod middleware;
mod refresh;
mod request_id;

pub use client::{BuildError, GymClient};
pub use config::{ClientConfig, ServiceConfig};
pub use error::ApiError;
pub use health::Service;
pub use refresh::RefreshFailure;
pub use request_id::next_request_id;

// The session primitives are part of this crate's public API surface.
pub use gymtrack_session as session;
