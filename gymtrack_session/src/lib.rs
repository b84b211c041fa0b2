//! Credential handling for the Gym Tracker client libraries
//!
//! The Gym Tracker clients talk to two independent services (the primary
//! backend and the assistant service) using a single bearer credential. That
//! credential expires, and when it does the servers answer with a 401. This
//! crate holds the pieces needed to recover from that without the caller
//! noticing:
//!
//! * strongly-typed token and correlation-id strings that do not leak their
//!   contents into logs,
//! * credential stores holding the one live credential, in memory or on disk,
//! * a [`RefreshCoordinator`] guaranteeing that any number of concurrent
//!   authorization failures collapse into exactly one refresh call, with every
//!   other caller queued and settled in arrival order, and
//! * a [`SessionEvents`] channel that tells the embedding application when the
//!   session is beyond recovery and a new login is required.
//!
//! None of this performs HTTP on its own. The `gymtrack_client` crate wires
//! these pieces into its middleware stacks; other transports can do the same.
//!
//! # Single-flight refresh
//!
//! The coordinator hands out exactly one [`RefreshGuard`] at a time. The
//! holder performs the refresh and settles everyone else:
//!
//! ```
//! use gymtrack_session::{AccessToken, RefreshCoordinator, RefreshTicket};
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let coordinator = RefreshCoordinator::<std::convert::Infallible>::new();
//!
//! let guard = match coordinator.acquire() {
//!     RefreshTicket::Leader(guard) => guard,
//!     RefreshTicket::Waiter(_) => unreachable!("no refresh is in flight yet"),
//! };
//!
//! // Everyone arriving while the guard is live becomes a waiter.
//! let RefreshTicket::Waiter(waiter) = coordinator.acquire() else {
//!     unreachable!("a refresh is in flight");
//! };
//!
//! guard.complete(Ok(AccessToken::from("fresh-token")));
//! let token = waiter.wait().await.unwrap();
//! assert_eq!(token.as_str(), "fresh-token");
//! # }
//! ```

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

mod coordinator;
mod events;
pub mod store;
mod token;

pub use coordinator::{
    RefreshCoordinator, RefreshFailed, RefreshGuard, RefreshTicket, RefreshWaiter,
};
pub use events::{SessionEvents, SessionStatus};
pub use token::*;
