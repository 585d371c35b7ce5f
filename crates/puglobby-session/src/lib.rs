//! Player sessions for the pug lobby service.
//!
//! This crate handles everything about a player that outlives a single
//! request but not the connection:
//!
//! 1. **Authentication**: turning a handshake token into a [`Player`]
//!    ([`Authenticator`] trait; the real check lives outside this service)
//! 2. **Clients**: the per-connection handle lobbies hold: identity,
//!    a bounded outbound queue, and the ids of the lobbies it is in
//!    ([`Client`])
//! 3. **Session tracking**: one live connection per player
//!    ([`SessionManager`])
//!
//! [`Player`]: puglobby_protocol::Player

#![allow(async_fn_in_trait)]

mod auth;
mod client;
mod error;
mod manager;

pub use auth::Authenticator;
pub use client::{Client, OutboundQueue};
pub use error::SessionError;
pub use manager::SessionManager;
