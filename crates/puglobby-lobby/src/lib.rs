//! Lobbies and the registry that tracks them.
//!
//! A lobby is a named group of connected clients with one leader, a chat
//! history, and the options it was created with. Each lobby guards its
//! own state with a `tokio::sync::RwLock`; the registry has a separate
//! lock of its own.
//!
//! # Key types
//!
//! - [`Lobby`]: the capability set every kind of lobby implements
//! - [`PugLobby`]: the pick-up-game lobby
//! - [`ConnectionManager`]: creates, finds, lists, and removes lobbies
//! - [`LobbyConfig`] / [`LeaderFailover`]: per-manager settings
//! - [`Clock`]: the shared time source for chat timestamps

mod clock;
mod config;
mod error;
mod lobby;
mod manager;
mod pug;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LeaderFailover, LobbyConfig, LobbyContext};
pub use error::LobbyError;
pub use lobby::{JoinOutcome, Lobby};
pub use manager::ConnectionManager;
pub use pug::PugLobby;
