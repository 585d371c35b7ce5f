//! Authentication hook for validating player identity.
//!
//! The lobby service doesn't issue or validate credentials itself; the
//! surrounding system does (JWTs minted by the web API, in production).
//! What the core needs is only this: given the token a client presented
//! in its handshake, who is it? The [`Authenticator`] trait is that seam.
//!
//! A trait lets production plug in real token validation, development
//! accept anyone, and tests use a mock, without touching the server.

use puglobby_protocol::Player;

use crate::SessionError;

/// Validates a client's auth token and returns their identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for as long as the server runs.
///
/// # Example
///
/// ```rust
/// use puglobby_protocol::{Player, PlayerId};
/// use puglobby_session::{Authenticator, SessionError};
///
/// /// Accepts `"<steam id>:<name>"`. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<Player, SessionError> {
///         let (id, name) = token
///             .split_once(':')
///             .ok_or_else(|| SessionError::AuthFailed("expected id:name".into()))?;
///         let id: u64 = id
///             .parse()
///             .map_err(|_| SessionError::AuthFailed("steam id must be a number".into()))?;
///         Ok(Player::new(PlayerId(id), name))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the player's identity.
    ///
    /// Called once per connection, during the handshake.
    ///
    /// # Returns
    /// - `Ok(Player)`: authentication succeeded, here's who they are
    /// - `Err(SessionError::AuthFailed)`: token is invalid/expired
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Player, SessionError>> + Send;
}
