//! Pug lobby server with a development authenticator.
//!
//! Configured from the environment:
//!
//! | Variable                | Default          |
//! |-------------------------|------------------|
//! | `PUG_BIND_ADDR`         | `127.0.0.1:8080` |
//! | `PUG_OUTBOUND_CAPACITY` | `256`            |
//! | `PUG_LEADER_FAILOVER`   | `promote`        |
//! | `RUST_LOG`              | `info`           |
//!
//! Clients authenticate with a `"<steam id>:<name>"` token. Never expose
//! this binary to the internet: anyone can claim any steam id.

use puglobby::prelude::*;
use tracing_subscriber::EnvFilter;

/// Trusts whatever identity the token claims.
struct DevAuth;

impl Authenticator for DevAuth {
    async fn authenticate(&self, token: &str) -> Result<Player, SessionError> {
        let (id, name) = token
            .split_once(':')
            .ok_or_else(|| SessionError::AuthFailed("token must be <steam id>:<name>".into()))?;
        let id: u64 = id
            .parse()
            .map_err(|_| SessionError::AuthFailed("steam id must be a number".into()))?;
        if name.is_empty() {
            return Err(SessionError::AuthFailed("name must not be empty".into()));
        }
        Ok(Player::new(PlayerId(id), name))
    }
}

/// Builds the server configuration from `lookup` (normally `std::env::var`).
fn config_from(lookup: impl Fn(&str) -> Option<String>) -> Result<ServerConfig, String> {
    let mut config = ServerConfig::default();

    if let Some(addr) = lookup("PUG_BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Some(capacity) = lookup("PUG_OUTBOUND_CAPACITY") {
        config.outbound_capacity = capacity
            .parse()
            .map_err(|_| format!("PUG_OUTBOUND_CAPACITY must be a number, got {capacity:?}"))?;
    }
    if let Some(policy) = lookup("PUG_LEADER_FAILOVER") {
        config.lobby.leader_failover = policy.parse()?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config_from(|key| std::env::var(key).ok())?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        outbound_capacity = config.outbound_capacity,
        leader_failover = ?config.lobby.leader_failover,
        "starting pug lobby server"
    );

    let server = PugServerBuilder::new().config(config).build(DevAuth).await?;
    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_from_empty_env_uses_defaults() {
        let config = config_from(env(&[])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.lobby.leader_failover, LeaderFailover::PromoteOldest);
    }

    #[test]
    fn test_config_from_env_overrides() {
        let config = config_from(env(&[
            ("PUG_BIND_ADDR", "0.0.0.0:9000"),
            ("PUG_OUTBOUND_CAPACITY", "16"),
            ("PUG_LEADER_FAILOVER", "vacate"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.outbound_capacity, 16);
        assert_eq!(config.lobby.leader_failover, LeaderFailover::Vacate);
    }

    #[test]
    fn test_config_from_env_rejects_bad_values() {
        assert!(config_from(env(&[("PUG_OUTBOUND_CAPACITY", "lots")])).is_err());
        assert!(config_from(env(&[("PUG_LEADER_FAILOVER", "elect")])).is_err());
    }

    #[tokio::test]
    async fn test_dev_auth_parses_id_and_name() {
        let player = DevAuth.authenticate("76561198000000001:medic").await.unwrap();
        assert_eq!(player, Player::new(PlayerId(76561198000000001), "medic"));

        assert!(DevAuth.authenticate("medic").await.is_err());
        assert!(DevAuth.authenticate("abc:medic").await.is_err());
        assert!(DevAuth.authenticate("1:").await.is_err());
    }
}
