use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("AGORA_JWT_SECRET").unwrap_or_else(|| {
            warn!("AGORA_JWT_SECRET not set; using the development secret");
            DEV_SECRET.into()
        });
        let db_path = var("AGORA_DB_PATH").unwrap_or_else(|| "agora.db".into());
        let host = var("AGORA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("AGORA_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("AGORA_PORT must be a port number")?;

        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.jwt_secret, DEV_SECRET);
        assert_eq!(config.db_path, PathBuf::from("agora.db"));
        assert_eq!(config.addr.port(), 3000);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("AGORA_JWT_SECRET", "s3cret"),
            ("AGORA_HOST", "127.0.0.1"),
            ("AGORA_PORT", "8081"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.addr.to_string(), "127.0.0.1:8081");
    }

    #[test]
    fn rejects_bad_port() {
        assert!(ServerConfig::from_lookup(lookup(&[("AGORA_PORT", "http")])).is_err());
    }
}
