use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use tracing::{info, warn};

use crate::error::Error;

/// Listener settings for the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Read `HOST` (default `127.0.0.1`) and `PORT` (default `3000`).
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a value is set but does not parse.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "3000")?,
        })
    }

    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `host` is not an IP address.
    pub fn addr(&self) -> Result<SocketAddr, Error> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("HOST/PORT: {e}")))
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, Error>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        Error::Config(format!("{key}: {e}"))
    })
}
