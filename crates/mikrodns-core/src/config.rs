//! Connection configuration for the router session.
//!
//! All configuration comes from `MIKROTIK_*` environment variables. Host,
//! user and password are hard requirements: the daemon refuses to start
//! without them, naming the missing variable in the diagnostic.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default RouterOS API port (plain transport; the TLS variant conventionally
/// runs on 8729, which deployments select via `MIKROTIK_PORT`)
pub const DEFAULT_API_PORT: u16 = 8728;

/// Default bound on a single remote call
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;

/// Default number of connection attempts at startup
pub const DEFAULT_CONNECT_MAX_RETRIES: u32 = 3;

/// Default delay between startup connection attempts
pub const DEFAULT_CONNECT_RETRY_DELAY_SECS: u64 = 5;

/// Connection details for the router's management API
#[derive(Clone)]
pub struct RouterConfig {
    /// Router hostname or address
    pub host: String,

    /// Management API port
    pub port: u16,

    /// Login user
    pub username: String,

    /// Login password, submitted in plaintext over the chosen transport
    pub password: String,

    /// Wrap the connection in TLS
    pub use_ssl: bool,

    /// Verify the server certificate and hostname (only meaningful with
    /// `use_ssl`)
    pub ssl_verify: bool,

    /// Bound on a single remote call, in seconds
    pub command_timeout_secs: u64,

    /// Number of connection attempts before startup fails
    pub connect_max_retries: u32,

    /// Delay between startup connection attempts, in seconds
    pub connect_retry_delay_secs: u64,
}

// The password never appears in Debug output.
impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("use_ssl", &self.use_ssl)
            .field("ssl_verify", &self.ssl_verify)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("connect_max_retries", &self.connect_max_retries)
            .field("connect_retry_delay_secs", &self.connect_retry_delay_secs)
            .finish()
    }
}

impl RouterConfig {
    /// Load configuration from `MIKROTIK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests supply a map instead of mutating
    /// process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = required(&lookup, "MIKROTIK_HOST")?;
        let username = required(&lookup, "MIKROTIK_USER")?;
        let password = required(&lookup, "MIKROTIK_PASS")?;

        let port = parse_or(&lookup, "MIKROTIK_PORT", DEFAULT_API_PORT)?;
        let use_ssl = bool_var(&lookup, "MIKROTIK_USE_SSL");
        let ssl_verify = bool_var(&lookup, "MIKROTIK_SSL_VERIFY");

        let command_timeout_secs = parse_or(
            &lookup,
            "MIKROTIK_COMMAND_TIMEOUT_SECS",
            DEFAULT_COMMAND_TIMEOUT_SECS,
        )?;
        let connect_max_retries = parse_or(
            &lookup,
            "MIKROTIK_CONNECT_MAX_RETRIES",
            DEFAULT_CONNECT_MAX_RETRIES,
        )?;
        let connect_retry_delay_secs = parse_or(
            &lookup,
            "MIKROTIK_CONNECT_RETRY_DELAY_SECS",
            DEFAULT_CONNECT_RETRY_DELAY_SECS,
        )?;

        let config = Self {
            host,
            port,
            username,
            password,
            use_ssl,
            ssl_verify,
            command_timeout_secs,
            connect_max_retries,
            connect_retry_delay_secs,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config("MIKROTIK_HOST must not be empty"));
        }
        if self.username.is_empty() {
            return Err(Error::config("MIKROTIK_USER must not be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::config("MIKROTIK_PASS must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("MIKROTIK_PORT must not be 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(Error::config("MIKROTIK_COMMAND_TIMEOUT_SECS must be > 0"));
        }
        if self.connect_max_retries == 0 {
            return Err(Error::config("MIKROTIK_CONNECT_MAX_RETRIES must be > 0"));
        }
        Ok(())
    }

    /// Bound on a single remote call
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Delay between startup connection attempts
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::config(format!("environment variable {key} is not set")))
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("environment variable {key} has invalid value: {raw}"))),
    }
}

/// Booleans accept `true`, `1` and `yes` in any case; everything else,
/// including an unset variable, is false.
fn bool_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
