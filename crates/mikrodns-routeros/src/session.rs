//! [`RouterSession`] over the RouterOS management API.

use std::net::IpAddr;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use mikrodns_core::config::RouterConfig;
use mikrodns_core::error::{Error, Result};
use mikrodns_core::record::{DnsRecord, StaticDnsEntry};
use mikrodns_core::traits::RouterSession;

use crate::client::Connection;
use crate::proto::Sentence;

/// Path of the static DNS resource in the router's command tree
const STATIC_DNS_PATH: &str = "/ip/dns/static";

/// A session against the router's static DNS table.
///
/// Holds the configuration alongside the live connection: when an exchange
/// dies (I/O failure, timeout, torn-down stream), the connection is dropped
/// and the next operation establishes a fresh one. The failing operation
/// itself still reports its error; it is not retried.
pub struct RouterOsSession {
    config: RouterConfig,
    connection: Option<Connection>,
}

impl RouterOsSession {
    /// Connect and authenticate.
    pub async fn connect(config: RouterConfig) -> Result<Self> {
        let connection = Connection::connect(&config).await?;
        let mut session = Self {
            config,
            connection: Some(connection),
        };
        session.log_router_identity().await;
        Ok(session)
    }

    /// Log the peer's board name and RouterOS version. Purely informational,
    /// so a failed probe only warns.
    async fn log_router_identity(&mut self) {
        let probe = Sentence::command("/system/resource/print");
        match self.run("system probe", probe).await {
            Ok(replies) => {
                if let Some(reply) = replies.first() {
                    info!(
                        "connected to board {} running RouterOS {}",
                        reply.attribute_value("board-name").unwrap_or("unknown"),
                        reply.attribute_value("version").unwrap_or("unknown"),
                    );
                }
            }
            Err(e) => warn!("system resource probe failed: {e}"),
        }
    }

    async fn connection(&mut self) -> Result<&mut Connection> {
        if self.connection.is_none() {
            info!(
                "re-establishing session with {}:{}",
                self.config.host, self.config.port
            );
            self.connection = Some(Connection::connect(&self.config).await?);
        }
        self.connection
            .as_mut()
            .ok_or_else(|| Error::connection("session is closed"))
    }

    async fn run(&mut self, operation: &str, sentence: Sentence) -> Result<Vec<Sentence>> {
        let connection = self.connection().await?;
        match connection.run(operation, sentence).await {
            Ok(replies) => Ok(replies),
            Err(e) => {
                if poisons_connection(&e) {
                    debug!("discarding connection after failed {operation}: {e}");
                    self.connection = None;
                }
                Err(e)
            }
        }
    }
}

/// A timed-out or I/O-failed exchange leaves the stream mid-sentence; the
/// connection cannot be reused. A `!trap` is a clean reply and keeps the
/// connection.
fn poisons_connection(error: &Error) -> bool {
    matches!(
        error,
        Error::Io(_) | Error::Connection(_) | Error::Protocol(_) | Error::Timeout { .. }
    )
}

#[async_trait]
impl RouterSession for RouterOsSession {
    async fn lookup(&mut self, fqdn: &str) -> Result<Option<StaticDnsEntry>> {
        let sentence = Sentence::command(format!("{STATIC_DNS_PATH}/print")).query("name", fqdn);
        let replies = self.run("lookup", sentence).await?;

        for reply in &replies {
            let (Some(id), Some(name)) = (
                reply.attribute_value(".id"),
                reply.attribute_value("name"),
            ) else {
                continue;
            };
            return Ok(Some(StaticDnsEntry {
                id: id.to_string(),
                name: name.to_string(),
                address: reply.attribute_value("address").unwrap_or_default().to_string(),
            }));
        }
        Ok(None)
    }

    async fn add(&mut self, record: &DnsRecord) -> Result<()> {
        let mut sentence = Sentence::command(format!("{STATIC_DNS_PATH}/add"))
            .attribute("name", &record.fqdn)
            .attribute("address", record.address.to_string());
        // IPv4 entries use the router's implicit A type.
        if record.address.is_ipv6() {
            sentence = sentence.attribute("type", "AAAA");
        }

        self.run("add", sentence).await?;
        Ok(())
    }

    async fn set_address(&mut self, id: &str, address: IpAddr) -> Result<()> {
        let sentence = Sentence::command(format!("{STATIC_DNS_PATH}/set"))
            .attribute(".id", id)
            .attribute("address", address.to_string());

        self.run("set", sentence).await?;
        Ok(())
    }

    async fn remove(&mut self, id: &str) -> Result<()> {
        let sentence = Sentence::command(format!("{STATIC_DNS_PATH}/remove")).attribute(".id", id);

        self.run("remove", sentence).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut connection) = self.connection.take() {
            connection.quit().await;
            debug!(
                "closed session with {}:{}",
                self.config.host, self.config.port
            );
        }
        Ok(())
    }
}
