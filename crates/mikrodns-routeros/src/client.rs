//! One authenticated connection to the router's management API.
//!
//! The connection submits credentials in plaintext over the chosen transport
//! (`/login` with `=name=`/`=password=`, post-6.43 style) and then executes
//! one command at a time. Every call is bounded by the configured command
//! timeout; an elapsed bound leaves the stream mid-sentence, so callers must
//! discard the connection afterwards.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use mikrodns_core::config::RouterConfig;
use mikrodns_core::error::{Error, Result};

use crate::proto::{self, ReplyKind, Sentence};

/// Byte stream the protocol runs over, plain or TLS
trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// An authenticated management API connection
pub(crate) struct Connection {
    stream: Box<dyn AsyncStream>,
    command_timeout: Duration,
}

impl Connection {
    /// Establish the transport, then authenticate.
    ///
    /// With `use_ssl` the stream is wrapped in TLS before the login sentence
    /// is sent; `ssl_verify` controls certificate and hostname verification.
    pub(crate) async fn connect(config: &RouterConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let tcp = timeout(config.command_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::connection(format!("connecting to {addr} timed out")))?
            .map_err(|e| Error::connection(format!("connecting to {addr} failed: {e}")))?;

        let stream: Box<dyn AsyncStream> = if config.use_ssl {
            let mut builder = native_tls::TlsConnector::builder();
            if !config.ssl_verify {
                builder.danger_accept_invalid_certs(true);
                builder.danger_accept_invalid_hostnames(true);
            }
            let connector = tokio_native_tls::TlsConnector::from(
                builder
                    .build()
                    .map_err(|e| Error::connection(format!("TLS setup failed: {e}")))?,
            );
            let tls = connector
                .connect(&config.host, tcp)
                .await
                .map_err(|e| Error::connection(format!("TLS handshake with {addr} failed: {e}")))?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let mut connection = Self {
            stream,
            command_timeout: config.command_timeout(),
        };
        connection.login(&config.username, &config.password).await?;
        debug!("logged in to {addr} as {}", config.username);

        Ok(connection)
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let sentence = Sentence::command("/login")
            .attribute("name", username)
            .attribute("password", password);

        match self.run("login", sentence).await {
            Ok(_) => Ok(()),
            // A trap during login means rejected credentials, not a failed
            // record operation.
            Err(Error::Upstream { message, .. }) => Err(Error::auth(message)),
            Err(other) => Err(other),
        }
    }

    /// Execute one command sentence and collect its `!re` replies.
    ///
    /// `operation` names the record operation for error context. A `!trap`
    /// reply becomes [`Error::Upstream`], `!fatal` becomes
    /// [`Error::Connection`], and exceeding the command timeout becomes
    /// [`Error::Timeout`].
    pub(crate) async fn run(&mut self, operation: &str, sentence: Sentence) -> Result<Vec<Sentence>> {
        match timeout(self.command_timeout, self.exchange(operation, sentence)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation)),
        }
    }

    async fn exchange(&mut self, operation: &str, sentence: Sentence) -> Result<Vec<Sentence>> {
        proto::write_sentence(&mut self.stream, &sentence).await?;

        let mut replies = Vec::new();
        let mut trap: Option<String> = None;
        loop {
            let reply = proto::read_sentence(&mut self.stream).await?;
            if reply.is_empty() {
                continue;
            }

            match reply.reply_kind() {
                Some(ReplyKind::Data) => replies.push(reply),
                Some(ReplyKind::Done) => break,
                Some(ReplyKind::Trap) => {
                    let message = reply
                        .attribute_value("message")
                        .unwrap_or("unspecified trap")
                        .to_string();
                    if trap.is_none() {
                        trap = Some(message);
                    }
                }
                Some(ReplyKind::Fatal) => {
                    let detail = reply.words().get(1).cloned().unwrap_or_default();
                    return Err(Error::connection(format!(
                        "router closed the session: {detail}"
                    )));
                }
                None => {
                    return Err(Error::protocol(format!(
                        "unexpected reply word {:?}",
                        reply.first()
                    )));
                }
            }
        }

        match trap {
            Some(message) => Err(Error::upstream(operation, message)),
            None => Ok(replies),
        }
    }

    /// Best-effort protocol goodbye. The router answers `/quit` with `!fatal`
    /// and closes the stream, so errors here are ignored.
    pub(crate) async fn quit(&mut self) {
        let _ = timeout(
            self.command_timeout,
            proto::write_sentence(&mut self.stream, &Sentence::command("/quit")),
        )
        .await;
    }
}
