//! An in-process router speaking just enough of the management protocol for
//! session tests: login, the system resource probe and the static DNS
//! resource. Options allow simulating an unresponsive router and a router
//! that drops connections.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream};

use mikrodns_core::config::RouterConfig;
use mikrodns_core::error::Result;
use mikrodns_routeros::proto::{self, Sentence};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

/// One row of the mock static DNS table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub id: String,
    pub name: String,
    pub address: String,
    pub record_type: Option<String>,
}

/// Behavior switches for failure simulation
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Hold every post-login command forever (timeout testing)
    pub stall: bool,
    /// Close the connection after serving this many post-login commands
    pub drop_after_commands: Option<usize>,
}

struct RouterState {
    table: Arc<Mutex<Vec<TableEntry>>>,
    next_id: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
    options: RouterOptions,
}

/// Handle to a spawned mock router
pub struct MockRouter {
    pub addr: SocketAddr,
    table: Arc<Mutex<Vec<TableEntry>>>,
    next_id: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
}

impl MockRouter {
    pub async fn spawn(options: RouterOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock router");
        let addr = listener.local_addr().expect("mock router local addr");

        let table = Arc::new(Mutex::new(Vec::new()));
        let next_id = Arc::new(AtomicUsize::new(1));
        let connections = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(RouterState {
            table: Arc::clone(&table),
            next_id: Arc::clone(&next_id),
            connections: Arc::clone(&connections),
            options,
        });

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    let _ = serve_connection(stream, state).await;
                });
            }
        });

        Self {
            addr,
            table,
            next_id,
            connections,
        }
    }

    /// Session configuration pointing at this router, with a short command
    /// timeout so failure tests stay fast
    pub fn config(&self) -> RouterConfig {
        RouterConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            use_ssl: false,
            ssl_verify: false,
            command_timeout_secs: 1,
            connect_max_retries: 1,
            connect_retry_delay_secs: 1,
        }
    }

    pub fn entries(&self) -> Vec<TableEntry> {
        self.table.lock().unwrap().clone()
    }

    pub fn entries_named(&self, name: &str) -> Vec<TableEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.name == name)
            .collect()
    }

    pub fn seed(&self, name: &str, address: &str) -> String {
        let id = format!("*{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.table.lock().unwrap().push(TableEntry {
            id: id.clone(),
            name: name.to_string(),
            address: address.to_string(),
            record_type: None,
        });
        id
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve_connection(mut stream: TcpStream, state: Arc<RouterState>) -> Result<()> {
    let mut served = 0usize;

    loop {
        let sentence = proto::read_sentence(&mut stream).await?;
        if sentence.is_empty() {
            continue;
        }
        let command = sentence.first().unwrap_or_default().to_string();

        if command == "/login" {
            let name = sentence.attribute_value("name").unwrap_or_default();
            let password = sentence.attribute_value("password").unwrap_or_default();
            if name == USERNAME && password == PASSWORD {
                proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
            } else {
                let trap = Sentence::command("!trap")
                    .attribute("message", "invalid user name or password (6)");
                proto::write_sentence(&mut stream, &trap).await?;
                proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
            }
            continue;
        }

        if command == "/quit" {
            proto::write_sentence(&mut stream, &Sentence::command("!fatal")).await?;
            return Ok(());
        }

        if state.options.stall {
            std::future::pending::<()>().await;
        }

        served += 1;

        match command.as_str() {
            "/system/resource/print" => {
                let reply = Sentence::command("!re")
                    .attribute("version", "7.15.3 (stable)")
                    .attribute("board-name", "mock-router");
                proto::write_sentence(&mut stream, &reply).await?;
                proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
            }

            "/ip/dns/static/print" => {
                let filter = sentence.query_value("name");
                let entries = state.table.lock().unwrap().clone();
                for entry in entries
                    .iter()
                    .filter(|entry| filter.is_none_or(|name| entry.name == name))
                {
                    let mut reply = Sentence::command("!re")
                        .attribute(".id", &entry.id)
                        .attribute("name", &entry.name)
                        .attribute("address", &entry.address);
                    if let Some(ref record_type) = entry.record_type {
                        reply = reply.attribute("type", record_type);
                    }
                    proto::write_sentence(&mut stream, &reply).await?;
                }
                proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
            }

            "/ip/dns/static/add" => {
                match (
                    sentence.attribute_value("name"),
                    sentence.attribute_value("address"),
                ) {
                    (Some(name), Some(address)) => {
                        let id = format!("*{}", state.next_id.fetch_add(1, Ordering::SeqCst));
                        state.table.lock().unwrap().push(TableEntry {
                            id: id.clone(),
                            name: name.to_string(),
                            address: address.to_string(),
                            record_type: sentence.attribute_value("type").map(str::to_string),
                        });
                        let done = Sentence::command("!done").attribute("ret", &id);
                        proto::write_sentence(&mut stream, &done).await?;
                    }
                    _ => {
                        let trap =
                            Sentence::command("!trap").attribute("message", "missing argument");
                        proto::write_sentence(&mut stream, &trap).await?;
                        proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
                    }
                }
            }

            "/ip/dns/static/set" => {
                let id = sentence.attribute_value(".id").unwrap_or_default();
                let address = sentence.attribute_value("address").unwrap_or_default();
                let found = {
                    let mut table = state.table.lock().unwrap();
                    match table.iter_mut().find(|entry| entry.id == id) {
                        Some(entry) => {
                            entry.address = address.to_string();
                            true
                        }
                        None => false,
                    }
                };
                if found {
                    proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
                } else {
                    let trap =
                        Sentence::command("!trap").attribute("message", "no such item");
                    proto::write_sentence(&mut stream, &trap).await?;
                    proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
                }
            }

            "/ip/dns/static/remove" => {
                let id = sentence.attribute_value(".id").unwrap_or_default();
                let removed = {
                    let mut table = state.table.lock().unwrap();
                    let before = table.len();
                    table.retain(|entry| entry.id != id);
                    table.len() < before
                };
                if removed {
                    proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
                } else {
                    let trap = Sentence::command("!trap").attribute("message", "no such item");
                    proto::write_sentence(&mut stream, &trap).await?;
                    proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
                }
            }

            _ => {
                let trap = Sentence::command("!trap")
                    .attribute("message", format!("unknown command {command}"));
                proto::write_sentence(&mut stream, &trap).await?;
                proto::write_sentence(&mut stream, &Sentence::command("!done")).await?;
            }
        }

        if let Some(limit) = state.options.drop_after_commands
            && served >= limit
        {
            return Ok(());
        }
    }
}
