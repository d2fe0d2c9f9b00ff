//! Record-level access to the router's static DNS table.
//!
//! The trait is the boundary between reconciliation logic and the management
//! protocol: `mikrodns-routeros` implements it over the binary API, tests
//! implement it over an in-memory table.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{DnsRecord, StaticDnsEntry};

/// An authenticated session against the router's static DNS resource.
///
/// Methods take `&mut self`: the underlying protocol client interleaves
/// requests and responses on one connection and is not reentrant, so callers
/// must serialize access (the [`Reconciler`](crate::Reconciler) holds the
/// session behind a single `tokio::sync::Mutex`).
#[async_trait]
pub trait RouterSession: Send {
    /// Find the first entry whose name equals `fqdn`, or `None`.
    async fn lookup(&mut self, fqdn: &str) -> Result<Option<StaticDnsEntry>>;

    /// Insert a new entry. Does not check for an existing entry with the
    /// same name; duplicates are possible by design.
    async fn add(&mut self, record: &DnsRecord) -> Result<()>;

    /// Replace the address of the entry with the given item id, preserving
    /// the entry's identity.
    async fn set_address(&mut self, id: &str, address: IpAddr) -> Result<()>;

    /// Remove the entry with the given item id.
    async fn remove(&mut self, id: &str) -> Result<()>;

    /// Release the underlying connection. The session is unusable afterwards.
    async fn close(&mut self) -> Result<()>;
}
