//! Core library for the MikroTik static DNS webhook bridge.
//!
//! This crate holds everything that is independent of the wire protocol and
//! of the HTTP framing:
//! - **RouterSession**: trait for record-level access to the router's static
//!   DNS table (implemented by `mikrodns-routeros`)
//! - **Reconciler**: maps a desired record state onto the table (create,
//!   upsert, delete), serializing access to the shared session
//! - **RouterConfig**: environment-driven connection configuration
//! - **Error**: error kinds shared across the workspace

pub mod config;
pub mod error;
pub mod reconciler;
pub mod record;
pub mod traits;

pub use config::RouterConfig;
pub use error::{Error, Result};
pub use reconciler::Reconciler;
pub use record::{DnsRecord, RecordAction, RecordChange, StaticDnsEntry};
pub use traits::RouterSession;
