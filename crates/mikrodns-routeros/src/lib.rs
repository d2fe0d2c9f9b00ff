//! RouterOS management API client.
//!
//! Implements the router side of the bridge: the binary word/sentence wire
//! protocol (`proto`), a single authenticated connection with per-call
//! timeouts (`client`), and the [`RouterSession`](mikrodns_core::RouterSession)
//! implementation against the `/ip/dns/static` resource (`session`).
//!
//! Credentials are submitted in plaintext over the chosen transport (plain
//! TCP or TLS), matching post-6.43 RouterOS login.

mod client;
pub mod proto;
mod session;

pub use session::RouterOsSession;
