//! Traits at the seams of the bridge.

mod router_session;

pub use router_session::RouterSession;
