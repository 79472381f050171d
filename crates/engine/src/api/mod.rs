//! API layer - the TCP line protocol and per-player delivery.

pub mod connections;
pub mod notify;
pub mod telnet;

pub use connections::{Session, SessionRegistry};
pub use notify::Broadcaster;
