//! Infrastructure implementations.
//!
//! Port traits for the backing store, the SQLite adapter behind them and the
//! environment-driven engine settings.

pub mod ports;
pub mod settings;
pub mod sqlite;
