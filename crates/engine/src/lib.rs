//! tickmud engine library.
//!
//! A tick-driven multi-user text world: players connect over TCP, type commands, and
//! move through rooms grouped into areas, each area simulated by its own actor task.
//!
//! ## Structure
//!
//! - `entities/` - The live world graph: rooms, exits and occupants
//! - `areas/` - Area actors, their action queues and the directory connections use
//! - `use_cases/` - Command parsing, routing and the player commands themselves
//! - `infrastructure/` - Store ports, the SQLite adapter and settings
//! - `api/` - Sessions, notification delivery and the TCP front end
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod areas;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

/// Test fixtures: in-memory store, world builder and engine harness.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
