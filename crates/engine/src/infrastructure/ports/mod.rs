//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions over external systems in the engine.
//! Ports exist for:
//! - World graph rows (rooms, areas, occupants)
//! - Player persistence (location, vitals, online flag)
//! - Item ownership

mod error;
mod repos;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{ItemStore, PlayerStore, WorldStore};

// =============================================================================
// Test-Only Mock Repositories (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockItemStore, MockPlayerStore, MockWorldStore};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{RepoError, SessionError};
