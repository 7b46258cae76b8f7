//! Affinitas Engine library.
//!
//! Server-side code for the Affinitas narrative game-state server.
//!
//! ## Structure
//!
//! - `use_cases/` - merge engine, conversation turns, session lifecycle, quests
//! - `infrastructure/` - port traits and adapters (document store, judgment client)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod prompt_templates;
pub mod use_cases;

/// Shared fixtures for use-case tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
