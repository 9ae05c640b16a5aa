//! LSP backend
//!
//! Split into state (the `SableBackend` struct and construction) and
//! handlers (the `LanguageServer` trait implementation plus the custom
//! after-insert method).

pub mod handlers;
pub mod state;

pub use state::SableBackend;
