//! # codex-core
//!
//! Core types, traits, and abstractions for the Quarry Codex knowledge base.
//!
//! This crate provides the foundational data structures and the storage
//! trait definitions that the database layer implements and the move
//! pipeline depends on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
