//! Shared domain types and cross-cutting helpers for the Ash bot workspace.
//!
//! Everything the other crates agree on lives here: the user tier hierarchy,
//! the catalog/reminder/trivia data model, the platform gateway contract,
//! configuration loading, the error taxonomy, and a handful of pure
//! algorithms (sequence similarity, UK wall-clock math, duration parsing,
//! trivia answer evaluation) that several subsystems share.

pub mod config;
pub mod error;
pub mod game;
pub mod gateway;
pub mod reminder;
pub mod retry;
pub mod similarity;
pub mod trivia;
pub mod types;
pub mod uktime;

pub use error::{AshError, Result};
