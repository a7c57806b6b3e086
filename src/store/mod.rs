//! Persistence layer for conversation state.

pub mod json;
pub mod traits;

pub use json::JsonFileStore;
pub use traits::StateStore;
