//! Shared data model, error taxonomy, embedder capabilities and configuration.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
