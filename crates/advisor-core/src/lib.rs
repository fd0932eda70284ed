//! advisor-core
//!
//! Shared building blocks for the plan advisor: layered configuration, the
//! error taxonomy, chunk/hit types, the embedder and index seams, document
//! loading and the sliding-window chunker.

pub mod chunking;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;
