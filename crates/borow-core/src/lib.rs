//! Borow Core - Concept identities, contexts, metadata snapshots, and errors

pub mod address;
pub mod config;
pub mod error;
pub mod types;

pub use address::{address_of, ConceptAddress};
pub use config::{DefaultContextConfig, RegistryConfig, RuntimeConfig};
pub use error::{Error, Result};
pub use types::*;
