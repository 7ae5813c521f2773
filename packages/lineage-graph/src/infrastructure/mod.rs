//! Infrastructure layer - LineageStore adapters
//!
//! - `memory`: DashMap-backed, the default
//! - `sqlite`: file-backed persistence (feature `sqlite`)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryLineageStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLineageStore;
