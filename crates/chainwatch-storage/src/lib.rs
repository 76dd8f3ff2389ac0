//! chainwatch-storage: subscriber registry and transaction store backends.
//!
//! # Backends
//!
//! - **memory** (default): process-local, lost on restart
//! - **sqlite**: single-file persistence via `sqlx`

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{InMemoryRegistry, InMemoryTxStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
