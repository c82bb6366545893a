//! Mapping store backends: in-memory, SQLite and MySQL.

pub mod memory;
pub mod mysql;
pub mod sqlite;
mod sql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use snip_core::{Mapping, MappingStore, StoreError};
pub use sqlite::{SqliteStore, DEFAULT_SQLITE_URL};
