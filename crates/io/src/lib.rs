// Persistence and file exchange for the inventory engine

pub mod csv;
pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::Store;

/// Record store schema version.
/// Increment when the schema changes in a way that old versions can't read
pub const STORE_SCHEMA_VERSION: u32 = 1;
