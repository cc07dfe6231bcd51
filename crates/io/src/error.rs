use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    /// A stored row cannot be decoded back into a record.
    #[error("record {id}: {message}")]
    Corrupt { id: i64, message: String },
    /// The database was written by a newer schema.
    #[error("store schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
    #[error("prefix import: {0}")]
    Import(String),
}
