// Record store and prefix table using SQLite

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use eurostock_recon::{
    Category, LookupError, Prefix, PrefixMapping, PrefixSource, RawRecord, StaticPrefixTable,
    UserId,
};

use crate::error::StoreError;
use crate::STORE_SCHEMA_VERSION;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT,                        -- NULL = no code extracted
    raw_text TEXT NOT NULL,
    vehicle_brand TEXT,
    vehicle_model TEXT,
    captured_at TEXT NOT NULL,        -- RFC 3339, UTC
    location TEXT,
    captured_by TEXT NOT NULL,
    category TEXT NOT NULL            -- standard | complementary | oem (as classified at capture)
);

CREATE INDEX IF NOT EXISTS records_by_user ON records (captured_by, code);

CREATE TABLE IF NOT EXISTS prefix_mappings (
    prefix TEXT PRIMARY KEY CHECK (length(prefix) = 4),
    brand TEXT NOT NULL,
    model TEXT
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const RECORD_COLUMNS: &str =
    "id, code, raw_text, vehicle_brand, vehicle_model, captured_at, location, captured_by, category";

/// SQL predicate selecting one stock category from the code's first character.
fn category_predicate(category: Category) -> &'static str {
    match category {
        Category::Complementary => "substr(ltrim(code, char(32, 9, 10, 13)), 1, 1) = '#'",
        Category::Oem => "substr(ltrim(code, char(32, 9, 10, 13)), 1, 1) = '*'",
        Category::Standard => {
            "(code IS NULL OR substr(ltrim(code, char(32, 9, 10, 13)), 1, 1) NOT IN ('#', '*'))"
        }
    }
}

/// Append-only record store plus the shared prefix table.
///
/// Records are never updated or deleted through this type.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;

        let stored: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
            .optional()?;
        match stored.and_then(|v| v.parse::<u32>().ok()) {
            Some(found) if found > STORE_SCHEMA_VERSION => {
                return Err(StoreError::SchemaTooNew { found, supported: STORE_SCHEMA_VERSION });
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    params![STORE_SCHEMA_VERSION.to_string()],
                )?;
            }
        }

        Ok(Self { conn })
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Append a captured record and return its new id.
    pub fn append_record(&self, record: &RawRecord) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO records (code, raw_text, vehicle_brand, vehicle_model, captured_at, location, captured_by, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.code.as_deref(),
                &record.raw_text,
                record.vehicle_brand.as_deref(),
                record.vehicle_model.as_deref(),
                record.captured_at.to_rfc3339(),
                record.location.as_deref(),
                record.captured_by.as_str(),
                record.category.as_str(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(
            id,
            user = %record.captured_by,
            code = record.code.as_deref().unwrap_or("-"),
            "record appended"
        );
        Ok(id)
    }

    /// All records captured by `user`, oldest first, optionally limited to
    /// codes of one category (decided by the code's marker, not the stored
    /// category column).
    pub fn records_for(
        &self,
        user: &UserId,
        category: Option<Category>,
    ) -> Result<Vec<RawRecord>, StoreError> {
        let filter = category
            .map(|c| format!(" AND {}", category_predicate(c)))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE captured_by = ?1{filter} ORDER BY captured_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user.as_str()], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode_row(row?)?);
        }
        Ok(records)
    }

    pub fn record_count(&self, user: &UserId) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE captured_by = ?1",
            params![user.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // -----------------------------------------------------------------------
    // Prefix table
    // -----------------------------------------------------------------------

    pub fn upsert_prefix(&self, prefix: &Prefix, mapping: &PrefixMapping) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO prefix_mappings (prefix, brand, model) VALUES (?1, ?2, ?3)
             ON CONFLICT(prefix) DO UPDATE SET brand = excluded.brand, model = excluded.model",
            params![
                prefix.as_str(),
                mapping.brand.trim(),
                mapping.model.as_deref().map(str::trim).filter(|m| !m.is_empty()),
            ],
        )?;
        Ok(())
    }

    /// Upsert many mappings in one transaction. Returns the number written.
    pub fn upsert_prefixes<'a, I>(&mut self, rows: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a (Prefix, PrefixMapping)>,
    {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO prefix_mappings (prefix, brand, model) VALUES (?1, ?2, ?3)
                 ON CONFLICT(prefix) DO UPDATE SET brand = excluded.brand, model = excluded.model",
            )?;
            for (prefix, mapping) in rows {
                stmt.execute(params![
                    prefix.as_str(),
                    mapping.brand.trim(),
                    mapping.model.as_deref().map(str::trim).filter(|m| !m.is_empty()),
                ])?;
                written += 1;
            }
        }
        tx.commit()?;
        tracing::info!(written, "prefix mappings imported");
        Ok(written)
    }

    pub fn prefix_count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM prefix_mappings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Snapshot the whole prefix table into memory.
    pub fn prefix_table(&self) -> Result<StaticPrefixTable, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT prefix, brand, model FROM prefix_mappings ORDER BY prefix")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Option<String>>(2)?))
        })?;

        let mut table = StaticPrefixTable::new();
        for row in rows {
            let (prefix, brand, model) = row?;
            // The CHECK constraint only guards length; skip anything non-numeric.
            if let Some(prefix) = Prefix::parse(&prefix) {
                table.insert(prefix, PrefixMapping { brand, model });
            }
        }
        Ok(table)
    }
}

impl PrefixSource for Store {
    fn lookup(&self, prefix: &Prefix) -> Result<Option<PrefixMapping>, LookupError> {
        self.conn
            .query_row(
                "SELECT brand, model FROM prefix_mappings WHERE prefix = ?1",
                params![prefix.as_str()],
                |row| Ok(PrefixMapping { brand: row.get(0)?, model: row.get(1)? }),
            )
            .optional()
            .map_err(|e| LookupError(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

struct StoredRow {
    id: i64,
    code: Option<String>,
    raw_text: String,
    vehicle_brand: Option<String>,
    vehicle_model: Option<String>,
    captured_at: String,
    location: Option<String>,
    captured_by: String,
    category: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        code: row.get(1)?,
        raw_text: row.get(2)?,
        vehicle_brand: row.get(3)?,
        vehicle_model: row.get(4)?,
        captured_at: row.get(5)?,
        location: row.get(6)?,
        captured_by: row.get(7)?,
        category: row.get(8)?,
    })
}

fn decode_row(row: StoredRow) -> Result<RawRecord, StoreError> {
    let captured_at = DateTime::parse_from_rfc3339(&row.captured_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: row.id,
            message: format!("bad timestamp '{}': {e}", row.captured_at),
        })?;
    let category = row
        .category
        .parse::<Category>()
        .map_err(|message| StoreError::Corrupt { id: row.id, message })?;

    Ok(RawRecord {
        id: Some(row.id),
        code: row.code,
        raw_text: row.raw_text,
        vehicle_brand: row.vehicle_brand,
        vehicle_model: row.vehicle_model,
        captured_at,
        location: row.location,
        captured_by: UserId(row.captured_by),
        category,
    })
}
