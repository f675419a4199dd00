use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::models::EnrichedRecord;
use crate::utils::constants::VALUE_DB_COLUMN;
use crate::writers::read_records;

/// Columns of a result set plus its rows, values as SQLite returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render one SQLite value for terminal or CSV output; NULL is empty.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn validate_identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(ProcessingError::InvalidQuery(format!(
            "'{}' is not a valid identifier",
            name
        )))
    }
}

fn reject_statement_breaks(fragment: &str, what: &str) -> Result<()> {
    if fragment.contains(';') {
        return Err(ProcessingError::InvalidQuery(format!(
            "{} must be a single expression",
            what
        )));
    }
    Ok(())
}

/// Relational home for the accumulated enrichment output.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn create_table(&self, table: &str) -> Result<()> {
        let table = validate_identifier(table)?;
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                latlon TEXT NOT NULL,
                {VALUE_DB_COLUMN} REAL NOT NULL,
                country TEXT,
                county TEXT,
                neighbourhood TEXT,
                state TEXT,
                suburb TEXT,
                town TEXT
            );"
        ))?;
        Ok(())
    }

    /// Replace the table's contents with `records`, in one transaction.
    ///
    /// Ids follow record order starting at 0. Absent address levels are NULL.
    pub fn load_records(&mut self, table: &str, records: &[EnrichedRecord]) -> Result<usize> {
        self.create_table(table)?;
        let table = validate_identifier(table)?;

        let tx = self.conn.transaction()?;
        let removed = tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table}
                    (id, latlon, {VALUE_DB_COLUMN}, country, county, neighbourhood, state, suburb, town)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ))?;
            for (id, record) in records.iter().enumerate() {
                let [country, county, neighbourhood, state, suburb, town] = record.address.fields();
                stmt.execute(params![
                    id as i64,
                    record.latlon,
                    record.value,
                    country,
                    county,
                    neighbourhood,
                    state,
                    suburb,
                    town,
                ])?;
            }
        }
        tx.commit()?;

        info!(table, removed, inserted = records.len(), "Table replaced");
        Ok(records.len())
    }

    /// Load an accumulated output file, replacing the table.
    pub fn load_file(&mut self, path: &Path, table: &str) -> Result<usize> {
        let records = read_records(path)?;
        if records.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No records in {}",
                path.display()
            )));
        }
        self.load_records(table, &records)
    }

    /// `select <fields> from <table> [where <predicate>]`.
    pub fn select(&self, fields: &str, table: &str, predicate: Option<&str>) -> Result<QueryResult> {
        let fields = fields.trim();
        if fields.is_empty() {
            return Err(ProcessingError::InvalidQuery("No fields requested".to_string()));
        }
        reject_statement_breaks(fields, "Field list")?;
        let table = validate_identifier(table)?;

        let mut sql = format!("SELECT {fields} FROM {table}");
        if let Some(predicate) = predicate.map(str::trim).filter(|p| !p.is_empty()) {
            reject_statement_breaks(predicate, "Predicate")?;
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        debug!(%sql, "Running query");

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(QueryResult { columns, rows })
    }

    /// Mean of `value` per non-empty `group`, ordered by group.
    pub fn aggregate(&self, table: &str, group: &str, value: &str) -> Result<Vec<(String, f64)>> {
        let table = validate_identifier(table)?;
        let group = validate_identifier(group)?;
        let value = validate_identifier(value)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {group}, AVG({value}) FROM {table}
             WHERE {group} IS NOT NULL AND TRIM({group}) <> ''
             GROUP BY {group}
             ORDER BY {group}"
        ))?;

        let groups = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        let table = validate_identifier(table)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
