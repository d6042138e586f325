//! Upsert of flat rows into a sparse SQLite table.
//!
//! The table is created from the columns seen in the rows and grows a `TEXT`
//! column for every new field name. Rows are written with `INSERT OR
//! REPLACE` against a unique index on the key columns, so a later row with
//! the same key replaces the stored one.

use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use indexmap::IndexSet;
use tracing::{debug, info};

use crate::diesel_runtime::database::{Database, DbConnection};
use crate::error::StoreError;
use crate::extraction::Row;
use crate::runtime::RowStore;

#[derive(QueryableByName)]
struct ColumnInfo {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Row store writing into one named table of a SQLite database.
pub struct SqliteRowStore {
    db: Database,
    table: String,
}

impl SqliteRowStore {
    pub fn new(db: Database, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names of the table, empty if it does not exist yet.
    pub fn columns(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.db.get_connection()?;
        existing_columns(&mut conn, &self.table)
    }

    /// Number of rows currently stored.
    pub fn count(&self) -> Result<i64, StoreError> {
        #[derive(QueryableByName)]
        struct Count {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            n: i64,
        }

        let mut conn = self.db.get_connection()?;
        let count: Count = diesel::sql_query(format!("SELECT COUNT(*) AS n FROM {}", quote_ident(&self.table)?))
            .get_result(&mut *conn)?;
        Ok(count.n)
    }

    /// Value of `field` in the stored row whose `key_field` equals `key`.
    pub fn lookup(&self, key_field: &str, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        #[derive(QueryableByName)]
        struct Cell {
            #[diesel(sql_type = diesel::sql_types::Nullable<Text>)]
            value: Option<String>,
        }

        let mut conn = self.db.get_connection()?;
        let sql = format!(
            "SELECT {} AS value FROM {} WHERE {} = ?",
            quote_ident(field)?,
            quote_ident(&self.table)?,
            quote_ident(key_field)?
        );
        let cell: Option<Cell> = diesel::sql_query(sql)
            .bind::<Text, _>(key)
            .get_result(&mut *conn)
            .optional()?;
        Ok(cell.and_then(|c| c.value))
    }
}

impl RowStore for SqliteRowStore {
    fn save(&mut self, unique_keys: &[&str], rows: &[Row]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        for row in rows {
            for key in unique_keys {
                if !row.contains(key) {
                    return Err(StoreError::MissingKey { key: key.to_string() });
                }
            }
        }

        let mut columns: IndexSet<&str> = unique_keys.iter().copied().collect();
        for row in rows {
            columns.extend(row.field_names());
        }

        let table = self.table.clone();
        let mut pooled = self.db.get_connection()?;
        let conn: &mut DbConnection = &mut pooled;
        conn.transaction::<_, StoreError, _>(|conn| {
            ensure_schema(conn, &table, unique_keys, &columns)?;
            for row in rows {
                insert_or_replace(conn, &table, row)?;
            }
            Ok(())
        })?;

        info!("Saved {} rows into table {}", rows.len(), self.table);
        Ok(rows.len())
    }
}

/// Double-quote an identifier for SQLite.
fn quote_ident(name: &str) -> Result<String, StoreError> {
    if name.is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

fn existing_columns(conn: &mut DbConnection, table: &str) -> Result<Vec<String>, StoreError> {
    let columns: Vec<ColumnInfo> = diesel::sql_query("SELECT name FROM pragma_table_info(?)")
        .bind::<Text, _>(table)
        .load(conn)?;
    Ok(columns.into_iter().map(|c| c.name).collect())
}

fn ensure_schema(
    conn: &mut DbConnection,
    table: &str,
    unique_keys: &[&str],
    columns: &IndexSet<&str>,
) -> Result<(), StoreError> {
    let quoted_table = quote_ident(table)?;
    let existing = existing_columns(conn, table)?;

    if existing.is_empty() {
        let defs = columns
            .iter()
            .map(|c| -> Result<String, StoreError> { Ok(format!("{} TEXT", quote_ident(c)?)) })
            .collect::<Result<Vec<_>, _>>()?;
        diesel::sql_query(format!("CREATE TABLE {} ({})", quoted_table, defs.join(", "))).execute(conn)?;
        debug!("Created table {} with {} columns", table, columns.len());
    } else {
        // SQLite column names are case-insensitive
        let known: IndexSet<String> = existing.iter().map(|c| c.to_lowercase()).collect();
        for column in columns {
            if !known.contains(&column.to_lowercase()) {
                diesel::sql_query(format!(
                    "ALTER TABLE {} ADD COLUMN {} TEXT",
                    quoted_table,
                    quote_ident(column)?
                ))
                .execute(conn)?;
                debug!("Added column {} to {}", column, table);
            }
        }
    }

    if !unique_keys.is_empty() {
        let keys = unique_keys
            .iter()
            .map(|k| quote_ident(k))
            .collect::<Result<Vec<_>, _>>()?;
        let index = quote_ident(&format!("{}_{}_unique", table, unique_keys.join("_")))?;
        diesel::sql_query(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            index,
            quoted_table,
            keys.join(", ")
        ))
        .execute(conn)?;
    }

    Ok(())
}

fn insert_or_replace(conn: &mut DbConnection, table: &str, row: &Row) -> Result<(), StoreError> {
    let names = row
        .field_names()
        .map(quote_ident)
        .collect::<Result<Vec<_>, _>>()?;
    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_ident(table)?,
        names.join(", "),
        placeholders
    );

    let mut query = diesel::sql_query(sql).into_boxed::<Sqlite>();
    for (_, value) in row.fields() {
        query = query.bind::<Text, _>(value.to_string());
    }
    query.execute(conn)?;
    Ok(())
}
