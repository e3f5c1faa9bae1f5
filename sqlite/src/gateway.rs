//! Relational gateway: the store operations the engine needs.
//!
//! [`Gateway`] is the seam between schema/value logic and the physical
//! store. Table names passed through it are logical (as declared by the
//! field group); the gateway applies its table prefix. [`SqliteGateway`]
//! implements it over a borrowed [`rusqlite::Connection`].
//!
//! # Example
//!
//! ```
//! use acf_tables_core::{ColumnSpec, SqlType, SqlValue};
//! use acf_tables_sqlite::{Gateway, SqliteGateway};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let gateway = SqliteGateway::new(&conn, "wp_").unwrap();
//!
//! gateway.create_table("faq").unwrap();
//! gateway.add_column("faq", &ColumnSpec::new("title", SqlType::Varchar(255), None)).unwrap();
//! gateway.upsert_row("faq", 7, &[("title".into(), SqlValue::from("Hello"))]).unwrap();
//!
//! assert_eq!(gateway.list_tables().unwrap(), vec!["faq".to_string()]);
//! assert_eq!(
//!     gateway.read_cell("faq", "title", 7).unwrap(),
//!     Some(SqlValue::from("Hello"))
//! );
//! ```

use acf_tables_core::{ColumnInfo, ColumnSpec, SqlValue, validate_identifier};
use acf_tables_db::StoreConfig;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use tracing::{debug, info};

use crate::error::{Result, SqliteError};
use crate::schema::{
    add_column_sql, create_table_sql, rebuild_table_sql, select_cell_sql, upsert_sql,
    validate_prefix,
};

/// Store operations used by the synchronizer and the value pipelines.
///
/// Implementations must validate every identifier before issuing SQL and
/// bind every data value as a parameter.
pub trait Gateway {
    /// Creates `table` with only the content-id key column. Idempotent.
    fn create_table(&self, table: &str) -> Result<()>;

    /// Adds one column to an existing table.
    fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()>;

    /// Changes the type and default of an existing column, keeping data.
    fn alter_column(&self, table: &str, column: &ColumnSpec) -> Result<()>;

    /// Lists the logical names of the tables managed by this gateway.
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Lists the columns of `table`, optionally only the one named `column`.
    ///
    /// A missing table yields an empty list.
    fn list_columns(&self, table: &str, column: Option<&str>) -> Result<Vec<ColumnInfo>>;

    /// Inserts a row, or updates exactly `values` when the key exists.
    fn upsert_row(&self, table: &str, content_id: i64, values: &[(String, SqlValue)]) -> Result<()>;

    /// Reads one cell; `None` when no row exists for `content_id`.
    ///
    /// A missing table or column is an error, not an empty cell.
    fn read_cell(&self, table: &str, column: &str, content_id: i64) -> Result<Option<SqlValue>>;

    /// Returns `true` if `table` exists.
    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.list_tables()?.iter().any(|t| t == table))
    }
}

/// [`Gateway`] over a borrowed SQLite connection.
///
/// SQLite has no `ALTER COLUMN`; [`alter_column`](Gateway::alter_column)
/// rebuilds the table inside a transaction instead.
pub struct SqliteGateway<'a> {
    conn: &'a Connection,
    prefix: String,
    key_column: String,
}

impl<'a> SqliteGateway<'a> {
    /// Creates a gateway with the given table prefix and a `post_id` key.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPrefix`](crate::SqliteError::InvalidPrefix) if the prefix contains invalid
    /// characters.
    pub fn new(conn: &'a Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self {
            conn,
            prefix,
            key_column: "post_id".to_string(),
        })
    }

    /// Creates a gateway from store settings.
    pub fn from_config(conn: &'a Connection, config: &StoreConfig) -> Result<Self> {
        Self::new(conn, config.table_prefix.clone())?
            .with_content_id_column(config.content_id_column.clone())
    }

    /// Overrides the key column name.
    pub fn with_content_id_column(mut self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        validate_identifier(&column)?;
        self.key_column = column;
        Ok(self)
    }

    /// Returns the table prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the key column name.
    pub fn content_id_column(&self) -> &str {
        &self.key_column
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    /// Maps a logical table name to its prefixed physical name.
    fn physical(&self, table: &str) -> Result<String> {
        validate_identifier(table)?;
        let name = format!("{}{}", self.prefix, table);
        validate_identifier(&name)?;
        Ok(name)
    }
}

impl Gateway for SqliteGateway<'_> {
    fn create_table(&self, table: &str) -> Result<()> {
        let sql = create_table_sql(&self.physical(table)?, &self.key_column)?;
        info!(table, "creating table");
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
        let sql = add_column_sql(&self.physical(table)?, column)?;
        info!(table, column = %column.name, sql_type = %column.sql_type, "adding column");
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    fn alter_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
        let physical = self.physical(table)?;
        let columns = self.list_columns(table, None)?;
        let statements = rebuild_table_sql(&physical, &columns, column)?;
        info!(table, column = %column.name, sql_type = %column.sql_type, "rebuilding table to alter column");

        let tx = self.conn.unchecked_transaction()?;
        for statement in &statements {
            tx.execute_batch(statement)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(names
            .into_iter()
            .filter_map(|name| name.strip_prefix(self.prefix.as_str()).map(String::from))
            .filter(|name| !name.is_empty() && !name.ends_with(crate::schema::REBUILD_SUFFIX))
            .collect())
    }

    fn list_columns(&self, table: &str, column: Option<&str>) -> Result<Vec<ColumnInfo>> {
        let physical = self.physical(table)?;
        let mut stmt = self.conn.prepare(
            "SELECT name, type, dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map([&physical], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    default: row.get(2)?,
                    primary_key: row.get::<_, i64>(3)? > 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(match column {
            Some(name) => columns.into_iter().filter(|c| c.name == name).collect(),
            None => columns,
        })
    }

    fn upsert_row(&self, table: &str, content_id: i64, values: &[(String, SqlValue)]) -> Result<()> {
        let physical = self.physical(table)?;
        let columns: Vec<&str> = values.iter().map(|(name, _)| name.as_str()).collect();
        let sql = upsert_sql(&physical, &self.key_column, &columns)?;

        let params = std::iter::once(SqliteValue::Integer(content_id))
            .chain(values.iter().map(|(_, value)| to_sqlite(value)));
        debug!(table, content_id, columns = values.len(), "upserting row");
        self.conn.execute(&sql, params_from_iter(params))?;
        Ok(())
    }

    fn read_cell(&self, table: &str, column: &str, content_id: i64) -> Result<Option<SqlValue>> {
        // SQLite reads an unknown double-quoted name as a string literal.
        if self.list_columns(table, Some(column))?.is_empty() {
            return Err(SqliteError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        let sql = select_cell_sql(&self.physical(table)?, &self.key_column, column)?;
        let value = self
            .conn
            .query_row(&sql, [content_id], |row| Ok(from_sqlite(row.get_ref(0)?)))
            .optional()?;
        Ok(value)
    }
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(i) => SqliteValue::Integer(*i),
        SqlValue::Real(f) => SqliteValue::Real(*f),
        SqlValue::Text(s) => SqliteValue::Text(s.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acf_tables_core::SqlType;

    fn gateway(conn: &Connection) -> SqliteGateway<'_> {
        let gateway = SqliteGateway::new(conn, "wp_").unwrap();
        gateway.create_table("faq").unwrap();
        gateway
    }

    #[test]
    fn test_new_validates_prefix() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteGateway::new(&conn, "wp_").is_ok());
        assert!(SqliteGateway::new(&conn, "").is_ok());
        assert!(matches!(
            SqliteGateway::new(&conn, "wp; --"),
            Err(SqliteError::InvalidPrefix(_))
        ));
        assert!(
            SqliteGateway::new(&conn, "wp_")
                .unwrap()
                .with_content_id_column("id\"")
                .is_err()
        );
    }

    #[test]
    fn test_create_table_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = gateway(&conn);
        gateway.create_table("faq").unwrap();

        assert!(gateway.table_exists("faq").unwrap());
        let columns = gateway.list_columns("faq", None).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "post_id");
        assert!(columns[0].primary_key);
    }

    #[test]
    fn test_list_tables_only_reports_prefixed_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE other (id INTEGER)").unwrap();
        let gateway = gateway(&conn);
        assert_eq!(gateway.list_tables().unwrap(), vec!["faq".to_string()]);
    }

    #[test]
    fn test_list_columns_filter_and_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = gateway(&conn);
        gateway
            .add_column(
                "faq",
                &ColumnSpec::new("title", SqlType::Varchar(80), Some("'x'".into())),
            )
            .unwrap();

        let title = gateway.list_columns("faq", Some("title")).unwrap();
        assert_eq!(title.len(), 1);
        assert_eq!(title[0].declared_type, "VARCHAR(80)");
        assert_eq!(title[0].default.as_deref(), Some("'x'"));

        assert!(gateway.list_columns("missing", None).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_updates_only_supplied_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = gateway(&conn);
        for name in ["a", "b"] {
            gateway
                .add_column("faq", &ColumnSpec::new(name, SqlType::Text, None))
                .unwrap();
        }

        gateway
            .upsert_row(
                "faq",
                1,
                &[("a".into(), "one".into()), ("b".into(), "two".into())],
            )
            .unwrap();
        gateway
            .upsert_row("faq", 1, &[("a".into(), "uno".into())])
            .unwrap();

        assert_eq!(gateway.read_cell("faq", "a", 1).unwrap(), Some("uno".into()));
        assert_eq!(gateway.read_cell("faq", "b", 1).unwrap(), Some("two".into()));
        assert_eq!(gateway.read_cell("faq", "a", 2).unwrap(), None);
    }

    #[test]
    fn test_alter_column_changes_type_and_keeps_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = gateway(&conn);
        gateway
            .add_column("faq", &ColumnSpec::new("body", SqlType::Varchar(255), None))
            .unwrap();
        gateway
            .upsert_row("faq", 3, &[("body".into(), "kept".into())])
            .unwrap();

        gateway
            .alter_column("faq", &ColumnSpec::new("body", SqlType::Text, None))
            .unwrap();

        let body = gateway.list_columns("faq", Some("body")).unwrap();
        assert_eq!(body[0].declared_type, "TEXT");
        assert_eq!(gateway.read_cell("faq", "body", 3).unwrap(), Some("kept".into()));
        assert_eq!(gateway.list_tables().unwrap(), vec!["faq".to_string()]);
        assert!(gateway.list_columns("faq", Some("post_id")).unwrap()[0].primary_key);
    }

    #[test]
    fn test_invalid_column_is_rejected_before_sql() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = gateway(&conn);
        let result = gateway.add_column(
            "faq",
            &ColumnSpec::new("x TEXT); DROP TABLE wp_faq; --", SqlType::Text, None),
        );
        assert!(matches!(result, Err(SqliteError::InvalidIdentifier(_))));
        assert!(gateway.table_exists("faq").unwrap());
    }

    #[test]
    fn test_read_missing_column_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = gateway(&conn);
        gateway.upsert_row("faq", 1, &[]).unwrap();

        let result = gateway.read_cell("faq", "seo_title", 1);
        assert!(matches!(
            result,
            Err(SqliteError::UnknownColumn { ref column, .. }) if column == "seo_title"
        ));
        assert!(gateway.read_cell("missing", "title", 1).is_err());
    }
}
