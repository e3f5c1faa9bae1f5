//! DDL and DML generation for field-group tables.
//!
//! Every table and column name is checked against the identifier
//! allow-list and double-quoted before it is interpolated; data values are
//! never interpolated and travel as bound parameters. Defaults are already
//! encoded SQL literals (see [`encode_default`](acf_tables_core::encode_default)).
//!
//! # Table structure
//!
//! One table per field group, keyed by the content identifier:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "wp_faq" ("post_id" INTEGER NOT NULL PRIMARY KEY);
//! ALTER TABLE "wp_faq" ADD COLUMN "title" VARCHAR(255) DEFAULT 'Untitled';
//! ```

use acf_tables_core::{ColumnInfo, ColumnSpec, validate_identifier};

use crate::error::{Result, SqliteError};

/// Suffix of the scratch table used while rebuilding a table.
pub(crate) const REBUILD_SUFFIX: &str = "__rebuild";

/// Validates that a table prefix is empty or passes the identifier allow-list.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    validate_identifier(prefix).map_err(|_| SqliteError::InvalidPrefix(prefix.to_string()))
}

/// Validates an identifier and wraps it in double quotes.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidIdentifier`] for names outside the
/// allow-list.
pub fn quote_identifier(ident: &str) -> Result<String> {
    validate_identifier(ident)?;
    Ok(format!("\"{ident}\""))
}

/// Renders a column definition: quoted name, type and optional default.
pub fn column_definition(spec: &ColumnSpec) -> Result<String> {
    let mut sql = format!("{} {}", quote_identifier(&spec.name)?, spec.sql_type.to_sql());
    if let Some(default) = &spec.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    Ok(sql)
}

/// Generates the statement creating a table that holds only the key column.
pub fn create_table_sql(table: &str, key_column: &str) -> Result<String> {
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({} INTEGER NOT NULL PRIMARY KEY)",
        quote_identifier(table)?,
        quote_identifier(key_column)?
    ))
}

/// Generates the statement adding one column.
pub fn add_column_sql(table: &str, spec: &ColumnSpec) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_identifier(table)?,
        column_definition(spec)?
    ))
}

/// Generates the statements that rebuild `table` with `spec` replacing the
/// definition of the column of the same name.
///
/// SQLite cannot change a column's type in place, so the table is copied
/// into `<table>__rebuild`, dropped, and the copy renamed. The statements
/// must run inside one transaction.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidDefinition`] if `spec` names a column not
/// in `columns`, or names the primary key.
pub fn rebuild_table_sql(table: &str, columns: &[ColumnInfo], spec: &ColumnSpec) -> Result<Vec<String>> {
    let quoted = quote_identifier(table)?;
    // Derived from a validated name; may exceed the length limit.
    let scratch = format!("\"{table}{REBUILD_SUFFIX}\"");

    match columns.iter().find(|c| c.name == spec.name) {
        None => {
            return Err(SqliteError::InvalidDefinition(format!(
                "column '{}' does not exist on '{}'",
                spec.name, table
            )));
        }
        Some(column) if column.primary_key => {
            return Err(SqliteError::InvalidDefinition(format!(
                "column '{}' is the primary key of '{}'",
                spec.name, table
            )));
        }
        Some(_) => {}
    }

    let mut definitions = Vec::with_capacity(columns.len());
    let mut names = Vec::with_capacity(columns.len());
    for column in columns {
        let name = quote_identifier(&column.name)?;
        if column.name == spec.name {
            definitions.push(column_definition(spec)?);
        } else {
            let mut definition = format!("{name} {}", column.declared_type);
            if column.primary_key {
                definition.push_str(" NOT NULL PRIMARY KEY");
            }
            if let Some(default) = &column.default {
                definition.push_str(" DEFAULT ");
                definition.push_str(default);
            }
            definitions.push(definition);
        }
        names.push(name);
    }
    let names = names.join(", ");

    Ok(vec![
        format!("DROP TABLE IF EXISTS {scratch}"),
        format!("CREATE TABLE {scratch} ({})", definitions.join(", ")),
        format!("INSERT INTO {scratch} ({names}) SELECT {names} FROM {quoted}"),
        format!("DROP TABLE {quoted}"),
        format!("ALTER TABLE {scratch} RENAME TO {quoted}"),
    ])
}

/// Generates an upsert touching only the key column and `columns`.
///
/// Parameter `?1` is the key; `?2..` follow `columns` in order. On a key
/// conflict exactly the supplied columns are overwritten.
///
/// # Examples
///
/// ```
/// use acf_tables_sqlite::schema::upsert_sql;
///
/// let sql = upsert_sql("wp_faq", "post_id", &["title"]).unwrap();
/// assert_eq!(
///     sql,
///     "INSERT INTO \"wp_faq\" (\"post_id\", \"title\") VALUES (?1, ?2) \
///      ON CONFLICT(\"post_id\") DO UPDATE SET \"title\" = excluded.\"title\""
/// );
/// ```
pub fn upsert_sql(table: &str, key_column: &str, columns: &[&str]) -> Result<String> {
    let table = quote_identifier(table)?;
    let key = quote_identifier(key_column)?;
    let quoted = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<_>>>()?;

    let mut names = vec![key.clone()];
    names.extend(quoted.iter().cloned());
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();

    let conflict = if quoted.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let assignments: Vec<String> = quoted
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        format!("DO UPDATE SET {}", assignments.join(", "))
    };

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT({key}) {conflict}",
        names.join(", "),
        placeholders.join(", ")
    ))
}

/// Generates the single-cell read for `column` of one row.
pub fn select_cell_sql(table: &str, key_column: &str, column: &str) -> Result<String> {
    Ok(format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        quote_identifier(column)?,
        quote_identifier(table)?,
        quote_identifier(key_column)?
    ))
}
