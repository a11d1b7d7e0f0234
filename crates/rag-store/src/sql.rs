//! SQLite rendering of typed statements.

use rag_core::{ColumnType, Result, TableDef};

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite storage class for a column type.
pub fn sql_type(column_type: &ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer | ColumnType::Bool => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Text => "TEXT",
        ColumnType::Vector { .. } => "BLOB",
    }
}

/// `CREATE TABLE` with the identifier column as primary key.
pub fn create_table(table: &TableDef) -> Result<String> {
    let identifier = table.identifier()?;

    let columns: Vec<String> = table
        .schema
        .columns()
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(&c.name), sql_type(&c.column_type));
            if c.name == identifier.name {
                def.push_str(" NOT NULL PRIMARY KEY");
            }
            def
        })
        .collect();

    Ok(format!(
        "CREATE TABLE {} ({})",
        quote_ident(&table.name),
        columns.join(", ")
    ))
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn table_exists() -> &'static str {
    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)"
}

pub fn truncate(table: &str) -> String {
    format!("DELETE FROM {}", quote_ident(table))
}

pub fn insert(table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }

    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// `UPDATE`; the key is bound after the assigned values.
pub fn update(table: &str, columns: &[&str], key_column: &str) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote_ident(table),
        assignments.join(", "),
        quote_ident(key_column),
        columns.len() + 1
    )
}

pub fn delete(table: &str, key_column: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote_ident(table),
        quote_ident(key_column)
    )
}

pub fn select(
    table: &str,
    columns: Option<&[String]>,
    filter_column: Option<&str>,
    order_by: Option<&str>,
    limit: Option<usize>,
) -> String {
    let projection = match columns {
        Some(columns) if !columns.is_empty() => columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "*".to_string(),
    };

    let mut sql = format!("SELECT {} FROM {}", projection, quote_ident(table));
    if let Some(column) = filter_column {
        sql.push_str(&format!(" WHERE {} = ?1", quote_ident(column)));
    }
    if let Some(column) = order_by {
        sql.push_str(&format!(" ORDER BY {}", quote_ident(column)));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}
