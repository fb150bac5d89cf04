//! SQL text for the SQLite adapter
//!
//! A source film table is read one of two ways. Tables Reel wrote hold every
//! field as a column, nested lists as JSON text. A normalized schema keeps
//! people and genres in association tables next to the film table, and those
//! lists are aggregated per film with `json_group_array`.

use crate::catalog::{EmbeddedSpec, Field, FieldCatalog, FieldSelection, ASSOCIATION_TABLES};
use crate::domain::{ReelError, Result};

/// Ids per `IN (...)` lookup, under the historic 999 variable ceiling
pub const IDS_PER_LOOKUP: usize = 900;

/// Number of association tables present in the database file
pub fn association_tables_query() -> String {
    let names = ASSOCIATION_TABLES
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN ({names})")
}

/// Phase 1: ids and `updated_at` of changed films, oldest first
///
/// Parameters: `?1` watermark text, `?2` limit. `updated_at` is cut to whole
/// seconds since normalized tables may carry fractions and an offset.
pub fn changed_ids_query(table: &str) -> String {
    format!(
        "SELECT id, substr(updated_at, 1, 19) FROM {table} \
         WHERE updated_at >= ?1 \
         ORDER BY updated_at, id \
         LIMIT ?2"
    )
}

/// Select list for a table Reel wrote
pub fn flat_select_list(selection: &FieldSelection) -> String {
    selection.columns().join(", ")
}

/// Select list aggregating a normalized schema, in selection order
pub fn aggregate_select_list(catalog: &FieldCatalog, selection: &FieldSelection) -> Result<String> {
    let mut exprs = Vec::with_capacity(selection.len());
    for field in selection.fields() {
        exprs.push(embedded(catalog, *field)?.aggregate_expr.clone());
    }
    Ok(exprs.join(", "))
}

/// Phase 2: `select_list` for `count` films by id, film table aliased `fw`
pub fn rows_by_id_query(table: &str, select_list: &str, count: usize) -> String {
    let placeholders = (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {select_list} FROM {table} fw WHERE fw.id IN ({placeholders})")
}

fn embedded(catalog: &FieldCatalog, field: Field) -> Result<&EmbeddedSpec> {
    catalog
        .require(field)?
        .embedded
        .as_ref()
        .ok_or_else(|| ReelError::Mapping(format!("Field '{field}' has no SQLite representation")))
}

/// Table DDL restricted to the selected fields
pub fn create_table_sql(
    table: &str,
    catalog: &FieldCatalog,
    selection: &FieldSelection,
) -> Result<String> {
    let mut columns = Vec::with_capacity(selection.len());
    for field in selection.fields() {
        columns.push(embedded(catalog, *field)?.column_def.clone());
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        columns.join(", ")
    ))
}

/// Index backing the changed-ids scan
pub fn create_updated_at_index_sql(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS {table}_updated_at_idx ON {table} (updated_at)")
}

/// Single-row upsert keyed by id
pub fn upsert_sql(table: &str, selection: &FieldSelection) -> String {
    let columns = selection.columns();
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let updates = selection
        .fields()
        .iter()
        .filter(|f| **f != Field::FilmId)
        .map(|f| format!("{col} = excluded.{col}", col = f.column()))
        .collect::<Vec<_>>();

    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT(id) {conflict}",
        columns.join(", ")
    )
}
