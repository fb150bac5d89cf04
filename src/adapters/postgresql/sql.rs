//! SQL text for the PostgreSQL adapter
//!
//! Schema and table names come from validated configuration; every value is
//! a bind parameter. Timestamps cross the wire as `YYYY-MM-DD HH24:MI:SS`
//! text in both directions.

use crate::catalog::{
    Field, FieldCatalog, FieldSelection, GENRE, GENRE_FILM_WORK, PERSON, PERSON_FILM_WORK,
};
use crate::domain::timestamp::TIMESTAMP_FORMAT_PG;
use crate::domain::Result;

/// Bind parameter ceiling of the extended query protocol
pub const MAX_BIND_PARAMS: usize = 65_535;

fn qualified(schema: &str, table: &str) -> String {
    format!("{schema}.{table}")
}

/// Phase 1: ids and `updated_at` of changed films, oldest first
///
/// Parameters: `$1` watermark text, `$2` limit.
pub fn changed_ids_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT id::text AS id, TO_CHAR(updated_at, '{fmt}') AS updated_at \
         FROM {film} \
         WHERE updated_at >= to_timestamp($1, '{fmt}') \
         ORDER BY updated_at, id \
         LIMIT $2",
        fmt = TIMESTAMP_FORMAT_PG,
        film = qualified(schema, table),
    )
}

/// Phase 2: one JSON document per film id in `$1`
///
/// Person roles and genres are left-joined and aggregated into nested
/// arrays; each resulting row is wrapped in `row_to_json` and returned as
/// text in column `film`. `$1` is bound as `text[]` and compared as
/// `uuid[]` so the lookup stays on the primary key.
pub fn film_data_query(
    schema: &str,
    table: &str,
    catalog: &FieldCatalog,
    selection: &FieldSelection,
) -> Result<String> {
    let mut exprs = Vec::with_capacity(selection.len());
    for field in selection.fields() {
        let spec = relational(catalog, *field)?;
        exprs.push(spec.select_expr.clone());
    }

    Ok(format!(
        "SELECT row_to_json(agg)::text AS film FROM (\
         SELECT {exprs} \
         FROM {film} fw \
         LEFT JOIN {pfw} pfw ON pfw.film_work_id = fw.id \
         LEFT JOIN {person} p ON p.id = pfw.person_id \
         LEFT JOIN {gfw} gfw ON gfw.film_work_id = fw.id \
         LEFT JOIN {genre} g ON g.id = gfw.genre_id \
         WHERE fw.id = ANY($1::text[]::uuid[]) \
         GROUP BY fw.id\
         ) agg",
        exprs = exprs.join(", "),
        film = qualified(schema, table),
        pfw = qualified(schema, PERSON_FILM_WORK),
        person = qualified(schema, PERSON),
        gfw = qualified(schema, GENRE_FILM_WORK),
        genre = qualified(schema, GENRE),
    ))
}

pub fn create_schema_sql(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {schema}")
}

/// Table DDL restricted to the selected fields
pub fn create_table_sql(
    schema: &str,
    table: &str,
    catalog: &FieldCatalog,
    selection: &FieldSelection,
) -> Result<String> {
    let mut columns = Vec::with_capacity(selection.len());
    for field in selection.fields() {
        columns.push(relational(catalog, *field)?.column_def.clone());
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified(schema, table),
        columns.join(", ")
    ))
}

/// Rows per multi-row statement for a given column count
pub fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

/// Multi-row upsert for `rows` rows
///
/// Every parameter is bound as text and cast to the column's type; on an id
/// conflict all other selected columns are overwritten.
pub fn upsert_sql(
    schema: &str,
    table: &str,
    catalog: &FieldCatalog,
    selection: &FieldSelection,
    rows: usize,
) -> Result<String> {
    let mut casts = Vec::with_capacity(selection.len());
    for field in selection.fields() {
        casts.push(relational(catalog, *field)?.sql_type);
    }

    let width = casts.len();
    let values = (0..rows)
        .map(|row| {
            let placeholders = casts
                .iter()
                .enumerate()
                .map(|(col, cast)| format!("${}::text::{}", row * width + col + 1, cast))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let updates = selection
        .fields()
        .iter()
        .filter(|f| **f != Field::FilmId)
        .map(|f| format!("{col} = EXCLUDED.{col}", col = f.column()))
        .collect::<Vec<_>>();

    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) {}",
        qualified(schema, table),
        selection.columns().join(", "),
        values,
        Field::FilmId.column(),
        conflict
    ))
}

fn relational(catalog: &FieldCatalog, field: Field) -> Result<&crate::catalog::RelationalSpec> {
    catalog.require(field)?.relational.as_ref().ok_or_else(|| {
        crate::domain::ReelError::Mapping(format!(
            "Field '{field}' has no PostgreSQL representation"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendKind;

    fn selection(names: &[&str]) -> FieldSelection {
        FieldCatalog::movies()
            .resolve(names, BackendKind::Postgres, BackendKind::Postgres)
            .unwrap()
    }

    #[test]
    fn test_changed_ids_query_filters_and_orders() {
        let sql = changed_ids_query("content", "film_work");
        assert!(sql.contains("FROM content.film_work"));
        assert!(sql.contains("WHERE updated_at >= to_timestamp($1, 'YYYY-MM-DD HH24:MI:SS')"));
        assert!(sql.contains("ORDER BY updated_at, id"));
        assert!(sql.ends_with("LIMIT $2"));
    }

    #[test]
    fn test_film_data_query_aggregates_selected_fields() {
        let catalog = FieldCatalog::movies();
        let sql = film_data_query(
            "content",
            "film_work",
            &catalog,
            &selection(&["film_id", "title", "genre", "directors", "updated_at"]),
        )
        .unwrap();

        assert!(sql.starts_with("SELECT row_to_json(agg)::text AS film FROM ("));
        assert!(sql.contains("fw.id::text AS id, fw.title, JSON_AGG(DISTINCT"));
        assert!(sql.contains("FILTER (WHERE pfw.role = 'director') AS directors"));
        assert!(!sql.contains("'actor'"));
        assert!(sql.contains("TO_CHAR(fw.updated_at, 'YYYY-MM-DD HH24:MI:SS') AS updated_at"));
        assert!(sql.contains("LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id"));
        assert!(sql.contains("WHERE fw.id = ANY($1::text[]::uuid[]) GROUP BY fw.id"));
        assert!(!sql.contains("fw.id::text = ANY"));
    }

    #[test]
    fn test_create_table_uses_catalog_ddl() {
        let catalog = FieldCatalog::movies();
        let sql = create_table_sql(
            "content",
            "film_work",
            &catalog,
            &selection(&["film_id", "title", "actors", "rating"]),
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS content.film_work (id uuid NOT NULL PRIMARY KEY, \
             title TEXT NOT NULL, actors json NOT NULL, rating FLOAT)"
        );
        assert_eq!(create_schema_sql("content"), "CREATE SCHEMA IF NOT EXISTS content");
    }

    #[test]
    fn test_upsert_sql_numbers_placeholders_per_row() {
        let catalog = FieldCatalog::movies();
        let sql = upsert_sql(
            "content",
            "film_work",
            &catalog,
            &selection(&["film_id", "title", "genre"]),
            2,
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO content.film_work (id, title, genre) VALUES \
             ($1::text::uuid, $2::text::text, $3::text::json), \
             ($4::text::uuid, $5::text::text, $6::text::json) \
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, genre = EXCLUDED.genre"
        );
    }

    #[test]
    fn test_upsert_with_only_id_does_nothing_on_conflict() {
        let catalog = FieldCatalog::movies();
        let sql = upsert_sql("s", "t", &catalog, &selection(&["film_id"]), 1).unwrap();
        assert!(sql.ends_with("ON CONFLICT (id) DO NOTHING"));
    }

    #[test]
    fn test_rows_per_statement_respects_parameter_limit() {
        assert_eq!(rows_per_statement(11), 5957);
        assert!(rows_per_statement(11) * 11 <= MAX_BIND_PARAMS);
        assert_eq!(rows_per_statement(0), MAX_BIND_PARAMS);
    }
}
