//! SQLite adapter implementing [`MovieBackend`]

use crate::adapters::backend::{Extraction, LoadAck, LoadBatch, MovieBackend, RawRecord};
use crate::adapters::sqlite::sql;
use crate::catalog::{Field, FieldCatalog, FieldSelection, ASSOCIATION_TABLES};
use crate::config::schema::SqliteConfig;
use crate::core::transform::to_row;
use crate::domain::{BackendKind, MovieRecord, ReelError, Result, SyncTimestamp};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/// SQLite implementation of [`MovieBackend`]
///
/// Every call opens its own connection on a blocking thread; the file is the
/// only shared state.
pub struct SqliteAdapter {
    path: PathBuf,
    table: String,
    catalog: FieldCatalog,
}

impl SqliteAdapter {
    pub fn new(config: &SqliteConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            table: config.table.clone(),
            catalog: FieldCatalog::movies(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run `f` against a fresh connection off the async runtime
    async fn with_connection<T, F>(&self, create: bool, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let flags = if create {
                OpenFlags::default()
            } else {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX
            };
            let mut conn = Connection::open_with_flags(&path, flags).map_err(|e| {
                ReelError::Database(format!("Failed to open {}: {e}", path.display()))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| ReelError::Other(format!("SQLite worker failed: {e}")))?
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Select lists for both source layouts; one is picked per read
struct SelectLists {
    flat: String,
    aggregate: String,
}

fn has_association_tables(conn: &Connection) -> rusqlite::Result<bool> {
    let found: i64 = conn.query_row(&sql::association_tables_query(), [], |row| row.get(0))?;
    Ok(found == ASSOCIATION_TABLES.len() as i64)
}

fn extract_blocking(
    conn: &Connection,
    table: &str,
    watermark: &str,
    limit: i64,
    selection: &FieldSelection,
    lists: &SelectLists,
) -> rusqlite::Result<(Vec<RawRecord>, Option<String>)> {
    let normalized = has_association_tables(conn)?;
    tracing::debug!(table, normalized, "Reading SQLite film table");
    let select_list = if normalized {
        &lists.aggregate
    } else {
        &lists.flat
    };

    let mut changed = conn.prepare(&sql::changed_ids_query(table))?;
    let pairs = changed
        .query_map(rusqlite::params![watermark, limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let last_updated = pairs.last().and_then(|(_, updated)| updated.clone());
    let ids: Vec<String> = pairs.into_iter().map(|(id, _)| id).collect();

    let columns = selection.columns();
    let mut by_id: HashMap<String, RawRecord> = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(sql::IDS_PER_LOOKUP) {
        let mut stmt = conn.prepare(&sql::rows_by_id_query(table, select_list, chunk.len()))?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            let mut record = RawRecord::new();
            for (i, column) in columns.iter().enumerate() {
                record.insert((*column).to_string(), json_value(row.get_ref(i)?));
            }
            Ok(record)
        })?;
        for record in rows {
            let record = record?;
            let id = record
                .get(Field::FilmId.column())
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(id) = id {
                by_id.insert(id, record);
            }
        }
    }

    let records = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    Ok((records, last_updated))
}

fn load_blocking(
    conn: &mut Connection,
    table: &str,
    selection: &FieldSelection,
    rows: &[Vec<Option<String>>],
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql::upsert_sql(table, selection))?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
    }
    tx.commit()
}

#[async_trait]
impl MovieBackend for SqliteAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn describe(&self) -> String {
        format!("sqlite://{} ({})", self.path.display(), self.table)
    }

    async fn test_connection(&self) -> Result<()> {
        self.with_connection(false, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await?;
        tracing::info!(path = %self.path.display(), "SQLite connection test successful");
        Ok(())
    }

    async fn extract(
        &self,
        watermark: SyncTimestamp,
        chunk_size: usize,
        selection: &FieldSelection,
    ) -> Result<Extraction> {
        let limit = i64::try_from(chunk_size)
            .map_err(|_| ReelError::Configuration(format!("chunk_size {chunk_size} too large")))?;
        let table = self.table.clone();
        let owned_selection = selection.clone();
        let wm = watermark.to_string();
        let lists = SelectLists {
            flat: sql::flat_select_list(selection),
            aggregate: sql::aggregate_select_list(&self.catalog, selection)?,
        };

        let (records, last_updated) = self
            .with_connection(false, move |conn| {
                extract_blocking(conn, &table, &wm, limit, &owned_selection, &lists)
                    .map_err(|e| ReelError::Extraction(format!("SQLite read failed: {e}")))
            })
            .await?;

        let watermark_candidate = last_updated
            .map(|ts| SyncTimestamp::parse(&ts).map_err(ReelError::Extraction))
            .transpose()?;

        tracing::info!(
            count = records.len(),
            table = %self.table,
            watermark = %watermark,
            "Extracted changed films from SQLite"
        );

        Ok(Extraction {
            records,
            watermark_candidate,
        })
    }

    async fn ensure_schema(&self, selection: &FieldSelection) -> Result<()> {
        let mut statements = vec![sql::create_table_sql(&self.table, &self.catalog, selection)?];
        if selection.contains(Field::UpdatedAt) {
            statements.push(sql::create_updated_at_index_sql(&self.table));
        }

        self.with_connection(true, move |conn| {
            for statement in &statements {
                conn.execute_batch(statement)
                    .map_err(|e| ReelError::Provisioning(format!("{statement}: {e}")))?;
            }
            Ok(())
        })
        .await?;

        tracing::info!(table = %self.table, "SQLite table ready");
        Ok(())
    }

    fn transform_for_load(
        &self,
        records: &[MovieRecord],
        selection: &FieldSelection,
    ) -> Result<LoadBatch> {
        records
            .iter()
            .map(|record| to_row(record, selection))
            .collect::<Result<Vec<_>>>()
            .map(LoadBatch::Rows)
    }

    async fn load(&self, batch: LoadBatch, selection: &FieldSelection) -> Result<LoadAck> {
        let LoadBatch::Rows(rows) = batch else {
            return Err(ReelError::Load("SQLite loads expect flat rows".to_string()));
        };
        if rows.is_empty() {
            return Ok(LoadAck { loaded: 0 });
        }

        let loaded = rows.len();
        let table = self.table.clone();
        let owned_selection = selection.clone();
        self.with_connection(false, move |conn| {
            load_blocking(conn, &table, &owned_selection, &rows)
                .map_err(|e| ReelError::Load(format!("Upsert into {table} failed: {e}")))
        })
        .await?;

        tracing::info!(loaded, table = %self.table, "Upserted films into SQLite");
        Ok(LoadAck { loaded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transform::to_canonical;
    use crate::domain::{Genre, Person};
    use tempfile::TempDir;

    fn adapter(dir: &TempDir) -> SqliteAdapter {
        SqliteAdapter::new(&SqliteConfig {
            path: dir.path().join("movies.db").to_string_lossy().into_owned(),
            table: "film_work".to_string(),
        })
    }

    fn selection() -> FieldSelection {
        FieldCatalog::movies()
            .resolve(
                &["film_id", "title", "rating", "genre", "actors", "updated_at"],
                BackendKind::Sqlite,
                BackendKind::Sqlite,
            )
            .unwrap()
    }

    fn film(id: &str, title: &str, updated: &str) -> MovieRecord {
        let mut record = MovieRecord::new(crate::domain::FilmId::new(id).unwrap());
        record.title = Some(title.to_string());
        record.rating = Some(7.5);
        record.updated_at = Some(SyncTimestamp::parse(updated).unwrap());
        record.genre = Some(vec![Genre::new("g1", "Drama")]);
        record.actors = Some(vec![Person::new("a1", "Ann")]);
        record
    }

    async fn load(db: &SqliteAdapter, records: &[MovieRecord]) -> LoadAck {
        let sel = selection();
        db.ensure_schema(&sel).await.unwrap();
        let batch = db.transform_for_load(records, &sel).unwrap();
        db.load(batch, &sel).await.unwrap()
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);
        db.ensure_schema(&selection()).await.unwrap();
        db.ensure_schema(&selection()).await.unwrap();
        db.test_connection().await.unwrap();
    }

    #[tokio::test]
    async fn test_load_then_extract_in_updated_order() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);
        let ack = load(
            &db,
            &[
                film("f2", "Second", "2024-01-02 00:00:00"),
                film("f1", "First", "2024-01-01 00:00:00"),
            ],
        )
        .await;
        assert_eq!(ack.loaded, 2);

        let extraction = db
            .extract(SyncTimestamp::min(), 10, &selection())
            .await
            .unwrap();
        assert_eq!(extraction.len(), 2);
        assert_eq!(extraction.records[0]["id"], "f1");
        assert_eq!(extraction.records[1]["title"], "Second");
        assert_eq!(extraction.records[0]["rating"], 7.5);
        assert_eq!(
            extraction.watermark_candidate,
            Some(SyncTimestamp::parse("2024-01-02 00:00:00").unwrap())
        );
    }

    #[tokio::test]
    async fn test_extract_respects_watermark_and_limit() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);
        let films: Vec<_> = (0..15)
            .map(|i| film(&format!("f{i:02}"), "T", &format!("2024-01-01 00:00:{i:02}")))
            .collect();
        load(&db, &films).await;

        let first = db
            .extract(SyncTimestamp::min(), 10, &selection())
            .await
            .unwrap();
        assert_eq!(first.len(), 10);
        let boundary = first.watermark_candidate.unwrap();
        assert_eq!(boundary.to_string(), "2024-01-01 00:00:09");

        let second = db.extract(boundary, 10, &selection()).await.unwrap();
        assert_eq!(second.len(), 6);
        assert_eq!(second.records[0]["id"], "f09");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_row() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);
        load(&db, &[film("f1", "Old", "2024-01-01 00:00:00")]).await;
        load(&db, &[film("f1", "New", "2024-01-03 00:00:00")]).await;

        let extraction = db
            .extract(SyncTimestamp::min(), 10, &selection())
            .await
            .unwrap();
        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.records[0]["title"], "New");
        assert_eq!(
            extraction.records[0]["genre"],
            r#"[{"id":"g1","name":"Drama"}]"#
        );
    }

    const NORMALIZED_SCHEMA: &str = "
        CREATE TABLE film_work (id TEXT PRIMARY KEY, title TEXT NOT NULL, type TEXT, updated_at TEXT);
        CREATE TABLE genre (id TEXT PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE genre_film_work (id TEXT PRIMARY KEY, film_work_id TEXT, genre_id TEXT);
        CREATE TABLE person (id TEXT PRIMARY KEY, full_name TEXT NOT NULL);
        CREATE TABLE person_film_work (id TEXT PRIMARY KEY, film_work_id TEXT, person_id TEXT, role TEXT);

        INSERT INTO film_work VALUES
            ('f1', 'Star Trek', 'movie', '2021-06-16 20:14:09.221838+00'),
            ('f2', 'Solaris', 'movie', '2021-06-17 08:00:00.5+00');
        INSERT INTO genre VALUES ('g1', 'Drama');
        INSERT INTO genre_film_work VALUES ('gf1', 'f1', 'g1');
        INSERT INTO person VALUES ('p1', 'Ann Actor'), ('p2', 'Bob Actor'), ('p3', 'Wes Writer');
        INSERT INTO person_film_work VALUES
            ('pf1', 'f1', 'p2', 'actor'),
            ('pf2', 'f1', 'p1', 'actor'),
            ('pf3', 'f1', 'p3', 'writer');
    ";

    #[tokio::test]
    async fn test_extract_aggregates_normalized_tables() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);
        Connection::open(&db.path)
            .unwrap()
            .execute_batch(NORMALIZED_SCHEMA)
            .unwrap();

        let sel = FieldCatalog::movies()
            .resolve(
                &["film_id", "title", "genre", "actors", "directors", "updated_at"],
                BackendKind::Sqlite,
                BackendKind::Sqlite,
            )
            .unwrap();
        let extraction = db.extract(SyncTimestamp::min(), 10, &sel).await.unwrap();

        assert_eq!(extraction.len(), 2);
        assert_eq!(
            extraction.watermark_candidate,
            Some(SyncTimestamp::parse("2021-06-17 08:00:00").unwrap())
        );

        let first = to_canonical(&extraction.records[0], &sel).unwrap();
        assert_eq!(first.film_id.as_str(), "f1");
        assert_eq!(first.title.as_deref(), Some("Star Trek"));
        assert_eq!(
            first.updated_at,
            Some(SyncTimestamp::parse("2021-06-16 20:14:09").unwrap())
        );

        let mut actors = first.actors.unwrap();
        actors.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(
            actors,
            vec![Person::new("p1", "Ann Actor"), Person::new("p2", "Bob Actor")]
        );
        assert_eq!(first.genre, Some(vec![Genre::new("g1", "Drama")]));
        assert_eq!(first.directors, Some(vec![]));

        let second = to_canonical(&extraction.records[1], &sel).unwrap();
        assert_eq!(second.genre, Some(vec![]));
        assert_eq!(second.actors, Some(vec![]));
    }

    #[tokio::test]
    async fn test_test_connection_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);

        let err = db.test_connection().await.unwrap_err();
        assert!(matches!(err, ReelError::Database(_)));
        assert!(!db.path.exists());
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let db = adapter(&dir);
        let err = db
            .extract(SyncTimestamp::min(), 10, &selection())
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Database(_)));
    }
}
