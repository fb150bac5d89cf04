//! Field catalog
//!
//! The single table that maps each logical movie field to its physical
//! representation in every backend kind: the Postgres extraction expression
//! and column definition, the Elasticsearch mapping, and the SQLite column
//! definition plus its aggregation over normalized tables. Field selections are resolved against this table once, before
//! any I/O, so adapters never look up physical names ad hoc.

use crate::domain::timestamp::{TIMESTAMP_FORMAT_ES, TIMESTAMP_FORMAT_PG};
use crate::domain::{BackendKind, ReelError, Result};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Association tables of a normalized movie schema
pub const PERSON_FILM_WORK: &str = "person_film_work";
pub const PERSON: &str = "person";
pub const GENRE_FILM_WORK: &str = "genre_film_work";
pub const GENRE: &str = "genre";

pub const ASSOCIATION_TABLES: [&str; 4] = [PERSON_FILM_WORK, PERSON, GENRE_FILM_WORK, GENRE];

/// Logical movie field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    FilmId,
    Title,
    Description,
    Rating,
    FilmType,
    CreatedAt,
    UpdatedAt,
    Genre,
    Actors,
    Writers,
    Directors,
}

impl Field {
    /// Every logical field, in catalog order
    pub const ALL: [Field; 11] = [
        Field::FilmId,
        Field::Title,
        Field::Description,
        Field::Rating,
        Field::FilmType,
        Field::CreatedAt,
        Field::UpdatedAt,
        Field::Genre,
        Field::Actors,
        Field::Writers,
        Field::Directors,
    ];

    /// Logical name used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Field::FilmId => "film_id",
            Field::Title => "title",
            Field::Description => "description",
            Field::Rating => "rating",
            Field::FilmType => "film_type",
            Field::CreatedAt => "created_at",
            Field::UpdatedAt => "updated_at",
            Field::Genre => "genre",
            Field::Actors => "actors",
            Field::Writers => "writers",
            Field::Directors => "directors",
        }
    }

    /// Physical column / document key, identical across backends
    pub fn column(&self) -> &'static str {
        match self {
            Field::FilmId => "id",
            Field::FilmType => "type",
            other => other.name(),
        }
    }

    /// Field carrying a nested list (genre or a person role)
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            Field::Genre | Field::Actors | Field::Writers | Field::Directors
        )
    }

    /// Resolve a physical column name back to its field
    pub fn from_column(column: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == column)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        let alias = match normalized.as_str() {
            "film_created_at" => "created_at",
            "film_updated_at" => "updated_at",
            other => other,
        };
        Field::ALL
            .into_iter()
            .find(|f| f.name() == alias)
            .ok_or_else(|| {
                ReelError::Mapping(format!("Field '{s}' is not defined in the field catalog"))
            })
    }
}

/// Logical value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Identifier,
    Text,
    Float,
    Timestamp,
    GenreList,
    PersonList,
}

/// Postgres representation of a field
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalSpec {
    /// Expression in the aggregating extraction query
    pub select_expr: String,

    /// Column definition used by `CREATE TABLE`
    pub column_def: String,

    /// SQL type the bound text parameter is cast to on load
    pub sql_type: &'static str,
}

/// SQLite representation of a field
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedSpec {
    /// Column definition used by `CREATE TABLE`; nested lists are JSON text
    pub column_def: String,

    /// Expression reading the field from a normalized schema, film table
    /// aliased `fw`
    pub aggregate_expr: String,
}

/// One catalog row
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub field: Field,
    pub value_type: ValueType,
    pub relational: Option<RelationalSpec>,
    pub search: Option<Value>,
    pub embedded: Option<EmbeddedSpec>,
}

impl CatalogEntry {
    /// Whether this field has a physical representation in `kind`
    pub fn supports(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Postgres => self.relational.is_some(),
            BackendKind::Elasticsearch => self.search.is_some(),
            BackendKind::Sqlite => self.embedded.is_some(),
        }
    }
}

/// Catalog of all movie fields
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    entries: Vec<CatalogEntry>,
}

fn person_agg(role: &str, column: &str) -> String {
    format!(
        "JSON_AGG(DISTINCT jsonb_build_object('id', p.id::text, 'full_name', p.full_name)) \
         FILTER (WHERE pfw.role = '{role}') AS {column}"
    )
}

fn person_subquery(role: &str, column: &str) -> String {
    format!(
        "(SELECT json_group_array(json_object('id', p.id, 'full_name', p.full_name)) \
         FROM {PERSON_FILM_WORK} pfw JOIN {PERSON} p ON p.id = pfw.person_id \
         WHERE pfw.film_work_id = fw.id AND pfw.role = '{role}') AS {column}"
    )
}

fn person_mapping() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": {"type": "keyword"},
            "full_name": {"type": "text", "analyzer": "ru_en"}
        }
    })
}

fn entry(
    field: Field,
    value_type: ValueType,
    relational: (String, &str, &'static str),
    search: Value,
    embedded: (&str, String),
) -> CatalogEntry {
    let (select_expr, column_def, sql_type) = relational;
    let (embedded_def, aggregate_expr) = embedded;
    CatalogEntry {
        field,
        value_type,
        relational: Some(RelationalSpec {
            select_expr,
            column_def: column_def.to_string(),
            sql_type,
        }),
        search: Some(search),
        embedded: Some(EmbeddedSpec {
            column_def: embedded_def.to_string(),
            aggregate_expr,
        }),
    }
}

impl FieldCatalog {
    /// Build from explicit entries (mainly for tests)
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The movie catalog
    pub fn movies() -> Self {
        let ts_expr =
            |col: &str| format!("TO_CHAR(fw.{col}, '{TIMESTAMP_FORMAT_PG}') AS {col}");
        let ts_mapping = json!({"type": "date", "format": TIMESTAMP_FORMAT_ES});
        let plain = |col: &str| format!("fw.{col} AS {col}");
        let ts_text = |col: &str| format!("substr(fw.{col}, 1, 19) AS {col}");

        let entries = vec![
            entry(
                Field::FilmId,
                ValueType::Identifier,
                ("fw.id::text AS id".into(), "id uuid NOT NULL PRIMARY KEY", "uuid"),
                json!({"type": "keyword"}),
                ("id TEXT NOT NULL PRIMARY KEY", plain("id")),
            ),
            entry(
                Field::Title,
                ValueType::Text,
                ("fw.title".into(), "title TEXT NOT NULL", "text"),
                json!({
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                }),
                ("title TEXT NOT NULL", plain("title")),
            ),
            entry(
                Field::Description,
                ValueType::Text,
                ("fw.description".into(), "description TEXT", "text"),
                json!({"type": "text", "analyzer": "ru_en"}),
                ("description TEXT", plain("description")),
            ),
            entry(
                Field::Rating,
                ValueType::Float,
                ("fw.rating".into(), "rating FLOAT", "float8"),
                json!({"type": "float"}),
                ("rating REAL", plain("rating")),
            ),
            entry(
                Field::FilmType,
                ValueType::Text,
                ("fw.type".into(), "type TEXT NOT NULL", "text"),
                json!({"type": "keyword"}),
                ("type TEXT NOT NULL", plain("type")),
            ),
            entry(
                Field::CreatedAt,
                ValueType::Timestamp,
                (
                    ts_expr("created_at"),
                    "created_at timestamp with time zone",
                    "timestamptz",
                ),
                ts_mapping.clone(),
                ("created_at TEXT", ts_text("created_at")),
            ),
            entry(
                Field::UpdatedAt,
                ValueType::Timestamp,
                (
                    ts_expr("updated_at"),
                    "updated_at timestamp with time zone",
                    "timestamptz",
                ),
                ts_mapping,
                ("updated_at TEXT", ts_text("updated_at")),
            ),
            entry(
                Field::Genre,
                ValueType::GenreList,
                (
                    "JSON_AGG(DISTINCT jsonb_build_object('id', g.id::text, 'name', g.name)) \
                     FILTER (WHERE g.id IS NOT NULL) AS genre"
                        .into(),
                    "genre json NOT NULL",
                    "json",
                ),
                json!({
                    "type": "nested",
                    "dynamic": "strict",
                    "properties": {"name": {"type": "keyword"}}
                }),
                (
                    "genre TEXT NOT NULL",
                    format!(
                        "(SELECT json_group_array(json_object('id', g.id, 'name', g.name)) \
                         FROM {GENRE_FILM_WORK} gfw JOIN {GENRE} g ON g.id = gfw.genre_id \
                         WHERE gfw.film_work_id = fw.id) AS genre"
                    ),
                ),
            ),
            entry(
                Field::Actors,
                ValueType::PersonList,
                (person_agg("actor", "actors"), "actors json NOT NULL", "json"),
                person_mapping(),
                ("actors TEXT NOT NULL", person_subquery("actor", "actors")),
            ),
            entry(
                Field::Writers,
                ValueType::PersonList,
                (person_agg("writer", "writers"), "writers json NOT NULL", "json"),
                person_mapping(),
                ("writers TEXT NOT NULL", person_subquery("writer", "writers")),
            ),
            entry(
                Field::Directors,
                ValueType::PersonList,
                (
                    person_agg("director", "directors"),
                    "directors json NOT NULL",
                    "json",
                ),
                person_mapping(),
                (
                    "directors TEXT NOT NULL",
                    person_subquery("director", "directors"),
                ),
            ),
        ];

        Self { entries }
    }

    /// Look up a field's entry
    pub fn entry(&self, field: Field) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    /// Look up a field's entry, failing with a mapping error
    pub fn require(&self, field: Field) -> Result<&CatalogEntry> {
        self.entry(field).ok_or_else(|| {
            ReelError::Mapping(format!("Field '{field}' has no entry in the field catalog"))
        })
    }

    /// Check that every logical field has an entry for every backend kind
    ///
    /// # Errors
    ///
    /// Returns a mapping error naming the first gap found.
    pub fn validate(&self) -> Result<()> {
        for field in Field::ALL {
            let entry = self.require(field)?;
            for kind in BackendKind::ALL {
                if !entry.supports(kind) {
                    return Err(ReelError::Mapping(format!(
                        "Field '{field}' has no {kind} representation in the field catalog"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve a run's configured field names
    ///
    /// Every name must be known, must resolve for both the source and the
    /// destination kind, and `film_id` must be present because it is the
    /// conflict key of every load. Duplicates collapse to their first
    /// occurrence.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty selection and a mapping
    /// error for anything that does not resolve.
    pub fn resolve<S: AsRef<str>>(
        &self,
        names: &[S],
        source: BackendKind,
        destination: BackendKind,
    ) -> Result<FieldSelection> {
        if names.is_empty() {
            return Err(ReelError::Configuration(
                "At least one field must be selected".to_string(),
            ));
        }

        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field: Field = name.as_ref().parse()?;
            let entry = self.require(field)?;
            for kind in [source, destination] {
                if !entry.supports(kind) {
                    return Err(ReelError::Mapping(format!(
                        "Field '{field}' cannot be represented in {kind}"
                    )));
                }
            }
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        if !fields.contains(&Field::FilmId) {
            return Err(ReelError::Mapping(
                "Field selection must include 'film_id' (the upsert conflict key)".to_string(),
            ));
        }

        Ok(FieldSelection { fields })
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::movies()
    }
}

/// A validated, ordered field selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    fields: Vec<Field>,
}

impl FieldSelection {
    /// Selected fields in configuration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Physical column names in selection order
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(Field::column).collect()
    }
}
