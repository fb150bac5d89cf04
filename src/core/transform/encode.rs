//! Canonical shape to destination storage shape
//!
//! Relational and embedded stores receive flat rows with nested lists as
//! JSON text. The search engine receives documents with nested lists as
//! nested objects and genres reduced to `{name}`.

use crate::catalog::{Field, FieldSelection};
use crate::domain::{Genre, MovieRecord, Person, Result};
use serde_json::{json, Map, Value};

/// Encode a record as a flat row in selection order
///
/// Scalars become their text form; nested lists become JSON text and are
/// never null (an unset list encodes as `[]`).
///
/// # Errors
///
/// Returns a serialization error if a nested list cannot be encoded.
pub fn to_row(record: &MovieRecord, selection: &FieldSelection) -> Result<Vec<Option<String>>> {
    selection
        .fields()
        .iter()
        .map(|field| row_value(record, *field))
        .collect()
}

fn row_value(record: &MovieRecord, field: Field) -> Result<Option<String>> {
    let value = match field {
        Field::FilmId => Some(record.film_id.to_string()),
        Field::Title => record.title.clone(),
        Field::Description => record.description.clone(),
        Field::FilmType => record.film_type.clone(),
        Field::Rating => record.rating.map(|r| r.to_string()),
        Field::CreatedAt => record.created_at.map(|t| t.to_string()),
        Field::UpdatedAt => record.updated_at.map(|t| t.to_string()),
        Field::Genre => Some(json_text(record.genre.as_deref())?),
        Field::Actors => Some(json_text(record.actors.as_deref())?),
        Field::Writers => Some(json_text(record.writers.as_deref())?),
        Field::Directors => Some(json_text(record.directors.as_deref())?),
    };
    Ok(value)
}

fn json_text<T: serde::Serialize>(items: Option<&[T]>) -> Result<String> {
    Ok(serde_json::to_string(items.unwrap_or_default())?)
}

/// Encode a record as a search document holding only selected fields
pub fn to_document(record: &MovieRecord, selection: &FieldSelection) -> Value {
    let mut doc = Map::new();
    for field in selection.fields() {
        let value = match field {
            Field::FilmId => Value::String(record.film_id.to_string()),
            Field::Title => opt_string(&record.title),
            Field::Description => opt_string(&record.description),
            Field::FilmType => opt_string(&record.film_type),
            Field::Rating => record.rating.map_or(Value::Null, |r| json!(r)),
            Field::CreatedAt => record
                .created_at
                .map_or(Value::Null, |t| Value::String(t.to_string())),
            Field::UpdatedAt => record
                .updated_at
                .map_or(Value::Null, |t| Value::String(t.to_string())),
            Field::Genre => genre_names(record.genre.as_deref()),
            Field::Actors => persons(record.actors.as_deref()),
            Field::Writers => persons(record.writers.as_deref()),
            Field::Directors => persons(record.directors.as_deref()),
        };
        doc.insert(field.column().to_string(), value);
    }
    Value::Object(doc)
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}

fn genre_names(genres: Option<&[Genre]>) -> Value {
    Value::Array(
        genres
            .unwrap_or_default()
            .iter()
            .filter_map(|g| g.name.as_ref().or(g.id.as_ref()))
            .map(|name| json!({ "name": name }))
            .collect(),
    )
}

fn persons(list: Option<&[Person]>) -> Value {
    Value::Array(
        list.unwrap_or_default()
            .iter()
            .map(|p| json!({ "id": p.id, "full_name": p.full_name }))
            .collect(),
    )
}
