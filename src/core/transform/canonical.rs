//! Source shape to canonical shape
//!
//! Every adapter hands back [`RawRecord`]s keyed by physical column name.
//! Their nested fields arrive as JSON arrays (Postgres `row_to_json`,
//! Elasticsearch `_source`) or as JSON text (SQLite rows); genres may be
//! objects, identifiers or display names. This module folds all of that into
//! a [`MovieRecord`] holding only the selected fields.

use crate::adapters::backend::RawRecord;
use crate::catalog::{Field, FieldSelection};
use crate::domain::{FilmId, Genre, MovieRecord, Person, ReelError, Result, SyncTimestamp};
use serde_json::Value;
use std::collections::HashSet;

/// Convert one raw record to the canonical shape
///
/// # Errors
///
/// Returns an extraction error if the record has no id or a selected field
/// holds a value of the wrong type.
pub fn to_canonical(raw: &RawRecord, selection: &FieldSelection) -> Result<MovieRecord> {
    let film_id = raw
        .get(Field::FilmId.column())
        .and_then(scalar_text)
        .ok_or_else(|| ReelError::Extraction("Extracted record has no id".to_string()))
        .and_then(|id| FilmId::new(id).map_err(ReelError::Extraction))?;

    let mut record = MovieRecord::new(film_id);

    for field in selection.fields() {
        let value = raw.get(field.column()).unwrap_or(&Value::Null);
        match field {
            Field::FilmId => {}
            Field::Title => record.title = scalar_text(value),
            Field::Description => record.description = scalar_text(value),
            Field::FilmType => record.film_type = scalar_text(value),
            Field::Rating => record.rating = decode_rating(value, &record.film_id)?,
            Field::CreatedAt => record.created_at = decode_timestamp(value, *field)?,
            Field::UpdatedAt => record.updated_at = decode_timestamp(value, *field)?,
            Field::Genre => record.genre = Some(decode_genres(value, &record.film_id)?),
            Field::Actors => record.actors = Some(decode_persons(value, *field)?),
            Field::Writers => record.writers = Some(decode_persons(value, *field)?),
            Field::Directors => record.directors = Some(decode_persons(value, *field)?),
        }
    }

    Ok(record)
}

/// Text form of a scalar JSON value (`None` for null, arrays and objects)
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn decode_rating(value: &Value, film_id: &FilmId) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.trim().parse().map(Some).map_err(|_| {
            ReelError::Extraction(format!("Film {film_id} has a non-numeric rating '{s}'"))
        }),
        other => Err(ReelError::Extraction(format!(
            "Film {film_id} has a non-numeric rating {other}"
        ))),
    }
}

fn decode_timestamp(value: &Value, field: Field) -> Result<Option<SyncTimestamp>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => SyncTimestamp::parse(s)
            .map(Some)
            .map_err(|e| ReelError::Extraction(format!("Field '{field}': {e}"))),
        other => Err(ReelError::Extraction(format!(
            "Field '{field}' is not a timestamp string: {other}"
        ))),
    }
}

/// Decode a nested list held as an array, as JSON text, or as null
fn nested_items(value: &Value, field: Field) -> Result<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.clone()),
        Value::String(text) if text.trim().is_empty() => Ok(Vec::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(Value::Null) => Ok(Vec::new()),
            Ok(other) => Err(ReelError::Extraction(format!(
                "Field '{field}' does not hold a list: {other}"
            ))),
            Err(e) => Err(ReelError::Extraction(format!(
                "Field '{field}' holds invalid JSON text: {e}"
            ))),
        },
        other => Err(ReelError::Extraction(format!(
            "Field '{field}' does not hold a list: {other}"
        ))),
    }
}

/// Interpret a bare genre string
///
/// UUIDs and integers are identifiers; anything else is a display name.
pub fn genre_from_str(value: &str) -> Genre {
    let value = value.trim();
    if uuid::Uuid::parse_str(value).is_ok() || value.parse::<i64>().is_ok() {
        Genre::from_id(value)
    } else {
        Genre::from_name(value)
    }
}

fn decode_genres(value: &Value, film_id: &FilmId) -> Result<Vec<Genre>> {
    let mut genres = Vec::new();
    for item in nested_items(value, Field::Genre)? {
        let genre = match &item {
            Value::String(s) => genre_from_str(s),
            Value::Number(n) => Genre::from_id(n.to_string()),
            Value::Object(obj) => Genre {
                id: obj.get("id").and_then(scalar_text),
                name: obj.get("name").and_then(scalar_text),
            },
            Value::Null => continue,
            other => {
                return Err(ReelError::Extraction(format!(
                    "Film {film_id} has an unreadable genre entry {other}"
                )))
            }
        };
        if !genre.is_empty() && !genres.contains(&genre) {
            genres.push(genre);
        }
    }
    Ok(genres)
}

fn decode_persons(value: &Value, field: Field) -> Result<Vec<Person>> {
    let mut seen = HashSet::new();
    let mut persons = Vec::new();
    for item in nested_items(value, field)? {
        let Value::Object(obj) = item else {
            continue;
        };
        let Some(id) = obj.get("id").and_then(scalar_text) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        let full_name = obj
            .get("full_name")
            .and_then(scalar_text)
            .unwrap_or_default();
        persons.push(Person::new(id, full_name));
    }
    Ok(persons)
}
