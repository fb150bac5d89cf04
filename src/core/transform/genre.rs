//! Genre identifier to display name resolution

use crate::domain::MovieRecord;
use std::collections::{BTreeMap, HashMap};

/// Lookup table from genre id to display name
#[derive(Debug, Clone, Default)]
pub struct GenreLookup {
    names: HashMap<String, String>,
}

impl GenreLookup {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Build from the `[sync.genres]` configuration table
    pub fn from_config(genres: &BTreeMap<String, String>) -> Self {
        Self {
            names: genres
                .iter()
                .map(|(id, name)| (id.trim().to_string(), name.clone()))
                .collect(),
        }
    }

    pub fn name_for(&self, id: &str) -> Option<&str> {
        self.names.get(id.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fill in missing genre names in place
    ///
    /// Genres that already carry a name are left alone. An id absent from
    /// the lookup keeps its id text as the name. Returns how many genres
    /// could not be resolved.
    pub fn resolve(&self, records: &mut [MovieRecord]) -> usize {
        let mut unresolved = 0;
        for record in records.iter_mut() {
            let Some(genres) = record.genre.as_mut() else {
                continue;
            };
            for genre in genres.iter_mut().filter(|g| g.name.is_none()) {
                let Some(id) = genre.id.as_deref() else {
                    continue;
                };
                match self.name_for(id) {
                    Some(name) => genre.name = Some(name.to_string()),
                    None => {
                        tracing::warn!(
                            film_id = %record.film_id,
                            genre_id = %id,
                            "Genre id missing from lookup, using id as name"
                        );
                        genre.name = Some(id.to_string());
                        unresolved += 1;
                    }
                }
            }
        }
        unresolved
    }
}
