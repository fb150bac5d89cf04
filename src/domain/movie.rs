//! Movie domain model
//!
//! [`MovieRecord`] is the canonical, backend-independent shape of a movie used
//! between extraction and load. Every optional field is `None` either because
//! the run did not select it or because the source holds no value; the run's
//! field selection decides which of the two applies when the record is shaped
//! for a destination.

use crate::domain::ids::FilmId;
use crate::domain::timestamp::SyncTimestamp;
use crate::domain::{ReelError, Result};
use serde::{Deserialize, Serialize};

/// A person credited on a film (actor, writer or director)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Person identifier
    pub id: String,

    /// Display name
    pub full_name: String,
}

impl Person {
    /// Create a person entry
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
        }
    }
}

/// A genre reference
///
/// Depending on the pipeline stage a genre may carry only an identifier (raw
/// relational data), only a display name (search documents) or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    /// Genre identifier, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Genre {
    /// Genre known by identifier only
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    /// Genre known by display name only
    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Genre with both identifier and display name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// True when neither identifier nor name is present
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }
}

/// Canonical movie record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Primary key and conflict key for every load
    pub film_id: FilmId,

    pub title: Option<String>,

    pub description: Option<String>,

    pub rating: Option<f64>,

    pub film_type: Option<String>,

    pub created_at: Option<SyncTimestamp>,

    pub updated_at: Option<SyncTimestamp>,

    /// Ordered genre references
    pub genre: Option<Vec<Genre>>,

    /// Ordered, deduplicated by id
    pub actors: Option<Vec<Person>>,

    /// Ordered, deduplicated by id
    pub writers: Option<Vec<Person>>,

    /// Ordered, deduplicated by id
    pub directors: Option<Vec<Person>>,
}

impl MovieRecord {
    /// Record with only an identifier set
    pub fn new(film_id: FilmId) -> Self {
        Self {
            film_id,
            title: None,
            description: None,
            rating: None,
            film_type: None,
            created_at: None,
            updated_at: None,
            genre: None,
            actors: None,
            writers: None,
            directors: None,
        }
    }
}

/// Builder for [`MovieRecord`]
///
/// # Examples
///
/// ```
/// use reel::domain::{Genre, MovieRecordBuilder, Person};
///
/// let record = MovieRecordBuilder::new()
///     .film_id("3d825f60-9fff-4dfe-b294-1a45fa1e115d")
///     .title("Star Wars")
///     .genre(vec![Genre::new("1", "Drama")])
///     .actors(vec![Person::new("a1", "Mark Hamill")])
///     .build()
///     .unwrap();
///
/// assert_eq!(record.title.as_deref(), Some("Star Wars"));
/// ```
#[derive(Debug, Default)]
pub struct MovieRecordBuilder {
    film_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    rating: Option<f64>,
    film_type: Option<String>,
    created_at: Option<SyncTimestamp>,
    updated_at: Option<SyncTimestamp>,
    genre: Option<Vec<Genre>>,
    actors: Option<Vec<Person>>,
    writers: Option<Vec<Person>>,
    directors: Option<Vec<Person>>,
}

impl MovieRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn film_id(mut self, id: impl Into<String>) -> Self {
        self.film_id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn film_type(mut self, film_type: impl Into<String>) -> Self {
        self.film_type = Some(film_type.into());
        self
    }

    pub fn created_at(mut self, ts: SyncTimestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    pub fn updated_at(mut self, ts: SyncTimestamp) -> Self {
        self.updated_at = Some(ts);
        self
    }

    pub fn genre(mut self, genre: Vec<Genre>) -> Self {
        self.genre = Some(genre);
        self
    }

    pub fn actors(mut self, actors: Vec<Person>) -> Self {
        self.actors = Some(actors);
        self
    }

    pub fn writers(mut self, writers: Vec<Person>) -> Self {
        self.writers = Some(writers);
        self
    }

    pub fn directors(mut self, directors: Vec<Person>) -> Self {
        self.directors = Some(directors);
        self
    }

    /// Build the record
    ///
    /// # Errors
    ///
    /// Returns a validation error if the film id is missing or empty.
    pub fn build(self) -> Result<MovieRecord> {
        let raw_id = self
            .film_id
            .ok_or_else(|| ReelError::Other("film_id is required".to_string()))?;
        let film_id = FilmId::new(raw_id).map_err(ReelError::Other)?;

        Ok(MovieRecord {
            film_id,
            title: self.title,
            description: self.description,
            rating: self.rating,
            film_type: self.film_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
            genre: self.genre,
            actors: self.actors,
            writers: self.writers,
            directors: self.directors,
        })
    }
}
