//! Record shape transforms
//!
//! Two pure conversions sit between extraction and load:
//!
//! - [`canonical`]: source shape to [`MovieRecord`]
//! - [`encode`]: [`MovieRecord`] to the destination's storage shape, after
//!   [`genre`] has filled in display names for destinations that need them

pub mod canonical;
pub mod encode;
pub mod genre;

pub use canonical::{genre_from_str, to_canonical};
pub use encode::{to_document, to_row};
pub use genre::GenreLookup;

use crate::adapters::backend::RawRecord;
use crate::catalog::FieldSelection;
use crate::domain::{BackendKind, MovieRecord, Result};

/// Convert a whole extraction to canonical records, keeping order
///
/// # Errors
///
/// Fails on the first record that cannot be converted.
pub fn to_canonical_batch(
    records: &[RawRecord],
    selection: &FieldSelection,
) -> Result<Vec<MovieRecord>> {
    records
        .iter()
        .map(|raw| to_canonical(raw, selection))
        .collect()
}

/// Apply destination-specific canonical adjustments
///
/// Destinations that store genre display names get ids resolved through
/// `lookup`; others receive records unchanged.
pub fn prepare_for_destination(
    mut records: Vec<MovieRecord>,
    destination: BackendKind,
    lookup: &GenreLookup,
) -> Vec<MovieRecord> {
    if destination.needs_genre_names() {
        let unresolved = lookup.resolve(&mut records);
        if unresolved > 0 {
            tracing::warn!(
                unresolved,
                destination = %destination,
                "Some genre ids had no display name"
            );
        }
    }
    records
}
