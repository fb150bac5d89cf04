//! Branch dispatcher
//!
//! Resolves the declared source and destination kinds into a [`RunPlan`]:
//! the validated field selection plus the fixed step sequence each branch
//! runs. Resolution is pure and happens before any connection is opened; a
//! plan never changes during a run.

use crate::catalog::{FieldCatalog, FieldSelection};
use crate::config::ReelConfig;
use crate::domain::{BackendKind, Result};
use std::fmt;

/// Which side of a run a branch is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Destination,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Source => "source",
            Role::Destination => "destination",
        })
    }
}

/// One step of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Bounded, ordered scan of changed ids
    ResolveChangedIds,
    /// Fetch full rows for the resolved ids
    FetchFilmData,
    /// Range query returning whole documents
    FetchDocuments,
    /// Canonical conversion and destination shaping
    Preprocess,
    EnsureSchema,
    Write,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::ResolveChangedIds => "resolve_changed_ids",
            Step::FetchFilmData => "fetch_film_data",
            Step::FetchDocuments => "fetch_documents",
            Step::Preprocess => "preprocess",
            Step::EnsureSchema => "ensure_schema",
            Step::Write => "write",
        })
    }
}

const TWO_PHASE_EXTRACT: &[Step] = &[Step::ResolveChangedIds, Step::FetchFilmData];
const DOCUMENT_EXTRACT: &[Step] = &[Step::FetchDocuments];
const LOAD: &[Step] = &[Step::Preprocess, Step::EnsureSchema, Step::Write];

/// Steps a source of `kind` runs
pub fn source_steps(kind: BackendKind) -> &'static [Step] {
    match kind {
        BackendKind::Postgres | BackendKind::Sqlite => TWO_PHASE_EXTRACT,
        BackendKind::Elasticsearch => DOCUMENT_EXTRACT,
    }
}

/// Steps a destination of `kind` runs
pub fn destination_steps(kind: BackendKind) -> &'static [Step] {
    match kind {
        BackendKind::Postgres | BackendKind::Elasticsearch | BackendKind::Sqlite => LOAD,
    }
}

/// A resolved branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub role: Role,
    pub kind: BackendKind,
    pub steps: &'static [Step],
}

impl Branch {
    pub fn source(kind: BackendKind) -> Self {
        Self {
            role: Role::Source,
            kind,
            steps: source_steps(kind),
        }
    }

    pub fn destination(kind: BackendKind) -> Self {
        Self {
            role: Role::Destination,
            kind,
            steps: destination_steps(kind),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps = self
            .steps
            .iter()
            .map(Step::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(f, "{} [{}]: {}", self.role, self.kind, steps)
    }
}

/// Everything fixed before a run touches a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub source: Branch,
    pub destination: Branch,
    pub selection: FieldSelection,
    pub chunk_size: usize,
}

impl RunPlan {
    /// Resolve kinds and field selection for explicit inputs
    ///
    /// # Errors
    ///
    /// Returns a configuration or mapping error if the selection is empty,
    /// names an unknown field, omits `film_id`, or names a field one of the
    /// two kinds cannot store.
    pub fn resolve<S: AsRef<str>>(
        catalog: &FieldCatalog,
        source: BackendKind,
        destination: BackendKind,
        fields: &[S],
        chunk_size: usize,
    ) -> Result<Self> {
        let selection = catalog.resolve(fields, source, destination)?;
        Ok(Self {
            source: Branch::source(source),
            destination: Branch::destination(destination),
            selection,
            chunk_size,
        })
    }

    /// Resolve the plan declared by a configuration
    ///
    /// # Errors
    ///
    /// See [`RunPlan::resolve`].
    pub fn from_config(config: &ReelConfig) -> Result<Self> {
        let catalog = FieldCatalog::movies();
        catalog.validate()?;
        let plan = Self::resolve(
            &catalog,
            config.source.kind,
            config.destination.kind,
            &config.sync.fields,
            config.sync.chunk_size,
        )?;

        tracing::debug!(
            source = %plan.source,
            destination = %plan.destination,
            fields = ?plan.selection.columns(),
            "Run plan resolved"
        );
        Ok(plan)
    }
}
