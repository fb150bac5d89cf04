//! CLI command implementations

pub mod status;
pub mod sync;
pub mod validate;
