//! Error types for the playcube analytical store.
//!
//! Every error here signals a caller contract violation or an invalid query
//! configuration. Benign absences (a record without an optional dimension, an
//! empty store being sliced) are never errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::{Dimension, NumericField};

/// The main error type for all playcube operations.
#[derive(Error, Debug)]
pub enum PlaycubeError {
    /// Error inserting a record into the cube.
    #[error("insert error: {0}")]
    Insert(#[from] InsertError),

    /// Error regrouping the cube.
    #[error("pivot error: {0}")]
    Pivot(#[from] PivotError),

    /// Error reading from a cursor.
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    /// Error building or loading a query.
    #[error("query error: {0}")]
    Query(#[from] QueryError),
}

/// Errors that can occur when inserting a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    /// The record has no value for a dimension the tree layout groups by.
    ///
    /// The record and the cube's layout disagree; the record is not stored.
    #[error("record has no value for required dimension '{dimension}'")]
    MissingDimension {
        /// The dimension the tree needed.
        dimension: Dimension,
    },
}

/// Errors that can occur when pivoting the cube.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PivotError {
    /// The same dimension was requested for both pivot levels.
    #[error("cannot pivot on '{dimension}' twice")]
    DuplicateDimension {
        /// The repeated dimension.
        dimension: Dimension,
    },

    /// More than two grouping dimensions were requested.
    #[error("pivot supports at most 2 dimensions, got {count}")]
    TooManyDimensions {
        /// The number of dimensions requested.
        count: usize,
    },
}

/// Errors that can occur when reading a cursor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// The store was modified after this cursor was issued.
    #[error("store modified during iteration: cursor issued at generation {issued_at}, store is at {current}")]
    Invalidated {
        /// Generation stamped on the cursor.
        issued_at: u64,
        /// The store's live generation.
        current: u64,
    },
}

/// Errors that can occur while building or loading a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// More than two grouping dimensions were configured.
    #[error("at most 2 grouping dimensions are supported, got {count}")]
    TooManyGroupDimensions {
        /// The number of grouping dimensions.
        count: usize,
    },

    /// A grouping dimension appears twice.
    #[error("grouping dimension '{dimension}' is listed twice")]
    DuplicateGroupDimension {
        /// The repeated dimension.
        dimension: Dimension,
    },

    /// A dimension is used both to filter and to group.
    #[error("dimension '{dimension}' cannot be both filtered and grouped on")]
    FilterOnGroupDimension {
        /// The conflicting dimension.
        dimension: Dimension,
    },

    /// Two filters constrain the same dimension or numeric field.
    #[error("filter on '{target}' is specified twice")]
    DuplicateFilter {
        /// The dimension or field name.
        target: &'static str,
    },

    /// A scatter report plots a field against itself.
    #[error("scatter axes must differ, got '{field}' for both")]
    SameScatterAxes {
        /// The repeated field.
        field: NumericField,
    },

    /// A scatter report uses a count field, which is constant per play.
    #[error("count field '{field}' cannot be a scatter axis")]
    CountFieldOnAxis {
        /// The count field.
        field: NumericField,
    },

    /// A category name is not in the dimension's domain.
    #[error("unknown value '{value}' for dimension '{dimension}'")]
    UnknownCategory {
        /// The dimension being parsed.
        dimension: Dimension,
        /// The name that did not match.
        value: String,
    },

    /// A dimension name is not recognized.
    #[error("unknown dimension '{name}'")]
    UnknownDimension {
        /// The name that did not match.
        name: String,
    },

    /// A numeric field name is not recognized.
    #[error("unknown numeric field '{name}'")]
    UnknownField {
        /// The name that did not match.
        name: String,
    },

    /// A filter expression could not be parsed.
    #[error("invalid filter '{expr}': {reason}")]
    InvalidFilter {
        /// The expression as given.
        expr: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Failed to read a query configuration file.
    #[error("failed to read query config '{}': {source}", path.display())]
    ConfigRead {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a query configuration file.
    #[error("failed to parse query config '{}': {source}", path.display())]
    ConfigParse {
        /// The config file path.
        path: PathBuf,
        /// The underlying JSON parsing error.
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for `Result<T, PlaycubeError>`.
pub type Result<T> = std::result::Result<T, PlaycubeError>;
