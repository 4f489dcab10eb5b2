//! FILENAME: src/error.rs
//! Unified error type for cross-tabulation generation.
//!
//! Shape errors are raised at construction, registration errors are deferred
//! (sticky) and surfaced by `generate()`, and conversion/derivation/label
//! errors abort generation with the offending context. No error is retried.

use thiserror::Error;

use crate::definition::{FieldIndex, SeriesRole};
use crate::value::ConversionError;

#[derive(Debug, Error)]
pub enum PivotError {
    /// The input table is empty (no records, header-only, or zero fields).
    #[error("no input data")]
    NoInput,

    /// Records have inconsistent field counts.
    #[error("input data has variable record sizes (expected {expected}, record {record} has {found})")]
    RaggedInput {
        expected: usize,
        record: usize,
        found: usize,
    },

    /// A series was registered with zero field references.
    #[error("invalid {role} definition: no field references given")]
    NoRefs { role: SeriesRole },

    /// A series was registered with several field references but no
    /// derivation strategy to combine them.
    #[error("invalid {role} definition: several field references with no compute given")]
    AmbiguousRefs { role: SeriesRole },

    /// A field index was claimed by more than one non-derived row/column
    /// series.
    #[error("invalid {role} definition: field {index} already used by another row or column")]
    IndexAlreadyUsed { role: SeriesRole, index: FieldIndex },

    /// A registered field index does not exist in the input records.
    #[error("field index {index} out of range for records of width {width}")]
    IndexOutOfRange { index: FieldIndex, width: usize },

    /// `generate()` was called with no series registered for a role.
    #[error("no {role} series defined")]
    NoSeries { role: SeriesRole },

    /// A raw value could not be converted to a number for accumulation.
    #[error("field {index}: {source}")]
    Conversion {
        index: FieldIndex,
        #[source]
        source: ConversionError,
    },

    /// A derivation strategy failed; wraps the strategy's own error with the
    /// record and series context that triggered it.
    #[error("while computing {context}: {source}")]
    Compute {
        context: String,
        #[source]
        source: crate::definition::StrategyError,
    },

    /// A computed group label was empty. Empty labels are reserved for the
    /// grand total and must never arise from data.
    #[error("empty {role} labels are not supported")]
    EmptyLabel { role: SeriesRole },
}
