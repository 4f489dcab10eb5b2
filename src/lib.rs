//! FILENAME: src/lib.rs
//! Cross-tabulation ("pivot table") engine.
//!
//! This crate turns a flat, in-memory table of records into a
//! cross-tabulation: values are grouped by one or more row dimensions and
//! one or more column dimensions, aggregated per cell, and rolled up into
//! subtotals at every level of each dimension hierarchy, including a
//! grand-total row and column.
//!
//! Layers:
//! - `definition`: Configuration (what the cross-tabulation IS)
//! - `value`: The raw input value union and numeric coercion
//! - `headers`: The hierarchical label tree for row/column groupings
//! - `cell`: Per-position accumulation and finalization
//! - `table`: Generation engine (HOW we calculate)
//! - `view`: Renderable output (WHAT we display)
//! - `strategies`: Stock ordering/predicate/derivation strategies
//! - `error`: The unified error type

pub mod cell;
pub mod definition;
pub mod error;
pub mod headers;
pub mod strategies;
pub mod table;
pub mod value;
pub mod view;

pub use cell::PivotCell;
pub use definition::{
    data_refs, AxisSeries, DataRef, FieldIndex, Filter, LabelCompute, Operation,
    SeriesRole, Sort, StrategyError, ValueCompute, ValueFormat, ValueSeries,
};
pub use error::PivotError;
pub use headers::{parent_label, HeaderNode, HeaderTree, LABEL_SEPARATOR};
pub use table::Table;
pub use value::{ConversionError, RawValue};
pub use view::PivotGrid;
