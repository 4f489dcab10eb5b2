//! FILENAME: src/definition.rs
//! Cross-tabulation configuration types.
//!
//! This module contains the types needed to DESCRIBE a cross-tabulation:
//! field references with their aggregation operations, display formats, and
//! the row/column/value series that bind fields to pluggable strategies.
//! Plain-data types are serializable; strategies are function values and
//! are not.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::value::RawValue;

/// Index into the source data fields (0-based).
pub type FieldIndex = usize;

/// Error type produced by user-supplied derivation strategies.
pub type StrategyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Ordering strategy: reorders a set of sibling labels.
///
/// A strategy may also filter: labels it drops are simply not shown.
pub type Sort = Arc<dyn Fn(Vec<String>) -> Vec<String> + Send + Sync>;

/// Membership predicate: accepts or rejects one raw value.
pub type Filter = Arc<dyn Fn(&RawValue) -> bool + Send + Sync>;

/// Label-derivation strategy: maps a tuple of raw field values to one
/// group label.
pub type LabelCompute = Arc<dyn Fn(&[RawValue]) -> Result<String, StrategyError> + Send + Sync>;

/// Value-derivation strategy: maps a tuple of accumulated raw values to one
/// output value.
pub type ValueCompute = Arc<dyn Fn(&[RawValue]) -> Result<f64, StrategyError> + Send + Sync>;

// ============================================================================
// FIELD REFERENCES
// ============================================================================

/// Aggregation operation attached to a field reference.
///
/// `None` has no accumulation semantics; it is only used as identity for
/// row/column walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    None,
    Count,
    Sum,
}

/// A (field index, operation) pair identifying one accumulation key.
///
/// Two references with the same index but different operations are distinct
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRef {
    pub index: FieldIndex,
    pub operation: Operation,
}

impl DataRef {
    pub fn new(index: FieldIndex, operation: Operation) -> Self {
        DataRef { index, operation }
    }
}

/// Builds a list of references sharing one operation.
pub fn data_refs(indexes: &[FieldIndex], operation: Operation) -> Vec<DataRef> {
    indexes
        .iter()
        .map(|&index| DataRef::new(index, operation))
        .collect()
}

pub(crate) type DataRefList = SmallVec<[DataRef; 4]>;

// ============================================================================
// DISPLAY FORMAT
// ============================================================================

/// Fixed-point display token for one output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValueFormat {
    pub decimals: usize,
}

impl ValueFormat {
    pub fn decimals(decimals: usize) -> Self {
        ValueFormat { decimals }
    }

    /// Formats a value with this token.
    pub fn apply(&self, value: f64) -> String {
        format!("{:.*}", self.decimals, value)
    }
}

/// The role a series plays in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesRole {
    Row,
    Column,
    Value,
}

impl fmt::Display for SeriesRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesRole::Row => f.write_str("row"),
            SeriesRole::Column => f.write_str("column"),
            SeriesRole::Value => f.write_str("value"),
        }
    }
}

// ============================================================================
// SERIES
// ============================================================================

/// A row or column grouping dimension.
///
/// Binds one or more source fields, an optional membership predicate (tested
/// against the derived group label), an optional label-derivation strategy
/// (required when several fields are bound), and an optional ordering
/// strategy for the labels this dimension produces.
pub struct AxisSeries {
    pub(crate) data_refs: DataRefList,
    pub(crate) name: String,
    pub(crate) filter: Option<Filter>,
    pub(crate) compute: Option<LabelCompute>,
    pub(crate) sort: Option<Sort>,
}

impl AxisSeries {
    pub(crate) fn new(
        indexes: &[FieldIndex],
        filter: Option<Filter>,
        compute: Option<LabelCompute>,
        sort: Option<Sort>,
    ) -> Self {
        AxisSeries {
            data_refs: indexes
                .iter()
                .map(|&index| DataRef::new(index, Operation::None))
                .collect(),
            name: String::new(),
            filter,
            compute,
            sort,
        }
    }

    /// Display name, back-filled once before generation.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_from_headers(&mut self, headers: Option<&[RawValue]>) {
        resolve_name(
            &mut self.name,
            &self.data_refs,
            self.compute.is_some(),
            headers,
        );
    }
}

impl fmt::Debug for AxisSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisSeries")
            .field("data_refs", &self.data_refs)
            .field("name", &self.name)
            .field("filter", &self.filter.is_some())
            .field("compute", &self.compute.is_some())
            .field("sort", &self.sort.is_some())
            .finish()
    }
}

/// A value-aggregation dimension.
///
/// Binds one or more accumulation keys, an optional value-derivation
/// strategy (required when several keys are bound), and a display format.
pub struct ValueSeries {
    pub(crate) data_refs: DataRefList,
    pub(crate) name: String,
    pub(crate) compute: Option<ValueCompute>,
    pub(crate) format: ValueFormat,
}

impl ValueSeries {
    pub(crate) fn new(
        name: &str,
        refs: &[DataRef],
        compute: Option<ValueCompute>,
        format: ValueFormat,
    ) -> Self {
        ValueSeries {
            data_refs: refs.iter().copied().collect(),
            name: name.to_string(),
            compute,
            format,
        }
    }

    /// Display name, back-filled once before generation.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ValueFormat {
        self.format
    }

    pub(crate) fn name_from_headers(&mut self, headers: Option<&[RawValue]>) {
        resolve_name(
            &mut self.name,
            &self.data_refs,
            self.compute.is_some(),
            headers,
        );
    }
}

impl fmt::Debug for ValueSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSeries")
            .field("data_refs", &self.data_refs)
            .field("name", &self.name)
            .field("compute", &self.compute.is_some())
            .field("format", &self.format)
            .finish()
    }
}

/// Resolves a series display name from the header row if present, else
/// synthesizes one from the bound field indexes.
fn resolve_name(
    name: &mut String,
    data_refs: &DataRefList,
    has_compute: bool,
    headers: Option<&[RawValue]>,
) {
    if data_refs.is_empty() {
        return;
    }
    if has_compute {
        if name.is_empty() {
            *name = synthesized_name("Computed", data_refs);
        }
    } else {
        match headers.and_then(|h| h.get(data_refs[0].index)) {
            Some(RawValue::Text(s)) => *name = s.clone(),
            _ => *name = synthesized_name("Unnamed", data_refs),
        }
    }
}

fn synthesized_name(prefix: &str, data_refs: &DataRefList) -> String {
    let indexes: Vec<FieldIndex> = data_refs.iter().map(|r| r.index).collect();
    format!("{prefix}{indexes:?}")
}
