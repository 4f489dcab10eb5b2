//! FILENAME: src/table.rs
//! Table engine - validation, registration, and generation.
//!
//! A table is built up through a fluent sequence of registration calls, then
//! finalized with one `generate()` call, then read-only.
//!
//! Algorithm:
//! 1. Back-fill series display names from the header row (or synthesize)
//! 2. Filter records through the filter set and axis-series predicates
//! 3. Walk each surviving record down both label trees to its
//!    (row path, column path) position
//! 4. Update the exact-match cell: record every registered accumulation key,
//!    then refinalize every value series from scratch
//! 5. Repeat the update for every (row-ancestor, column-ancestor) pairing so
//!    subtotals at every depth stay consistent
//! 6. Render by traversing both trees depth-first, grand totals last
//!
//! The first validation or registration failure sticks on the table and
//! short-circuits generation.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{FormatList, PivotCell};
use crate::definition::{
    AxisSeries, DataRef, FieldIndex, Filter, LabelCompute, Operation, SeriesRole, Sort,
    ValueCompute, ValueFormat, ValueSeries,
};
use crate::error::PivotError;
use crate::headers::{parent_label, HeaderTree};
use crate::value::RawValue;
use crate::view::PivotGrid;

pub struct Table {
    data: Vec<Vec<RawValue>>,
    has_headers: bool,
    claimed_axis_indexes: FxHashSet<FieldIndex>,
    value_refs: FxHashSet<DataRef>,
    cells: FxHashMap<String, FxHashMap<String, PivotCell>>,
    filters: FxHashMap<FieldIndex, Filter>,
    row_headers: HeaderTree,
    column_headers: HeaderTree,
    row_series: Vec<AxisSeries>,
    column_series: Vec<AxisSeries>,
    value_series: Vec<ValueSeries>,
    err: Option<PivotError>,
}

// ============================================================================
// CONSTRUCTION & REGISTRATION
// ============================================================================

impl Table {
    /// Creates a table over an in-memory record set. When `has_headers` is
    /// set, the first record supplies display names only and never
    /// participates in filtering or aggregation.
    ///
    /// Shape problems (empty input, ragged record widths) are recorded as a
    /// deferred error surfaced by [`Table::generate`].
    pub fn new(data: Vec<Vec<RawValue>>, has_headers: bool) -> Self {
        let err = Self::validate_shape(&data, has_headers).err();
        Table {
            data,
            has_headers,
            claimed_axis_indexes: FxHashSet::default(),
            value_refs: FxHashSet::default(),
            cells: FxHashMap::default(),
            filters: FxHashMap::default(),
            row_headers: HeaderTree::new(None),
            column_headers: HeaderTree::new(None),
            row_series: Vec::new(),
            column_series: Vec::new(),
            value_series: Vec::new(),
            err,
        }
    }

    fn validate_shape(data: &[Vec<RawValue>], has_headers: bool) -> Result<(), PivotError> {
        let min_records = if has_headers { 2 } else { 1 };
        if data.len() < min_records {
            return Err(PivotError::NoInput);
        }
        let expected = data[0].len();
        if expected == 0 {
            return Err(PivotError::NoInput);
        }
        for (record, row) in data.iter().enumerate() {
            if row.len() != expected {
                return Err(PivotError::RaggedInput {
                    expected,
                    record,
                    found: row.len(),
                });
            }
        }
        Ok(())
    }

    /// Restricts generation to records whose raw value at `index` the
    /// predicate accepts.
    pub fn filter(mut self, index: FieldIndex, filter: Filter) -> Self {
        self.filters.insert(index, filter);
        self
    }

    /// Registers one source field as the next row grouping level.
    pub fn row(self, index: FieldIndex) -> Self {
        self.computed_row(&[index], None, None, None)
    }

    /// Registers a row grouping level with optional membership predicate,
    /// label derivation, and ordering strategy. Several indexes require a
    /// derivation strategy to combine them.
    pub fn computed_row(
        mut self,
        indexes: &[FieldIndex],
        filter: Option<Filter>,
        compute: Option<LabelCompute>,
        sort: Option<Sort>,
    ) -> Self {
        match self.register_axis(SeriesRole::Row, indexes, filter, compute, sort) {
            Ok(series) => self.row_series.push(series),
            Err(err) => self.stick(err),
        }
        self
    }

    /// Registers one source field as the next column grouping level.
    pub fn column(self, index: FieldIndex) -> Self {
        self.computed_column(&[index], None, None, None)
    }

    /// Column counterpart of [`Table::computed_row`].
    pub fn computed_column(
        mut self,
        indexes: &[FieldIndex],
        filter: Option<Filter>,
        compute: Option<LabelCompute>,
        sort: Option<Sort>,
    ) -> Self {
        match self.register_axis(SeriesRole::Column, indexes, filter, compute, sort) {
            Ok(series) => self.column_series.push(series),
            Err(err) => self.stick(err),
        }
        self
    }

    /// Registers one aggregated output value per cell.
    pub fn values(self, index: FieldIndex, operation: Operation, format: ValueFormat) -> Self {
        self.computed_values("", &[DataRef::new(index, operation)], None, format)
    }

    /// Registers a derived output value computed over several accumulation
    /// keys.
    pub fn computed_values(
        mut self,
        name: &str,
        refs: &[DataRef],
        compute: Option<ValueCompute>,
        format: ValueFormat,
    ) -> Self {
        if let Err(err) = self.register_values(name, refs, compute, format) {
            self.stick(err);
        }
        self
    }

    fn stick(&mut self, err: PivotError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    fn register_axis(
        &mut self,
        role: SeriesRole,
        indexes: &[FieldIndex],
        filter: Option<Filter>,
        compute: Option<LabelCompute>,
        sort: Option<Sort>,
    ) -> Result<AxisSeries, PivotError> {
        if indexes.is_empty() {
            return Err(PivotError::NoRefs { role });
        }
        if compute.is_none() {
            if indexes.len() != 1 {
                return Err(PivotError::AmbiguousRefs { role });
            }
            // Computed dimensions combine several fields and are exempt
            // from the uniqueness claim.
            let index = indexes[0];
            if !self.claimed_axis_indexes.insert(index) {
                return Err(PivotError::IndexAlreadyUsed { role, index });
            }
        }
        Ok(AxisSeries::new(indexes, filter, compute, sort))
    }

    fn register_values(
        &mut self,
        name: &str,
        refs: &[DataRef],
        compute: Option<ValueCompute>,
        format: ValueFormat,
    ) -> Result<(), PivotError> {
        let role = SeriesRole::Value;
        if refs.is_empty() {
            return Err(PivotError::NoRefs { role });
        }
        if compute.is_none() && refs.len() != 1 {
            return Err(PivotError::AmbiguousRefs { role });
        }
        for r in refs {
            self.value_refs.insert(*r);
        }
        self.value_series
            .push(ValueSeries::new(name, refs, compute, format));
        Ok(())
    }
}

// ============================================================================
// GENERATION
// ============================================================================

impl Table {
    /// Runs the single-pass batch computation. Fails atomically: on error no
    /// partial result is exposed.
    pub fn generate(&mut self) -> Result<(), PivotError> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        if self.row_series.is_empty() {
            return Err(PivotError::NoSeries {
                role: SeriesRole::Row,
            });
        }
        if self.column_series.is_empty() {
            return Err(PivotError::NoSeries {
                role: SeriesRole::Column,
            });
        }
        if self.value_series.is_empty() {
            return Err(PivotError::NoSeries {
                role: SeriesRole::Value,
            });
        }
        self.validate_indexes()?;

        let header: Option<Vec<RawValue>> = if self.has_headers {
            Some(self.data[0].clone())
        } else {
            None
        };
        for series in self
            .row_series
            .iter_mut()
            .chain(self.column_series.iter_mut())
        {
            series.name_from_headers(header.as_deref());
        }
        for series in self.value_series.iter_mut() {
            series.name_from_headers(header.as_deref());
        }

        let records = self.filtered_records()?;
        debug!(
            "generating cross-tabulation over {} of {} records",
            records.len(),
            self.data.len() - usize::from(self.has_headers)
        );
        for record in &records {
            let row_label = walk(&mut self.row_headers, &self.row_series, record)?;
            if row_label.is_empty() {
                return Err(PivotError::EmptyLabel {
                    role: SeriesRole::Row,
                });
            }
            let column_label = walk(&mut self.column_headers, &self.column_series, record)?;
            if column_label.is_empty() {
                return Err(PivotError::EmptyLabel {
                    role: SeriesRole::Column,
                });
            }
            self.update_cell(&row_label, &column_label, record)?;
            self.update_cross_cells(&row_label, &column_label, record)?;
        }
        debug!("generated {} grid rows", self.cells.len());
        Ok(())
    }

    fn validate_indexes(&self) -> Result<(), PivotError> {
        let width = self.data[0].len();
        let axis_refs = self
            .row_series
            .iter()
            .chain(self.column_series.iter())
            .flat_map(|series| series.data_refs.iter());
        for r in axis_refs.chain(self.value_refs.iter()) {
            if r.index >= width {
                return Err(PivotError::IndexOutOfRange {
                    index: r.index,
                    width,
                });
            }
        }
        for &index in self.filters.keys() {
            if index >= width {
                return Err(PivotError::IndexOutOfRange { index, width });
            }
        }
        Ok(())
    }

    /// Applies the filter set and every axis-series membership predicate.
    /// A record survives only if every active predicate accepts it. Value
    /// series predicates do not exist; only axes filter.
    fn filtered_records(&self) -> Result<Vec<Vec<RawValue>>, PivotError> {
        let start = usize::from(self.has_headers);
        let mut kept = Vec::new();
        'records: for record in &self.data[start..] {
            for (&index, filter) in &self.filters {
                if !(**filter)(&record[index]) {
                    continue 'records;
                }
            }
            for series in self.row_series.iter().chain(self.column_series.iter()) {
                if let Some(filter) = series.filter.as_deref() {
                    let label = axis_value(series, record)?;
                    if !filter(&RawValue::Text(label)) {
                        continue 'records;
                    }
                }
            }
            kept.push(record.clone());
        }
        Ok(kept)
    }

    /// Records every registered accumulation key of `record` into the cell
    /// at (row, column), creating it on first touch, then refinalizes every
    /// value series output from the accumulated state.
    fn update_cell(
        &mut self,
        row_label: &str,
        column_label: &str,
        record: &[RawValue],
    ) -> Result<(), PivotError> {
        let formats: FormatList = self.value_series.iter().map(|s| s.format).collect();
        let cell = self
            .cells
            .entry(row_label.to_string())
            .or_default()
            .entry(column_label.to_string())
            .or_insert_with(|| PivotCell::new(formats));
        for &data_ref in &self.value_refs {
            let value = record[data_ref.index]
                .to_f64()
                .map_err(|source| PivotError::Conversion {
                    index: data_ref.index,
                    source,
                })?;
            cell.record(data_ref, value);
        }
        for (index, series) in self.value_series.iter().enumerate() {
            cell.finalize(index, series)?;
        }
        Ok(())
    }

    /// Cross-cell subtotal propagation: repeats the cell update for every
    /// pairing of the row label's ancestors with the column label's
    /// ancestors, excluding the (0, 0) exact-match pairing already applied.
    /// Partial pairings (row ancestor with the column itself and vice versa)
    /// are included, so row-only and column-only subtotals stay consistent.
    fn update_cross_cells(
        &mut self,
        row_label: &str,
        column_label: &str,
        record: &[RawValue],
    ) -> Result<(), PivotError> {
        let row_depth = self.row_series.len();
        let column_depth = self.column_series.len();
        let mut sum_column = column_label.to_string();
        for i in 0..=column_depth {
            let mut sum_row = row_label.to_string();
            for j in 0..=row_depth {
                if i != 0 || j != 0 {
                    self.update_cell(&sum_row, &sum_column, record)?;
                }
                sum_row = parent_label(&sum_row).to_string();
            }
            sum_column = parent_label(&sum_column).to_string();
        }
        Ok(())
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

impl Table {
    /// Finalized output values at a (row path label, column path label)
    /// position, if any record contributed there. The root label `""`
    /// addresses the grand total on either axis.
    pub fn cell(&self, row_label: &str, column_label: &str) -> Option<&PivotCell> {
        self.cells.get(row_label)?.get(column_label)
    }

    /// Renders the generated table. Both axes are traversed depth-first with
    /// descendants immediately after their group and the grand total (root
    /// label, shown as `Total`) last; untouched positions render empty.
    pub fn to_grid(&self) -> PivotGrid {
        let column_labels = self.column_headers.labels(true, true);
        let row_labels = self.row_headers.labels(true, true);
        let mut header = Vec::with_capacity(column_labels.len() + 1);
        header.push(String::new());
        header.extend(column_labels.iter().map(|l| display_label(l)));
        let mut rows = Vec::with_capacity(row_labels.len());
        for row_label in &row_labels {
            let mut cells = Vec::with_capacity(column_labels.len() + 1);
            cells.push(display_label(row_label));
            for column_label in &column_labels {
                let rendered = self
                    .cell(row_label, column_label)
                    .map(|cell| cell.to_string())
                    .unwrap_or_default();
                cells.push(rendered);
            }
            rows.push(cells);
        }
        PivotGrid { header, rows }
    }

    /// Semicolon-delimited text rendering of [`Table::to_grid`].
    pub fn to_csv(&self) -> String {
        self.to_grid().to_csv(';')
    }
}

fn display_label(label: &str) -> String {
    if label.is_empty() {
        "Total".to_string()
    } else {
        label.to_string()
    }
}

/// Extracts one axis series' logical value from a record: apply its
/// derivation strategy across its field references if present, else read the
/// single referenced field, coercing to text if not already text.
fn axis_value(series: &AxisSeries, record: &[RawValue]) -> Result<String, PivotError> {
    if let Some(compute) = series.compute.as_deref() {
        let elements: Vec<RawValue> = series
            .data_refs
            .iter()
            .map(|r| record[r.index].clone())
            .collect();
        compute(&elements).map_err(|source| PivotError::Compute {
            context: format!("series {:?} for record {record:?}", series.name()),
            source,
        })
    } else {
        let element = &record[series.data_refs[0].index];
        Ok(match element {
            RawValue::Text(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Descends one tree once per axis series, creating nodes lazily and
/// applying each series' ordering strategy to the node it orders.
fn walk(
    tree: &mut HeaderTree,
    series_list: &[AxisSeries],
    record: &[RawValue],
) -> Result<String, PivotError> {
    let mut node = tree.root_mut();
    for series in series_list {
        let value = axis_value(series, record)?;
        node.set_sort(series.sort.clone());
        node = node.descend(&value);
    }
    Ok(node.label().to_string())
}
