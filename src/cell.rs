//! FILENAME: src/cell.rs
//! Per-position accumulation cell.
//!
//! A cell exists for every (row path, column path) pairing a record touches,
//! subtotal pairings included. It accumulates raw contributions keyed by
//! field reference and derives the finalized output values from scratch on
//! every touch, so non-additive outputs (ratios) do not depend on record
//! arrival order.

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::definition::{DataRef, Operation, ValueFormat, ValueSeries};
use crate::error::PivotError;
use crate::value::RawValue;

pub(crate) type FormatList = SmallVec<[ValueFormat; 2]>;

pub struct PivotCell {
    final_values: SmallVec<[f64; 2]>,
    recorded: FxHashMap<DataRef, f64>,
    formats: FormatList,
}

impl PivotCell {
    pub(crate) fn new(formats: FormatList) -> Self {
        PivotCell {
            final_values: SmallVec::from_elem(0.0, formats.len()),
            recorded: FxHashMap::default(),
            formats,
        }
    }

    /// Records one raw contribution. `Sum` adds the value to the reference's
    /// running total, `Count` increments it by one ignoring the value, and
    /// `None` is never accumulated.
    pub fn record(&mut self, key: DataRef, value: f64) {
        match key.operation {
            Operation::Sum => *self.recorded.entry(key).or_insert(0.0) += value,
            Operation::Count => *self.recorded.entry(key).or_insert(0.0) += 1.0,
            Operation::None => {}
        }
    }

    /// Recomputes the finalized output at `index` for one value series.
    ///
    /// With a derivation strategy, the accumulated values for the series'
    /// references are gathered in declared order (absent references read
    /// 0.0) and the strategy applied. Without one, the series holds a single
    /// reference whose accumulated value is copied directly.
    pub fn finalize(&mut self, index: usize, series: &ValueSeries) -> Result<(), PivotError> {
        if let Some(compute) = series.compute.as_deref() {
            let elements: Vec<RawValue> = series
                .data_refs
                .iter()
                .map(|r| RawValue::Float(self.recorded.get(r).copied().unwrap_or(0.0)))
                .collect();
            let value = compute(&elements).map_err(|source| PivotError::Compute {
                context: format!("value series {:?} over {:?}", series.name, elements),
                source,
            })?;
            self.final_values[index] = value;
        } else if let Some(first) = series.data_refs.first() {
            self.final_values[index] = self.recorded.get(first).copied().unwrap_or(0.0);
        }
        Ok(())
    }

    /// The finalized output values, one per registered value series.
    pub fn values(&self) -> &[f64] {
        &self.final_values
    }
}

impl fmt::Display for PivotCell {
    /// One output renders with its own format token; several render as a
    /// bracketed, comma-separated list in declared order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.final_values.len() {
            0 => Ok(()),
            1 => f.write_str(&self.formats[0].apply(self.final_values[0])),
            _ => {
                f.write_str("[ ")?;
                for (i, value) in self.final_values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&self.formats[i].apply(*value))?;
                }
                f.write_str(" ]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::definition::{data_refs, ValueCompute};

    fn sum_ref() -> DataRef {
        DataRef::new(4, Operation::Sum)
    }

    #[test]
    fn sum_accumulates_and_count_increments() {
        let mut cell = PivotCell::new(FormatList::from_elem(ValueFormat::decimals(0), 1));
        let count_ref = DataRef::new(4, Operation::Count);
        cell.record(sum_ref(), 4.0);
        cell.record(sum_ref(), 2.5);
        cell.record(count_ref, 99.0);
        cell.record(count_ref, -1.0);

        let series = ValueSeries::new("", &[sum_ref()], None, ValueFormat::decimals(0));
        cell.finalize(0, &series).unwrap();
        assert_eq!(cell.values(), &[6.5]);

        let series = ValueSeries::new("", &[count_ref], None, ValueFormat::decimals(0));
        cell.finalize(0, &series).unwrap();
        assert_eq!(cell.values(), &[2.0]);
    }

    #[test]
    fn none_operation_is_never_accumulated() {
        let mut cell = PivotCell::new(FormatList::from_elem(ValueFormat::decimals(0), 1));
        let none_ref = DataRef::new(0, Operation::None);
        cell.record(none_ref, 7.0);
        let series = ValueSeries::new("", &[none_ref], None, ValueFormat::decimals(0));
        cell.finalize(0, &series).unwrap();
        assert_eq!(cell.values(), &[0.0]);
    }

    #[test]
    fn computed_finalize_reads_refs_in_declared_order() {
        let mut cell = PivotCell::new(FormatList::from_elem(ValueFormat::decimals(2), 1));
        let numerator = DataRef::new(5, Operation::Sum);
        let denominator = DataRef::new(3, Operation::Sum);
        cell.record(numerator, 7.0);
        cell.record(denominator, 5.0);

        let ratio: ValueCompute =
            Arc::new(|elements| Ok(elements[0].to_f64()? / elements[1].to_f64()?));
        let series = ValueSeries::new(
            "ratio",
            &[numerator, denominator],
            Some(ratio),
            ValueFormat::decimals(2),
        );
        cell.finalize(0, &series).unwrap();
        assert_eq!(cell.values(), &[1.4]);
    }

    #[test]
    fn failed_compute_surfaces_with_context() {
        let mut cell = PivotCell::new(FormatList::from_elem(ValueFormat::decimals(0), 1));
        let failing: ValueCompute = Arc::new(|_| Err("boom".into()));
        let series = ValueSeries::new(
            "bad",
            &data_refs(&[1], Operation::Sum),
            Some(failing),
            ValueFormat::decimals(0),
        );
        let err = cell.finalize(0, &series).unwrap_err();
        assert!(matches!(err, PivotError::Compute { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn renders_single_and_multiple_outputs() {
        let mut formats = FormatList::new();
        formats.push(ValueFormat::decimals(0));
        let mut cell = PivotCell::new(formats);
        cell.record(sum_ref(), 16.0);
        let series = ValueSeries::new("", &[sum_ref()], None, ValueFormat::decimals(0));
        cell.finalize(0, &series).unwrap();
        assert_eq!(cell.to_string(), "16");

        let mut formats = FormatList::new();
        formats.push(ValueFormat::decimals(0));
        formats.push(ValueFormat::decimals(2));
        let mut multi = PivotCell::new(formats);
        multi.record(sum_ref(), 2.0);
        multi
            .finalize(0, &ValueSeries::new("", &[sum_ref()], None, ValueFormat::decimals(0)))
            .unwrap();
        multi
            .finalize(1, &ValueSeries::new("", &[sum_ref()], None, ValueFormat::decimals(2)))
            .unwrap();
        assert_eq!(multi.to_string(), "[ 2, 2.00 ]");
    }
}
