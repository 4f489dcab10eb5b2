//! FILENAME: src/strategies.rs
//! Stock ordering, predicate, and derivation strategies.
//!
//! The engine only ever consumes these through their function contracts;
//! anything with the right signature plugs in the same way.

use std::sync::Arc;

use crate::definition::{Filter, LabelCompute, Sort, StrategyError, ValueCompute, ValueFormat};
use crate::value::RawValue;

/// Case-insensitive ascending label order.
pub fn alpha_sort() -> Sort {
    Arc::new(|mut labels: Vec<String>| {
        labels.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
        labels
    })
}

/// Case-insensitive descending label order.
pub fn reverse_alpha_sort() -> Sort {
    Arc::new(|mut labels: Vec<String>| {
        labels.sort_by(|a, b| b.to_lowercase().cmp(&a.to_lowercase()));
        labels
    })
}

/// Fixed-vocabulary order: labels appear in vocabulary order and labels
/// outside the vocabulary are dropped.
pub fn fixed_order<I, S>(vocabulary: I) -> Sort
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let vocabulary: Vec<String> = vocabulary.into_iter().map(Into::into).collect();
    Arc::new(move |labels: Vec<String>| {
        vocabulary
            .iter()
            .filter(|entry| labels.iter().any(|label| label == *entry))
            .cloned()
            .collect()
    })
}

/// Calendar order over three-letter month abbreviations.
pub fn month_sort() -> Sort {
    fixed_order([
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ])
}

/// Membership predicate accepting only the listed text values.
pub fn in_list<I, S>(values: I) -> Filter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    Arc::new(move |value: &RawValue| match value {
        RawValue::Text(s) => values.iter().any(|v| v == s),
        _ => false,
    })
}

/// Manual bucketing: maps a text value to the label of the group listing it,
/// or to `other_label` when no group does.
pub fn group(
    groups: Vec<(String, Vec<String>)>,
    other_label: impl Into<String>,
) -> LabelCompute {
    let other = other_label.into();
    Arc::new(move |elements: &[RawValue]| {
        let element = elements
            .first()
            .ok_or_else(|| -> StrategyError { "no elements given".into() })?;
        let text = match element {
            RawValue::Text(s) => s,
            value => return Err(invalid_type(value)),
        };
        for (label, members) in &groups {
            if members.iter().any(|member| member == text) {
                return Ok(label.clone());
            }
        }
        Ok(other.clone())
    })
}

/// Sums every element of the tuple.
pub fn sum() -> ValueCompute {
    Arc::new(|elements: &[RawValue]| {
        let mut result = 0.0;
        for element in elements {
            result += element.to_f64()?;
        }
        Ok(result)
    })
}

/// Sums the `sum_group`-th (1-based) block of `group_size` consecutive
/// elements of the tuple.
pub fn partial_sum(sum_group: usize, group_size: usize) -> ValueCompute {
    Arc::new(move |elements: &[RawValue]| {
        let start = group_size * sum_group.saturating_sub(1);
        let end = group_size * sum_group;
        let mut result = 0.0;
        for element in elements.iter().take(end).skip(start) {
            result += element.to_f64()?;
        }
        Ok(result)
    })
}

/// Fixed-point display format with `n` decimals.
pub fn digits(n: usize) -> ValueFormat {
    ValueFormat::decimals(n)
}

fn invalid_type(element: &RawValue) -> StrategyError {
    format!("invalid type for element {element:?}").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn alpha_sorts_case_insensitively() {
        let sort = alpha_sort();
        let out = (*sort)(labels(&["b2", "A1", "a3"]));
        assert_eq!(out, labels(&["A1", "a3", "b2"]));
    }

    #[test]
    fn month_sort_orders_and_filters() {
        let sort = month_sort();
        let out = (*sort)(labels(&["Mar", "Jan", "Sometime", "Feb"]));
        assert_eq!(out, labels(&["Jan", "Feb", "Mar"]));
    }

    #[test]
    fn in_list_accepts_only_listed_text() {
        let filter = in_list(["B1"]);
        assert!((*filter)(&RawValue::from("B1")));
        assert!(!(*filter)(&RawValue::from("B2")));
        assert!(!(*filter)(&RawValue::Int(1)));
    }

    #[test]
    fn group_buckets_members_and_defaults_to_other() {
        let compute = group(
            vec![
                ("East".to_string(), labels(&["NY", "MA"])),
                ("West".to_string(), labels(&["CA"])),
            ],
            "Other",
        );
        assert_eq!((*compute)(&[RawValue::from("MA")]).unwrap(), "East");
        assert_eq!((*compute)(&[RawValue::from("CA")]).unwrap(), "West");
        assert_eq!((*compute)(&[RawValue::from("TX")]).unwrap(), "Other");
        assert!((*compute)(&[RawValue::Int(3)]).is_err());
    }

    #[test]
    fn partial_sum_takes_one_block() {
        let compute = partial_sum(2, 2);
        let elements = [
            RawValue::Float(1.0),
            RawValue::Float(2.0),
            RawValue::Float(10.0),
            RawValue::Float(20.0),
        ];
        assert_eq!((*compute)(&elements).unwrap(), 30.0);
    }
}
