//! FILENAME: src/view.rs
//! Renderable output for a generated table.
//!
//! The grid is plain data: one header row of column path labels and one body
//! row per row path label, every cell already formatted. The grand-total row
//! and column are always last, shown as `Total`.

use serde::{Deserialize, Serialize};

/// A two-dimensional grid of formatted strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotGrid {
    /// Header row: an empty corner cell followed by the column labels.
    pub header: Vec<String>,
    /// Body rows: the row label followed by one cell per column label.
    /// Positions no record touched are empty strings.
    pub rows: Vec<Vec<String>>,
}

impl PivotGrid {
    /// Renders the grid as delimiter-joined text, one line per row.
    pub fn to_csv(&self, separator: char) -> String {
        let sep = separator.to_string();
        let mut out = String::new();
        out.push_str(&self.header.join(&sep));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(&sep));
            out.push('\n');
        }
        out
    }
}
