//! In-memory tabular model shared by every layer
//!
//! Cells are `Option<String>`; `None` is the single null sentinel so that
//! "missing", "empty after trimming" and "unparseable" all look the same to
//! downstream consumers.

use crate::errors::{PipelineError, Result};
use crate::normalize;
use serde::{Deserialize, Serialize};

/// One table cell
pub type Cell = Option<String>;

/// Named columns plus rows of nullable text cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Column name with an inferred value type, recorded in manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: String,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, padding short rows with nulls and truncating long ones
    /// so every row matches the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Case-insensitive column lookup, used when matching source headers
    pub fn column_index_ci(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell value by row number and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Columns from `required` that this table lacks, in the given order
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Fail with `SchemaMismatch` unless every required column is present.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SchemaMismatch` naming the missing columns.
    pub fn require_columns(&self, table: &str, required: &[&str]) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::SchemaMismatch {
                table: table.to_string(),
                missing,
            })
        }
    }

    /// Resolve column positions for a list of names, failing on any absent one.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SchemaMismatch` naming the missing columns.
    pub fn indices(&self, table: &str, names: &[&str]) -> Result<Vec<usize>> {
        self.require_columns(table, names)?;
        Ok(names
            .iter()
            .filter_map(|n| self.column_index(n))
            .collect())
    }

    /// Rewrite every cell in column `idx`
    pub fn map_column<F>(&mut self, idx: usize, f: F)
    where
        F: Fn(Option<&str>) -> Cell,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                let next = f(cell.as_deref());
                *cell = next;
            }
        }
    }

    /// Rewrite every cell in the table
    pub fn map_cells<F>(&mut self, f: F)
    where
        F: Fn(Option<&str>) -> Cell,
    {
        for idx in 0..self.columns.len() {
            self.map_column(idx, &f);
        }
    }

    /// Column names with a type inferred from the non-null values
    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnSchema {
                name: name.clone(),
                dtype: infer_dtype(self.rows.iter().filter_map(|r| r.get(idx)?.as_deref()))
                    .to_string(),
            })
            .collect()
    }
}

fn infer_dtype<'a, I>(values: I) -> &'static str
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = false;
    let mut integer = true;
    let mut decimal = true;
    let mut date = true;
    for value in values {
        seen = true;
        integer = integer && value.parse::<i64>().is_ok();
        decimal = decimal && normalize::parse_decimal(value).is_some();
        date = date && chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
        if !integer && !decimal && !date {
            return "string";
        }
    }
    match (seen, integer, decimal, date) {
        (false, ..) => "empty",
        (true, true, ..) => "integer",
        (true, false, true, _) => "decimal",
        (true, false, false, true) => "date",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Option<&str>]) -> Vec<Cell> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_from_rows_pads_and_truncates() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![cells(&[Some("1")]), cells(&[Some("1"), Some("2"), Some("3")])],
        );
        assert_eq!(table.rows()[0], cells(&[Some("1"), None]));
        assert_eq!(table.rows()[1], cells(&[Some("1"), Some("2")]));
    }

    #[test]
    fn test_require_columns_reports_missing() {
        let table = Table::new(vec!["CID".into()]);
        let err = table
            .require_columns("LOC_A101", &["CID", "CNTRY"])
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::SchemaMismatch {
                table: "LOC_A101".to_string(),
                missing: vec!["CNTRY".to_string()],
            }
        );
    }

    #[test]
    fn test_schema_inference() {
        let table = Table::from_rows(
            vec!["id".into(), "price".into(), "day".into(), "name".into(), "blank".into()],
            vec![
                cells(&[Some("1"), Some("2.5"), Some("2024-01-02"), Some("x"), None]),
                cells(&[Some("2"), Some("3"), Some("2024-02-03"), Some("7"), None]),
            ],
        );
        let dtypes: Vec<_> = table.schema().into_iter().map(|c| c.dtype).collect();
        assert_eq!(dtypes, vec!["integer", "decimal", "date", "string", "empty"]);
    }

    #[test]
    fn test_value_lookup() {
        let table = Table::from_rows(
            vec!["k".into(), "v".into()],
            vec![cells(&[Some("a"), None])],
        );
        assert_eq!(table.value(0, "k"), Some("a"));
        assert_eq!(table.value(0, "v"), None);
        assert_eq!(table.value(5, "k"), None);
        assert_eq!(table.value(0, "nope"), None);
    }
}
