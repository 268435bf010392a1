use super::SourceTable;
use crate::errors::{PipelineError, Result};
use crate::normalize;
use crate::table::{Cell, Table};

/// Typed normalization applied to one column after baseline cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    Integer,
    Decimal,
    Date,
    Gender,
    MaritalStatus,
    Flag,
}

impl ColumnRule {
    fn apply(self, value: Option<&str>) -> Cell {
        match self {
            ColumnRule::Integer => normalize::normalize_int(value),
            ColumnRule::Decimal => normalize::normalize_decimal(value),
            ColumnRule::Date => normalize::normalize_date(value),
            ColumnRule::Gender => normalize::normalize_gender(value),
            ColumnRule::MaritalStatus => normalize::normalize_marital(value),
            ColumnRule::Flag => normalize::normalize_flag(value),
        }
    }
}

/// Column rules per table. Columns are matched case-insensitively and rules
/// for columns a given extract lacks are ignored.
pub fn column_rules(table: &SourceTable) -> &'static [(&'static str, ColumnRule)] {
    match table {
        SourceTable::CstInfo => &[
            ("cst_id", ColumnRule::Integer),
            ("cst_create_date", ColumnRule::Date),
            ("cst_gndr", ColumnRule::Gender),
            ("cst_marital_status", ColumnRule::MaritalStatus),
        ],
        SourceTable::CstAz12 => &[
            ("BDATE", ColumnRule::Date),
            ("DOB", ColumnRule::Date),
            ("GEN", ColumnRule::Gender),
            ("GENDER", ColumnRule::Gender),
        ],
        SourceTable::PrdInfo => &[
            ("prd_id", ColumnRule::Integer),
            ("prd_cost", ColumnRule::Decimal),
            ("prd_start_dt", ColumnRule::Date),
            ("prd_end_dt", ColumnRule::Date),
        ],
        SourceTable::PxCatG1v2 => &[("MAINTENANCE", ColumnRule::Flag)],
        SourceTable::SalesDetails => &[
            ("sls_cust_id", ColumnRule::Integer),
            ("sls_order_dt", ColumnRule::Date),
            ("sls_ship_dt", ColumnRule::Date),
            ("sls_due_dt", ColumnRule::Date),
            ("sls_sales", ColumnRule::Decimal),
            ("sls_quantity", ColumnRule::Decimal),
            ("sls_price", ColumnRule::Decimal),
        ],
        SourceTable::LocA101 | SourceTable::Other(_) => &[],
    }
}

/// Trim every textual cell and turn empty strings into nulls.
pub fn baseline_clean(table: &mut Table) {
    table.map_cells(normalize::clean_text);
}

/// Normalize one table: baseline cleaning, then the table's column rules.
///
/// Row count and column order are preserved.
///
/// # Errors
///
/// Returns `PipelineError::RowCountDrift` if the output shape differs from
/// the input, which would indicate a broken rule.
pub fn transform_table(source: &SourceTable, input: &Table) -> Result<Table> {
    let mut output = input.clone();
    baseline_clean(&mut output);

    for (column, rule) in column_rules(source) {
        if let Some(idx) = output.column_index_ci(column) {
            output.map_column(idx, |v| rule.apply(v));
        }
    }

    if output.len() != input.len() || output.columns() != input.columns() {
        return Err(PipelineError::RowCountDrift {
            table: source.name().to_string(),
            rows_in: input.len(),
            rows_out: output.len(),
        });
    }
    Ok(output)
}
