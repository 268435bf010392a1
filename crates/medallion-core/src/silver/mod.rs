//! Silver layer: per-table normalization of Bronze extracts
//!
//! Dispatch is over a closed set of known source tables; anything else gets
//! the baseline cleaning only.

pub mod transform;

pub use transform::{transform_table, ColumnRule};

use std::fmt;

/// Source tables the pipeline knows how to normalize.
///
/// Names follow the extract file stems (`cst_info.csv` → `cst_info`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceTable {
    /// CRM customer master
    CstInfo,
    /// ERP customer demographics
    CstAz12,
    /// CRM product master
    PrdInfo,
    /// ERP customer location
    LocA101,
    /// ERP product category
    PxCatG1v2,
    /// CRM transaction lines
    SalesDetails,
    /// Any other table: baseline cleaning only
    Other(String),
}

impl SourceTable {
    pub const KNOWN: [SourceTable; 6] = [
        SourceTable::CstInfo,
        SourceTable::CstAz12,
        SourceTable::PrdInfo,
        SourceTable::LocA101,
        SourceTable::PxCatG1v2,
        SourceTable::SalesDetails,
    ];

    /// Map a table name (file stem) to a source table, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|known| known.name().eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| SourceTable::Other(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            SourceTable::CstInfo => "cst_info",
            SourceTable::CstAz12 => "CST_AZ12",
            SourceTable::PrdInfo => "prd_info",
            SourceTable::LocA101 => "LOC_A101",
            SourceTable::PxCatG1v2 => "PX_CAT_G1V2",
            SourceTable::SalesDetails => "sales_details",
            SourceTable::Other(name) => name,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SourceTable::Other(_))
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(SourceTable::from_name("CST_INFO"), SourceTable::CstInfo);
        assert_eq!(SourceTable::from_name("loc_a101"), SourceTable::LocA101);
        assert_eq!(
            SourceTable::from_name("misc"),
            SourceTable::Other("misc".to_string())
        );
    }

    #[test]
    fn test_known_names_round_trip() {
        for table in SourceTable::KNOWN.iter() {
            assert_eq!(&SourceTable::from_name(table.name()), table);
            assert!(table.is_known());
        }
        assert_eq!(SourceTable::SalesDetails.file_name(), "sales_details.csv");
    }
}
