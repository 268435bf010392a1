//! CSV reading and writing for the in-memory table model
//!
//! Empty fields read as null; null cells write as empty fields. Rows with a
//! different field count than the header are a parse error.

#![allow(clippy::result_large_err)]

use crate::atomic::atomic_write;
use crate::errors::{csv_error, io_error, Result};
use medallion_core::digest::sha256_hex;
use medallion_core::table::Table;
use std::path::Path;

/// Read a whole CSV file with a header row
pub fn read_table(path: &Path) -> Result<Table> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| io_error("read_csv", e))?;
    read_table_from(file, &display)
}

/// Read CSV from any reader; `label` names the source in errors
pub fn read_table_from<R: std::io::Read>(reader: R, label: &str) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error("read_csv", label, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in rdr.records() {
        let record = record.map_err(|e| csv_error("read_csv", label, e))?;
        table.push_row(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(table)
}

/// Serialize a table to CSV bytes
pub fn table_to_bytes(table: &Table, label: &str) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table.columns())
        .map_err(|e| csv_error("write_csv", label, e))?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
            .map_err(|e| csv_error("write_csv", label, e))?;
    }
    wtr.into_inner()
        .map_err(|e| io_error("write_csv", e.into_error()))
}

/// Atomically write a table as CSV; returns the SHA-256 of the written bytes
pub fn write_table(path: &Path, table: &Table) -> Result<String> {
    let bytes = table_to_bytes(table, &path.display().to_string())?;
    atomic_write(path, &bytes)?;
    Ok(sha256_hex(&bytes))
}
