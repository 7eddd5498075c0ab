//! Serialization of the quote table to a local spreadsheet file.

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::debug;

use crate::core::quote::{OUTPUT_COLUMNS, QuoteTable};

pub const SHEET_NAME: &str = "Cotizaciones";

/// Single-sheet xlsx: header row followed by one row per record.
pub fn to_xlsx_bytes(table: &QuoteTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in OUTPUT_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (i, record) in table.records().iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &record.fecha)?;
        sheet.write_string(row, 1, &record.ticker)?;
        sheet.write_number(row, 2, record.close)?;
        sheet.write_number(row, 3, record.dividend)?;
        sheet.write_string(row, 4, &record.provider)?;
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn to_csv_bytes(table: &QuoteTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    // Header comes from the record's serde names, which match OUTPUT_COLUMNS
    let records = table.records();
    if records.is_empty() {
        writer.write_record(OUTPUT_COLUMNS)?;
    }
    for record in &records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))
}

/// Encodes the table according to the file extension (`.csv`, otherwise xlsx).
pub fn encode_for_path(table: &QuoteTable, path: &Path) -> Result<Vec<u8>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        to_csv_bytes(table)
    } else {
        to_xlsx_bytes(table)
    }
}

/// Writes the table to `path` and returns the bytes written.
pub fn write_table(table: &QuoteTable, path: &Path) -> Result<Vec<u8>> {
    let bytes = encode_for_path(table, path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write workbook to {}", path.display()))?;
    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(bytes)
}
