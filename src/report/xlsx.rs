//! `.xlsx` output (feature `xlsx`).

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::{CompareError, CompareResult};
use crate::types::Value;

use super::render::{Renderer, Table, TableRenderer};
use super::DiffResult;

/// Writes the [`TableRenderer`] tables as worksheets, one per table, with a bold header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRenderer;

impl XlsxRenderer {
    /// Render and save to `path`.
    pub fn write_to_path(&self, result: &DiffResult, path: impl AsRef<Path>) -> CompareResult<()> {
        let mut workbook = self.workbook(result)?;
        workbook.save(path.as_ref())?;
        Ok(())
    }

    fn workbook(&self, result: &DiffResult) -> CompareResult<Workbook> {
        let tables = TableRenderer.render(result)?;
        let header = Format::new().set_bold();
        let mut workbook = Workbook::new();
        for table in tables.iter() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(&table.name)?;
            write_table(sheet, table, &header)?;
        }
        Ok(workbook)
    }
}

impl Renderer for XlsxRenderer {
    /// The workbook file contents.
    type Output = Vec<u8>;

    fn render(&self, result: &DiffResult) -> CompareResult<Vec<u8>> {
        let mut workbook = self.workbook(result)?;
        Ok(workbook.save_to_buffer()?)
    }
}

fn write_table(sheet: &mut Worksheet, table: &Table, header: &Format) -> CompareResult<()> {
    for (c, name) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col(c)?, name, header)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| CompareError::config(format!("sheet '{}' has too many rows", table.name)))?;
        for (c, value) in row.iter().enumerate() {
            let c = col(c)?;
            match value {
                Value::Null => {}
                Value::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                Value::Int64(i) => match exact_f64(*i) {
                    Some(n) => {
                        sheet.write_number(r, c, n)?;
                    }
                    // Beyond 2^53 a number cell would round; keep the digits as text.
                    None => {
                        sheet.write_string(r, c, i.to_string())?;
                    }
                },
                Value::Float64(f) => {
                    sheet.write_number(r, c, *f)?;
                }
                Value::Utf8(s) => {
                    sheet.write_string(r, c, s)?;
                }
            }
        }
    }
    Ok(())
}

/// `i` as a float, if that conversion is exact.
fn exact_f64(i: i64) -> Option<f64> {
    const MAX_EXACT: i64 = 1 << 53;
    (-MAX_EXACT..=MAX_EXACT).contains(&i).then_some(i as f64)
}

fn col(c: usize) -> CompareResult<u16> {
    u16::try_from(c).map_err(|_| CompareError::config(format!("column index {c} exceeds the sheet limit")))
}
