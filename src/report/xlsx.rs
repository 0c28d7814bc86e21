//! Excel workbook report
//!
//! Same columns as the Markdown table on one sheet. Each data cell is
//! filled by the module's allow state: red for errors, missing licenses and
//! denials, yellow when no rule decided, green when allowed.

use super::markdown::{columns, Column};
use super::Resolution;
use crate::policy::{AllowState, Config};
use crate::{GolicenseError, GolicenseResult};
use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};

const SHEET_NAME: &str = "Sheet1";
const COLUMN_WIDTH: f64 = 40.0;

const FILL_RED: u32 = 0xFFCCCC;
const FILL_YELLOW: u32 = 0xFFC107;
const FILL_GREEN: u32 = 0x9CCC65;

/// Background color for an entry's row.
pub fn fill_color(entry: &Resolution) -> u32 {
    if entry.error.is_some() || entry.license.is_none() {
        return FILL_RED;
    }
    match entry.state {
        AllowState::Allowed => FILL_GREEN,
        AllowState::Denied => FILL_RED,
        AllowState::Unknown => FILL_YELLOW,
    }
}

/// Render results as an `.xlsx` workbook.
pub fn render(entries: &[Resolution], config: &Config) -> GolicenseResult<Vec<u8>> {
    build(entries, &columns(config)).map_err(|e| GolicenseError::Output(format!("building workbook: {}", e)))
}

fn build(entries: &[Resolution], columns: &[Column]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let red = Format::new().set_background_color(Color::RGB(FILL_RED));
    let yellow = Format::new().set_background_color(Color::RGB(FILL_YELLOW));
    let green = Format::new().set_background_color(Color::RGB(FILL_GREEN));

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
        sheet.write_string_with_format(0, col, column.title(), &header)?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let row = (i + 1) as u32;
        let fill = match fill_color(entry) {
            FILL_GREEN => &green,
            FILL_YELLOW => &yellow,
            _ => &red,
        };
        for (col, column) in columns.iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, column.cell(entry).as_str(), fill)?;
        }
    }

    workbook.save_to_buffer()
}
