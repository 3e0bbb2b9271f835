use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use time::{format_description::FormatItem, macros::format_description};
use tracing::info;

use super::{ReportError, ReportRenderer, COLUMNS};
use crate::credentials::repo_types::Credential;

const SHEET_NAME: &str = "Credentials";
const HEADER_FILL: Color = Color::RGB(0x2980B9);
const ROW_HEIGHT: f64 = 25.0;
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[day]/[month]/[year]");

pub struct ExcelReport;

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_size(11.0)
        .set_font_color(Color::White)
        .set_background_color(HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border_bottom(FormatBorder::Thin)
        .set_border_bottom_color(Color::Gray)
}

fn data_format() -> Format {
    Format::new()
        .set_font_size(10.0)
        .set_font_color(Color::Black)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border_bottom(FormatBorder::Thin)
        .set_border_bottom_color(Color::Silver)
}

impl ReportRenderer for ExcelReport {
    fn render(&self, rows: &[Credential]) -> Result<Vec<u8>, ReportError> {
        let header = header_format();
        let data = data_format();

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, title) in COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (i, c) in rows.iter().enumerate() {
            let row = (i + 1) as u32;
            let date = c.created_date.format(DATE_FORMAT)?;
            let cells = [&c.name, &c.url, &c.username, &c.password, &date];
            for (col, value) in cells.into_iter().enumerate() {
                sheet.write_string_with_format(row, col as u16, value.as_str(), &data)?;
            }
            sheet.set_row_height(row, ROW_HEIGHT)?;
        }

        sheet.autofit();

        let bytes = workbook.save_to_buffer()?;
        info!(rows = rows.len(), size = bytes.len(), "excel report rendered");
        Ok(bytes)
    }

    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn file_name(&self) -> &'static str {
        "credentials.xlsx"
    }
}
