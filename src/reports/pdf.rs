use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::info;

use super::{ReportError, ReportRenderer, COLUMNS};
use crate::credentials::repo_types::Credential;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const TITLE_H: f32 = 16.0;
const ROW_H: f32 = 8.0;
const CELL_PAD: f32 = 2.0;
const COL_W: f32 = (PAGE_W - 2.0 * MARGIN) / COLUMNS.len() as f32;
const MAX_CELL_CHARS: usize = 20;

const STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Tabular PDF export on A4 pages.
///
/// Text is set in the builtin Helvetica faces, which only cover Latin-1.
/// Cyrillic, CJK or emoji in a credential render without error but show up
/// as garbled glyphs. Supporting them means embedding a Unicode TTF font.
pub struct PdfReport;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn pdf_err<E: std::fmt::Debug>(e: E) -> ReportError {
    ReportError::Pdf(format!("{e:?}"))
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

fn header_blue() -> Color {
    rgb(41, 128, 185)
}

/// Shortens `text` to at most `max` chars, marking the cut with "...".
fn fit_cell(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn fill_band(layer: &PdfLayerReference, top: f32, height: f32, color: Color) {
    layer.set_fill_color(color);
    layer.add_rect(Rect::new(
        Mm(MARGIN),
        Mm(top - height),
        Mm(PAGE_W - MARGIN),
        Mm(top),
    ));
}

fn rule(layer: &PdfLayerReference, y: f32) {
    layer.set_outline_color(rgb(220, 220, 220));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(y)), false),
            (Point::new(Mm(PAGE_W - MARGIN), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn draw_title(layer: &PdfLayerReference, fonts: &Fonts, top: f32, stamp: &str) {
    fill_band(layer, top, TITLE_H, header_blue());
    layer.set_fill_color(rgb(255, 255, 255));
    layer.use_text("MY CREDENTIALS", 20.0, Mm(PAGE_W / 2.0 - 28.0), Mm(top - 11.0), &fonts.bold);
    layer.set_fill_color(rgb(64, 64, 64));
    layer.use_text(
        format!("Report date: {stamp}"),
        12.0,
        Mm(MARGIN),
        Mm(top - TITLE_H - 8.0),
        &fonts.regular,
    );
}

fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, top: f32) {
    fill_band(layer, top, ROW_H, header_blue());
    layer.set_fill_color(rgb(255, 255, 255));
    for (i, title) in COLUMNS.iter().enumerate() {
        let x = MARGIN + i as f32 * COL_W + CELL_PAD;
        layer.use_text(*title, 11.0, Mm(x), Mm(top - ROW_H + 2.5), &fonts.bold);
    }
}

fn draw_row(layer: &PdfLayerReference, fonts: &Fonts, top: f32, cells: &[String; 5]) {
    layer.set_fill_color(rgb(0, 0, 0));
    for (i, value) in cells.iter().enumerate() {
        let x = MARGIN + i as f32 * COL_W + CELL_PAD;
        layer.use_text(
            fit_cell(value, MAX_CELL_CHARS),
            9.0,
            Mm(x),
            Mm(top - ROW_H + 2.5),
            &fonts.regular,
        );
    }
    rule(layer, top - ROW_H);
}

impl ReportRenderer for PdfReport {
    fn render(&self, rows: &[Credential]) -> Result<Vec<u8>, ReportError> {
        let stamp = OffsetDateTime::now_utc().format(STAMP_FORMAT)?;

        let (doc, page, layer) =
            PdfDocument::new("My credentials", Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
        };

        let mut layer = doc.get_page(page).get_layer(layer);
        let mut top = PAGE_H - MARGIN;

        draw_title(&layer, &fonts, top, &stamp);
        top -= TITLE_H + 16.0;
        draw_header(&layer, &fonts, top);
        top -= ROW_H;

        for c in rows {
            if top - ROW_H < MARGIN {
                let (next_page, next_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
                layer = doc.get_page(next_page).get_layer(next_layer);
                top = PAGE_H - MARGIN;
                draw_header(&layer, &fonts, top);
                top -= ROW_H;
            }
            let cells = [
                c.name.clone(),
                c.url.clone(),
                c.username.clone(),
                c.password.clone(),
                c.created_date.format(DATE_FORMAT)?,
            ];
            draw_row(&layer, &fonts, top, &cells);
            top -= ROW_H;
        }

        let bytes = doc.save_to_bytes().map_err(pdf_err)?;
        info!(rows = rows.len(), size = bytes.len(), "pdf report rendered");
        Ok(bytes)
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn file_name(&self) -> &'static str {
        "credentials.pdf"
    }
}
