//! Printable export.
//!
//! [`layout`] places text on US-Letter pages in points; [`render`] draws the
//! pages with `printpdf` using the built-in Helvetica fonts, so no font data
//! is embedded. Those fonts only cover Latin text.

use anyhow::{Result, anyhow};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Pt,
};

use super::{COLUMNS, ExportRow};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_X: f32 = 40.0;
const TOP: f32 = PAGE_HEIGHT - 50.0;
const BOTTOM: f32 = 50.0;
const LINE_STEP: f32 = 15.0;
const LAYER: &str = "Forecast";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Text {
        y: f32,
        font: Font,
        size: f32,
        text: String,
    },
    Rule {
        y: f32,
    },
}

pub type Page = Vec<Mark>;

/// Title, header row and rule on the first page; rows flow onto new pages
/// once the bottom margin is reached.
pub fn layout(title: &str, rows: &[ExportRow]) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut page = Page::new();
    let mut y = TOP;

    page.push(Mark::Text {
        y,
        font: Font::Bold,
        size: 14.0,
        text: title.to_string(),
    });
    y -= 20.0;
    page.push(Mark::Text {
        y,
        font: Font::Regular,
        size: 10.0,
        text: COLUMNS.join(" | "),
    });
    y -= LINE_STEP;
    page.push(Mark::Rule { y });
    y -= LINE_STEP;

    for row in rows {
        if y < BOTTOM {
            pages.push(std::mem::take(&mut page));
            y = TOP;
        }
        page.push(Mark::Text {
            y,
            font: Font::Regular,
            size: 10.0,
            text: row.cells().join(" | "),
        });
        y -= LINE_STEP;
    }
    pages.push(page);
    pages
}

pub fn render(title: &str, pages: &[Page]) -> Result<Vec<u8>> {
    let (width, height) = (Mm::from(Pt(PAGE_WIDTH)), Mm::from(Pt(PAGE_HEIGHT)));
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, LAYER);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("Failed to load Helvetica: {e:?}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("Failed to load Helvetica-Bold: {e:?}"))?;

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(width, height, LAYER);
            doc.get_page(page).get_layer(layer)
        };
        draw(&layer, page, &regular, &bold);
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow!("Failed to write PDF: {e:?}"))
}

fn draw(
    layer: &PdfLayerReference,
    page: &Page,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let at = |v: f32| Mm::from(Pt(v));
    for mark in page {
        match mark {
            Mark::Text {
                y,
                font,
                size,
                text,
            } => {
                let font = match font {
                    Font::Regular => regular,
                    Font::Bold => bold,
                };
                layer.use_text(text.as_str(), *size, at(MARGIN_X), at(*y), font);
            }
            Mark::Rule { y } => layer.add_line(Line {
                points: vec![
                    (Point::new(at(MARGIN_X), at(*y)), false),
                    (Point::new(at(PAGE_WIDTH - MARGIN_X), at(*y)), false),
                ],
                is_closed: false,
            }),
        }
    }
}
