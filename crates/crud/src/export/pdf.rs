//! Landscape A4 table export.
//!
//! Columns share the printable width equally; cell text that would overflow
//! its column is clipped with `...`. The header row repeats on every page.

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::export::{ExportError, ExportSpec, cell_text};
use crate::Value;

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const ROW_HEIGHT: f32 = 6.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 8.0;
/// Average Helvetica glyph width at 1pt, in millimetres.
const GLYPH_MM_PER_PT: f32 = 0.18;

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// Clip `text` to roughly `max_chars`, marking the cut.
pub fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

struct Layout {
    column_width: f32,
    max_chars: usize,
}

impl Layout {
    fn new(columns: usize) -> Self {
        let usable = PAGE_WIDTH - 2.0 * MARGIN;
        let column_width = usable / columns.max(1) as f32;
        let max_chars = ((column_width - 1.0) / (BODY_SIZE * GLYPH_MM_PER_PT)).floor().max(1.0) as usize;
        Self { column_width, max_chars }
    }

    fn x(&self, col: usize) -> Mm {
        Mm(MARGIN + col as f32 * self.column_width)
    }
}

struct Pages {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    count: usize,
}

impl Pages {
    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "table");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.count += 1;
    }

    fn write_row(&mut self, layout: &Layout, cells: &[String], bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        for (col, text) in cells.iter().enumerate() {
            self.layer.use_text(
                clip(text, layout.max_chars),
                BODY_SIZE,
                layout.x(col),
                Mm(self.y),
                font,
            );
        }
        self.y -= ROW_HEIGHT;
    }

    fn has_room(&self) -> bool {
        self.y - ROW_HEIGHT >= MARGIN
    }
}

/// Render the title, generation time, header and rows into a PDF document.
pub fn render_pdf(
    spec: &ExportSpec,
    title: &str,
    generated_at: DateTime<Utc>,
    rows: &[Vec<Value>],
) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "table");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_HEIGHT - MARGIN;
    layer.use_text(title, TITLE_SIZE, Mm(MARGIN), Mm(y), &bold);
    y -= 7.0;
    layer.use_text(
        format!("Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        BODY_SIZE,
        Mm(MARGIN),
        Mm(y),
        &regular,
    );
    y -= 10.0;

    let layout = Layout::new(spec.headers().len());
    let mut pages = Pages {
        doc,
        layer,
        regular,
        bold,
        y,
        count: 1,
    };

    let headers = spec.headers().to_vec();
    pages.write_row(&layout, &headers, true);
    for values in rows {
        if !pages.has_room() {
            pages.new_page();
            pages.write_row(&layout, &headers, true);
        }
        let cells: Vec<String> = values.iter().map(cell_text).collect();
        pages.write_row(&layout, &cells, false);
    }

    tracing::debug!(rows = rows.len(), pages = pages.count, "pdf rendered");
    pages.doc.save_to_bytes().map_err(pdf_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 6), "abc...");
        assert_eq!(clip("abcdef", 2), "ab");
    }

    #[test]
    fn layout_divides_width_evenly() {
        let layout = Layout::new(4);
        assert!((layout.column_width - (PAGE_WIDTH - 2.0 * MARGIN) / 4.0).abs() < f32::EPSILON);
        assert!(layout.max_chars > 10);
    }

    #[test]
    fn renders_multi_page_document() {
        let spec = ExportSpec::new(vec!["name".into()], vec!["Name".into()]).unwrap();
        let rows: Vec<Vec<Value>> = (0..80).map(|i| vec![Value::from(format!("row {i}"))]).collect();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let bytes = render_pdf(&spec, "Items", at, &rows).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
