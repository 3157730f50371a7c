//! PDF rendering of table models.
//!
//! Rows are laid out at a fixed height and split into pages with
//! [`crate::pagination::paginate`]; every page repeats the title and the
//! header row. Columns run right to left. Glyph shaping is left to the font,
//! so Arabic text renders in isolated forms unless the configured TTF
//! carries presentation forms. Without a TTF the builtin Helvetica is used
//! and characters outside Latin-1 print as `?`.

use crate::pagination;
use crate::report::{CellClass, TableModel};
use anyhow::Context;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PT_TO_MM: f64 = 0.352_778;
const MARGIN_PT: f64 = 20.0;
const A4_SHORT_MM: f64 = 210.0;
const A4_LONG_MM: f64 = 297.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    fn size_mm(self) -> (f64, f64) {
        match self {
            Orientation::Portrait => (A4_SHORT_MM, A4_LONG_MM),
            Orientation::Landscape => (A4_LONG_MM, A4_SHORT_MM),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfOptions<'a> {
    pub orientation: Orientation,
    pub font_size: f64,
    pub font_path: Option<&'a Path>,
}

fn mm(v: f64) -> Mm {
    Mm(v as f32)
}

fn load_font(doc: &PdfDocumentReference, font_path: Option<&Path>) -> anyhow::Result<IndirectFontRef> {
    match font_path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("open font {}", p.display()))?;
            doc.add_external_font(file)
                .map_err(|e| anyhow::anyhow!("load font {}: {}", p.display(), e))
        }
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow::anyhow!("load builtin font: {}", e)),
    }
}

fn class_color(class: Option<CellClass>) -> Color {
    let (r, g, b) = match class {
        Some(CellClass::Absent) => (0.8, 0.1, 0.1),
        Some(CellClass::Perfect) => (0.1, 0.55, 0.2),
        Some(CellClass::Highlight) => (0.1, 0.3, 0.8),
        None => (0.0, 0.0, 0.0),
    };
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn rule(layer: &PdfLayerReference, x1: f64, x2: f64, y: f64) {
    layer.add_line(Line {
        points: vec![(Point::new(mm(x1), mm(y)), false), (Point::new(mm(x2), mm(y)), false)],
        is_closed: false,
    });
}

/// Column x ranges from the right edge, proportional to content width.
fn column_spans(table: &TableModel, left: f64, right: f64) -> Vec<(f64, f64)> {
    let weights: Vec<f64> = table
        .column_widths()
        .into_iter()
        .map(|w| w.clamp(2, 24) as f64)
        .collect();
    let total: f64 = weights.iter().sum();
    let width = right - left;
    let mut x = right;
    weights
        .iter()
        .map(|w| {
            let span = width * w / total.max(1.0);
            let col = (x - span, x);
            x -= span;
            col
        })
        .collect()
}

/// The builtin font only covers Latin-1.
fn latin1_only(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .collect()
}

struct PageFrame<'a> {
    layer: PdfLayerReference,
    font: &'a IndirectFontRef,
    builtin_font: bool,
    font_size: f64,
    left: f64,
    right: f64,
    row_h: f64,
}

impl PageFrame<'_> {
    fn text(&self, text: &str, x: f64, y: f64, size: f64) {
        if self.builtin_font {
            self.layer
                .use_text(latin1_only(text), size as f32, mm(x), mm(y), self.font);
        } else {
            self.layer
                .use_text(text, size as f32, mm(x), mm(y), self.font);
        }
    }

    fn row<'c, I>(&self, cells: I, spans: &[(f64, f64)], top: f64)
    where
        I: IntoIterator<Item = (&'c str, Option<CellClass>)>,
    {
        let baseline = top - self.row_h * 0.7;
        for ((text, class), (x0, _)) in cells.into_iter().zip(spans) {
            self.layer.set_fill_color(class_color(class));
            self.text(text, x0 + 1.0, baseline, self.font_size);
        }
        self.layer.set_fill_color(class_color(None));
        rule(&self.layer, self.left, self.right, top - self.row_h);
    }
}

/// Render `table` to `out`, returning the number of pages written.
pub fn write_table(table: &TableModel, opts: &PdfOptions<'_>, out: &Path) -> anyhow::Result<usize> {
    let (page_w, page_h) = opts.orientation.size_mm();
    let margin = MARGIN_PT * PT_TO_MM;
    let font_size = if opts.font_size > 0.0 { opts.font_size } else { 10.0 };
    let row_h = font_size * 1.8 * PT_TO_MM;
    let title_h = row_h * 1.5;

    // Body space per page, rounded down to whole rows. At least one row fits.
    let body_h = page_h - 2.0 * margin - title_h - row_h;
    let rows_per_page = ((body_h / row_h).floor() as usize).max(1);
    // Paginate in whole rows so the division stays exact.
    let slices = pagination::paginate(table.rows.len() as f64, rows_per_page as f64)?;
    let page_count = slices.len().max(1);

    let (doc, first_page, first_layer) =
        PdfDocument::new(table.title.as_str(), mm(page_w), mm(page_h), "table");
    let font = load_font(&doc, opts.font_path)?;
    let left = margin;
    let right = page_w - margin;
    let spans = column_spans(table, left, right);

    for page in 0..page_count {
        let layer = if page == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(mm(page_w), mm(page_h), "table");
            doc.get_page(p).get_layer(l)
        };
        let frame = PageFrame {
            layer,
            font: &font,
            builtin_font: opts.font_path.is_none(),
            font_size,
            left,
            right,
            row_h,
        };

        let mut top = page_h - margin;
        frame.text(&table.title, left, top - title_h * 0.7, font_size * 1.3);
        top -= title_h;
        frame.row(table.headers.iter().map(|h| (h.as_str(), None)), &spans, top);
        top -= row_h;

        let first_row = page * rows_per_page;
        let last_row = (first_row + rows_per_page).min(table.rows.len());
        for row in table.rows.get(first_row..last_row).unwrap_or(&[]) {
            frame.row(row.iter().map(|c| (c.text.as_str(), c.class)), &spans, top);
            top -= row_h;
        }

        let footer = format!("{} / {}", page + 1, page_count);
        frame.text(&footer, left, margin * 0.5, font_size * 0.8);
    }

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow::anyhow!("write pdf {}: {}", out.display(), e))?;
    tracing::info!(path = %out.display(), pages = page_count, "pdf written");
    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Cell;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn table(rows: usize) -> TableModel {
        let mut t = TableModel::new("Grades", vec!["#".into(), "Name".into(), "1".into()]);
        for i in 0..rows {
            t.rows.push(vec![
                Cell::plain((i + 1).to_string()),
                Cell::plain(format!("Student {}", i + 1)),
                Cell::with_class("20", Some(CellClass::Perfect)),
            ]);
        }
        t
    }

    #[test]
    fn builtin_font_text_is_latin1() {
        assert_eq!(latin1_only("Total: 20"), "Total: 20");
        assert_eq!(latin1_only("علي 5"), "??? 5");
    }

    #[test]
    fn columns_run_right_to_left() {
        let spans = column_spans(&table(1), 10.0, 110.0);
        assert_eq!(spans.len(), 3);
        assert!(spans[0].0 > spans[1].0);
        assert!((spans[0].1 - 110.0).abs() < 1e-9);
        assert!((spans[2].0 - 10.0).abs() < 1e-6);
    }

    #[test]
    fn long_tables_span_several_pages() {
        let out = std::env::temp_dir().join(format!(
            "classroomd-pdf-{}.pdf",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        let opts = PdfOptions {
            orientation: Orientation::Portrait,
            font_size: 10.0,
            font_path: None,
        };
        let pages = write_table(&table(200), &opts, &out).expect("write");
        assert!(pages > 1);
        let empty = write_table(&table(0), &opts, &out).expect("write empty");
        assert_eq!(empty, 1);
        let bytes = std::fs::read(&out).expect("read");
        assert!(bytes.starts_with(b"%PDF"));
        let _ = std::fs::remove_file(out);
    }
}
