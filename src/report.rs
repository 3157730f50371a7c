//! Table models handed to the UI and to the PDF writer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellClass {
    Absent,
    Perfect,
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<CellClass>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
        }
    }

    pub fn with_class(text: impl Into<String>, class: Option<CellClass>) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableModel {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableModel {
    pub fn new(title: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            title: title.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Widest text per column in chars, header included.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.column_count()];
        for (i, h) in self.headers.iter().enumerate() {
            widths[i] = widths[i].max(h.chars().count());
        }
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.text.chars().count());
            }
        }
        widths
    }
}

/// Class for one exam score cell: a literal "0" marks an absence, a score
/// equal to the exam's total is a perfect mark.
pub fn score_class(score: &str, total: Option<&str>) -> Option<CellClass> {
    if score == "0" {
        return Some(CellClass::Absent);
    }
    match (score.parse::<u32>(), total.and_then(|t| t.parse::<u32>().ok())) {
        (Ok(s), Some(t)) if s == t => Some(CellClass::Perfect),
        _ => None,
    }
}
