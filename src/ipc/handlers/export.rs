use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::absences::sorted_absences;
use crate::ipc::handlers::exams::{build_grades_table, ExamSelection};
use crate::ipc::handlers::grades::grade_title;
use crate::ipc::helpers::{get_grade, get_required_path, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::Absence;
use crate::pdf::{self, Orientation, PdfOptions};
use crate::report::{Cell, CellClass, TableModel};
use crate::workspace::Workspace;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_FONT_SIZE: f64 = 10.0;
const MIN_FONT_SIZE: f64 = 6.0;
const MAX_FONT_SIZE: f64 = 18.0;

fn font_size(params: &Value) -> f64 {
    params
        .get("fontSize")
        .and_then(|v| v.as_f64())
        .map(|s| s.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE))
        .unwrap_or(DEFAULT_FONT_SIZE)
}

fn write_pdf(table: &TableModel, opts: &PdfOptions<'_>, out: &Path) -> HandlerResult {
    let pages = pdf::write_table(table, opts, out).map_err(|e| {
        HandlerErr::new("export_failed", format!("{e:#}"))
            .with_details(json!({ "path": out.to_string_lossy() }))
    })?;
    Ok(json!({ "path": out.to_string_lossy(), "pages": pages }))
}

/// Students absent from more than one exam are highlighted.
pub fn absences_table(title: &str, list: &[Absence]) -> TableModel {
    let mut per_student: HashMap<&str, usize> = HashMap::new();
    for a in list {
        *per_student.entry(a.student_name.as_str()).or_default() += 1;
    }
    let headers = ["م", "اسم الطالب", "رقم الامتحان", "التاريخ"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut table = TableModel::new(title, headers);
    for (i, a) in list.iter().enumerate() {
        let repeated = per_student.get(a.student_name.as_str()).copied().unwrap_or(0) > 1;
        let class = repeated.then_some(CellClass::Highlight);
        table.rows.push(vec![
            Cell::plain((i + 1).to_string()),
            Cell::with_class(a.student_name.clone(), class),
            Cell::plain(a.exam_number.clone()),
            Cell::plain(a.date.clone()),
        ]);
    }
    table
}

fn export_grades_pdf(ws: &mut Workspace, cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let out = get_required_path(params, "outPath")?;
    let selection = ExamSelection::from_params(params)?;
    let title = format!("درجات الطلاب - {}", grade_title(ws, &grade)?);
    let table = build_grades_table(&ws.grade(&grade), &title, &selection)?;
    let opts = PdfOptions {
        orientation: Orientation::Landscape,
        font_size: font_size(params),
        font_path: cfg.pdf_font.as_deref(),
    };
    write_pdf(&table, &opts, &out)
}

fn export_absences_pdf(ws: &mut Workspace, cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let out = get_required_path(params, "outPath")?;
    let title = format!("سجل الغياب - {}", grade_title(ws, &grade)?);
    let list = sorted_absences(ws.grade(&grade).absences()?);
    let opts = PdfOptions {
        orientation: Orientation::Portrait,
        font_size: font_size(params),
        font_path: cfg.pdf_font.as_deref(),
    };
    write_pdf(&absences_table(&title, &list), &opts, &out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "export.gradesPdf" => export_grades_pdf,
        "export.absencesPdf" => export_absences_pdf,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
