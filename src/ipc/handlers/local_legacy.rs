use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_grade, get_required_path, io_err, require_confirm, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::{Month, Note, Student};
use crate::repo::{DEFAULTERS, NOTES, STUDENTS};
use crate::workspace::Workspace;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn local_backup(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let out = get_required_path(params, "outPath")?;
    let text = serde_json::to_string_pretty(ws.local.entries())
        .map_err(|e| HandlerErr::new("backup_failed", e.to_string()))?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err("create backup dir", e))?;
    }
    std::fs::write(&out, text).map_err(|e| io_err(&format!("write {}", out.display()), e))?;
    Ok(json!({ "path": out.to_string_lossy(), "keys": ws.local.entries().len() }))
}

/// Values that are not strings are stored as their JSON text.
fn local_restore(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let input = get_required_path(params, "inPath")?;
    require_confirm(params)?;
    let text = std::fs::read_to_string(&input)
        .map_err(|e| io_err(&format!("read {}", input.display()), e))?;
    let parsed: serde_json::Map<String, Value> = serde_json::from_str(&text)
        .map_err(|e| HandlerErr::bad_params(format!("not a local backup: {}", e)))?;
    let entries: BTreeMap<String, String> = parsed
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect();
    let count = entries.len();
    ws.local.replace_all(entries)?;
    tracing::info!(keys = count, "local store restored");
    Ok(json!({ "keys": count }))
}

#[derive(Debug, Deserialize)]
struct LegacyStudent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    payments: BTreeMap<String, bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDefaulter {
    student_number: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    months: Vec<String>,
}

fn legacy_array<T: for<'de> Deserialize<'de>>(ws: &Workspace, key: &str) -> Vec<T> {
    ws.local.get_json::<Vec<T>>(key).unwrap_or_default()
}

/// Move the per-grade arrays the purely-local app kept into the document
/// store. A collection that already holds documents is left alone.
fn legacy_import_local(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let repo = ws.grade(&grade);
    let mut report = serde_json::Map::new();

    let students: Vec<LegacyStudent> = legacy_array(ws, &format!("students-{}", grade));
    let status = if students.is_empty() {
        "empty"
    } else if !repo.students()?.is_empty() {
        "skipped"
    } else {
        for s in &students {
            let mut rec = Student::new(s.name.trim());
            for (k, paid) in &s.payments {
                if Month::parse(k).is_some_and(|m| m.is_billed()) {
                    rec.payments.insert(k.to_ascii_lowercase(), *paid);
                }
            }
            repo.add_student(&rec)?;
        }
        "imported"
    };
    report.insert(STUDENTS.into(), json!({ "status": status, "count": students.len() }));

    let defaulters: Vec<LegacyDefaulter> = legacy_array(ws, &format!("defaulters-{}", grade));
    let status = if defaulters.is_empty() {
        "empty"
    } else if !repo.defaulters()?.is_empty() {
        "skipped"
    } else {
        for d in &defaulters {
            let months: Vec<Month> = d.months.iter().filter_map(|m| Month::parse(m)).collect();
            repo.merge_defaulter(d.student_number, &d.name, &months)?;
        }
        "imported"
    };
    report.insert(DEFAULTERS.into(), json!({ "status": status, "count": defaulters.len() }));

    let notes: Vec<Note> = legacy_array(ws, &format!("notes-{}", grade));
    let status = if notes.is_empty() {
        "empty"
    } else if !repo.notes()?.is_empty() {
        "skipped"
    } else {
        for n in &notes {
            repo.add_note(n)?;
        }
        "imported"
    };
    report.insert(NOTES.into(), json!({ "status": status, "count": notes.len() }));

    tracing::info!(grade = %grade, "legacy local data checked");
    Ok(Value::Object(report))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "local.backup" => local_backup,
        "local.restore" => local_restore,
        "legacy.importLocal" => legacy_import_local,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
