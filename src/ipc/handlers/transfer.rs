use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{require_confirm, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, BUILTIN_GRADES};
use crate::prefs;
use crate::store::ObjectStore;
use crate::workspace::Workspace;
use serde_json::{json, Value};

/// Wipe a grade's collections, its uploaded files and its keys in the
/// local store.
fn clear_grade(ws: &mut Workspace, grade: &str) -> Result<usize, HandlerErr> {
    for item in ws.grade(grade).curriculum()? {
        ws.objects.delete(&item.storage_path)?;
    }
    let removed = ws.grade(grade).clear_all()?;
    let keys = prefs::legacy_grade_keys(grade);
    ws.local.remove_where(|k| keys.iter().any(|x| x == k))?;
    Ok(removed)
}

/// Promote every built-in grade's students by one grade. Runs from the top
/// grade down so each destination is emptied before it is filled; the top
/// grade graduates and the bottom grade ends empty.
pub fn annual_transfer(ws: &mut Workspace) -> Result<Vec<Value>, HandlerErr> {
    for (grade, _) in BUILTIN_GRADES {
        ws.grade(grade).clear_defaulters()?;
    }
    ws.local.remove_where(|k| k.starts_with("defaulters-"))?;
    ws.forget_defaulters_refresh();

    let mut moves = Vec::new();
    for i in (0..BUILTIN_GRADES.len()).rev() {
        let (grade, _) = BUILTIN_GRADES[i];
        let students = ws.grade(grade).students()?;
        clear_grade(ws, grade)?;
        let Some((next, _)) = BUILTIN_GRADES.get(i + 1) else {
            tracing::info!(grade, count = students.len(), "graduated");
            moves.push(json!({ "from": grade, "to": null, "count": students.len() }));
            continue;
        };
        clear_grade(ws, next)?;
        let repo = ws.grade(next);
        for s in &students {
            repo.add_student(&Student::new(s.name.clone()))?;
        }
        tracing::info!(from = grade, to = *next, count = students.len(), "students promoted");
        moves.push(json!({ "from": grade, "to": next, "count": students.len() }));
    }
    Ok(moves)
}

fn transfer_annual(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    require_confirm(params)?;
    let moves = annual_transfer(ws)?;
    Ok(json!({ "moves": moves }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "transfer.annual" => Some(with_workspace(state, req, transfer_annual)),
        _ => None,
    }
}
