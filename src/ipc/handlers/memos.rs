use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::students::{delete_student_cascade, numbered_students};
use crate::ipc::helpers::{
    get_grade, get_opt_str, get_required_str, get_term, with_workspace, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::MemoStatus;
use crate::prefs::{self, MemoNote};
use crate::workspace::Workspace;
use serde_json::{json, Value};

fn parse_status(raw: &str) -> Result<MemoStatus, HandlerErr> {
    MemoStatus::parse(raw).ok_or_else(|| HandlerErr::bad_params(format!("invalid status: {}", raw)))
}

fn memos_list(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let term = get_term(params)?;
    let filter = get_opt_str(params, "filter")
        .filter(|f| !f.is_empty() && f != "all")
        .map(|f| parse_status(&f))
        .transpose()?;

    let repo = ws.grade(&grade);
    let memos = repo.memos()?;
    let notes = prefs::memo_notes(&ws.local, &grade, term);
    let mut counts = [0usize; 3];
    let mut rows = Vec::new();
    for (n, s) in numbered_students(&repo)? {
        if !s.has_name() {
            continue;
        }
        let status = memos.get(&s.id).map(|m| m.status(term)).unwrap_or_default();
        counts[status as usize] += 1;
        if filter.is_some_and(|f| f != status) {
            continue;
        }
        let note = notes.get(&s.id);
        rows.push(json!({
            "number": n,
            "studentId": s.id,
            "name": s.name,
            "status": status.key(),
            "statusLabel": status.label(),
            "hasNote": note.is_some(),
            "noteUpdated": note.map(|x| format!("{} - {}", x.date, x.time)),
        }));
    }
    Ok(json!({
        "term": term.number(),
        "rows": rows,
        "counts": {
            "none": counts[MemoStatus::None as usize],
            "pending": counts[MemoStatus::Pending as usize],
            "received": counts[MemoStatus::Received as usize],
        },
    }))
}

fn memos_cycle_status(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let term = get_term(params)?;
    let id = get_required_str(params, "studentId")?;
    let repo = ws.grade(&grade);
    let next = repo.memo(&id)?.status(term).next();
    repo.set_memo_status(&id, term, next)?;
    Ok(json!({ "studentId": id, "status": next.key(), "statusLabel": next.label() }))
}

fn memos_set_status(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let term = get_term(params)?;
    let id = get_required_str(params, "studentId")?;
    let status = parse_status(&get_required_str(params, "status")?)?;
    ws.grade(&grade).set_memo_status(&id, term, status)?;
    Ok(json!({ "studentId": id, "status": status.key() }))
}

fn memos_delete_student(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    delete_student_cascade(ws, &grade, &id)?;
    Ok(json!({ "ok": true }))
}

fn memos_note_get(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let term = get_term(params)?;
    let id = get_required_str(params, "studentId")?;
    let notes = prefs::memo_notes(&ws.local, &grade, term);
    Ok(json!({ "studentId": id, "note": notes.get(&id) }))
}

fn memos_note_set(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let term = get_term(params)?;
    let id = get_required_str(params, "studentId")?;
    let text = get_required_str(params, "text")?;
    let now = chrono::Local::now();
    let note = MemoNote {
        text: text.trim().to_string(),
        date: now.format("%d/%m/%Y").to_string(),
        time: now.format("%H:%M:%S").to_string(),
    };
    let has_note = !note.text.is_empty();
    prefs::set_memo_note(&mut ws.local, &grade, term, &id, Some(note))?;
    Ok(json!({ "studentId": id, "hasNote": has_note }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "memos.list" => memos_list,
        "memos.cycleStatus" => memos_cycle_status,
        "memos.setStatus" => memos_set_status,
        "memos.deleteStudent" => memos_delete_student,
        "memos.noteGet" => memos_note_get,
        "memos.noteSet" => memos_note_set,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
