use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    file_data_url, get_grade, get_opt_str, get_required_str, get_required_text, with_workspace,
    HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Note;
use crate::workspace::Workspace;
use serde_json::{json, Map, Value};
use std::path::PathBuf;

fn note_json(n: &Note) -> Value {
    json!({
        "id": n.id,
        "content": n.content,
        "date": n.date,
        "time": n.time,
        "image": n.image,
    })
}

fn image_param(params: &Value) -> Result<Option<String>, HandlerErr> {
    match get_opt_str(params, "imagePath").filter(|p| !p.trim().is_empty()) {
        Some(p) => file_data_url(&PathBuf::from(p)).map(Some),
        None => Ok(None),
    }
}

fn notes_list(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let notes: Vec<Value> = ws.grade(&grade).notes()?.iter().rev().map(note_json).collect();
    Ok(json!({ "notes": notes }))
}

fn notes_get(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "noteId")?;
    match ws.grade(&grade).note(&id)? {
        Some(n) => Ok(note_json(&n)),
        None => Err(HandlerErr::not_found(format!("note not found: {}", id))),
    }
}

fn notes_create(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let content = get_opt_str(params, "content")
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    let image = image_param(params)?;
    if content.is_empty() && image.is_none() {
        return Err(HandlerErr::bad_params("a note needs content or an image"));
    }
    let now = chrono::Local::now();
    let mut note = Note {
        id: String::new(),
        content,
        date: now.format("%d/%m/%Y").to_string(),
        time: now.format("%H:%M:%S").to_string(),
        image,
    };
    note.id = ws.grade(&grade).add_note(&note)?;
    Ok(note_json(&note))
}

fn notes_update(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "noteId")?;
    let content = get_required_text(params, "content")?;
    let mut patch = Map::new();
    patch.insert("content".into(), Value::String(content));
    if let Some(image) = image_param(params)? {
        patch.insert("image".into(), Value::String(image));
    }
    let repo = ws.grade(&grade);
    repo.update_note(&id, patch)?;
    match repo.note(&id)? {
        Some(n) => Ok(note_json(&n)),
        None => Err(HandlerErr::not_found(format!("note not found: {}", id))),
    }
}

fn notes_delete(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "noteId")?;
    ws.grade(&grade).delete_note(&id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "notes.list" => notes_list,
        "notes.get" => notes_get,
        "notes.create" => notes_create,
        "notes.update" => notes_update,
        "notes.delete" => notes_delete,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
