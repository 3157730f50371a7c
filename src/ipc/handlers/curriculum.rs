use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_grade, get_required_str, io_err, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::{guess_mime, CurriculumItem, FileKind};
use crate::store::ObjectStore;
use crate::workspace::Workspace;
use serde_json::{json, Value};
use std::path::PathBuf;

struct Upload {
    path: PathBuf,
    name: String,
    mime: String,
}

fn parse_uploads(params: &Value) -> Result<Vec<Upload>, HandlerErr> {
    let files = params
        .get("files")
        .and_then(|v| v.as_array())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| HandlerErr::bad_params("choose at least one file"))?;
    files
        .iter()
        .map(|f| {
            let path = PathBuf::from(get_required_str(f, "path")?);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    HandlerErr::bad_params(format!("not a file: {}", path.display()))
                })?;
            let mime = f
                .get("type")
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
                .unwrap_or_else(|| guess_mime(&name).to_string());
            Ok(Upload { path, name, mime })
        })
        .collect()
}

fn item_json(item: &CurriculumItem) -> Value {
    json!({
        "id": item.id,
        "name": item.name,
        "type": item.mime_type,
        "kind": FileKind::from_mime(&item.mime_type),
        "url": item.url,
    })
}

fn curriculum_add(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let section = get_required_str(params, "section")?.trim().to_string();
    if section.is_empty() || section == "none" {
        return Err(HandlerErr::bad_params("choose a section first"));
    }
    let uploads = parse_uploads(params)?;

    let repo = ws.grade(&grade);
    let mut added = Vec::new();
    for up in uploads {
        let bytes = std::fs::read(&up.path)
            .map_err(|e| io_err(&format!("read {}", up.path.display()), e))?;
        let storage_path = format!("{}/curriculum/{}/{}", grade, section, up.name);
        ws.objects.upload(&storage_path, &bytes)?;
        let mut item = CurriculumItem {
            id: String::new(),
            section: section.clone(),
            name: up.name,
            mime_type: up.mime,
            url: ws.objects.download_url(&storage_path)?,
            storage_path,
        };
        item.id = repo.add_curriculum_item(&item)?;
        added.push(item_json(&item));
    }
    Ok(json!({ "added": added }))
}

/// Items grouped by section in first-seen order.
fn curriculum_list(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let mut sections: Vec<(String, Vec<Value>)> = Vec::new();
    for item in ws.grade(&grade).curriculum()? {
        match sections.iter_mut().find(|(s, _)| *s == item.section) {
            Some((_, items)) => items.push(item_json(&item)),
            None => sections.push((item.section.clone(), vec![item_json(&item)])),
        }
    }
    let sections: Vec<Value> = sections
        .into_iter()
        .map(|(section, items)| json!({ "section": section, "items": items }))
        .collect();
    Ok(json!({ "sections": sections }))
}

fn require_item(ws: &Workspace, grade: &str, id: &str) -> Result<CurriculumItem, HandlerErr> {
    ws.grade(grade)
        .curriculum_item(id)?
        .ok_or_else(|| HandlerErr::not_found(format!("curriculum item not found: {}", id)))
}

fn curriculum_view(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "itemId")?;
    let item = require_item(ws, &grade, &id)?;
    let url = ws.objects.download_url(&item.storage_path)?;
    Ok(json!({ "url": url, "kind": FileKind::from_mime(&item.mime_type), "name": item.name }))
}

/// The stored object goes first so a failed delete leaves the record visible.
fn curriculum_delete(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "itemId")?;
    let item = require_item(ws, &grade, &id)?;
    ws.objects.delete(&item.storage_path)?;
    ws.grade(&grade).delete_curriculum_item(&id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "curriculum.add" => curriculum_add,
        "curriculum.list" => curriculum_list,
        "curriculum.view" => curriculum_view,
        "curriculum.delete" => curriculum_delete,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
