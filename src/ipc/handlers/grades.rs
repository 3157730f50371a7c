use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_grade, get_opt_str, get_required_str, get_required_text, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::{self, CustomStage, STAGE_COLORS};
use crate::workspace::Workspace;
use rand::seq::SliceRandom;
use serde_json::{json, Value};

fn random_color() -> String {
    STAGE_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(STAGE_COLORS[0])
        .to_string()
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Display title for a built-in or `custom<N>` grade.
pub fn grade_title(ws: &Workspace, grade: &str) -> Result<String, HandlerErr> {
    if let Some(t) = model::builtin_grade_title(grade) {
        return Ok(t.to_string());
    }
    if let Some(i) = model::custom_grade_index(grade) {
        let stages = ws.stages().list()?;
        if let Some(stage) = stages.get(i) {
            return Ok(stage.name.clone());
        }
    }
    Err(HandlerErr::not_found(format!("unknown grade: {}", grade)))
}

fn grades_list(ws: &mut Workspace, _cfg: &Config, _params: &Value) -> HandlerResult {
    let mut grades: Vec<Value> = model::BUILTIN_GRADES
        .iter()
        .map(|(id, title)| json!({ "grade": id, "title": title, "custom": false }))
        .collect();
    for (i, stage) in ws.stages().list()?.iter().enumerate() {
        grades.push(json!({
            "grade": format!("custom{}", i),
            "title": stage.name,
            "color": stage.color,
            "stageId": stage.id,
            "custom": true,
        }));
    }
    Ok(json!({ "grades": grades }))
}

fn grades_title(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let title = grade_title(ws, &grade)?;
    Ok(json!({ "grade": grade, "title": title }))
}

fn stage_json(s: &CustomStage) -> Value {
    json!({ "id": s.id, "name": s.name, "color": s.color })
}

fn stages_list(ws: &mut Workspace, _cfg: &Config, _params: &Value) -> HandlerResult {
    let stages: Vec<Value> = ws.stages().list()?.iter().map(stage_json).collect();
    Ok(json!({ "stages": stages }))
}

fn stages_create(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let name = get_required_text(params, "name")?;
    let mut stage = CustomStage {
        id: String::new(),
        name,
        color: random_color(),
    };
    stage.id = ws.stages().add(&stage)?;
    Ok(stage_json(&stage))
}

fn stages_rename(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let id = get_required_str(params, "stageId")?;
    let name = get_required_text(params, "name")?;
    ws.stages().update_field(&id, "name", &name)?;
    Ok(json!({ "ok": true }))
}

/// Without an explicit color a new one is drawn from the palette.
fn stages_recolor(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let id = get_required_str(params, "stageId")?;
    let color = match get_opt_str(params, "color") {
        Some(c) if is_hex_color(&c) => c,
        Some(c) => return Err(HandlerErr::bad_params(format!("invalid color: {}", c))),
        None => random_color(),
    };
    ws.stages().update_field(&id, "color", &color)?;
    Ok(json!({ "color": color }))
}

fn stages_delete(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let id = get_required_str(params, "stageId")?;
    ws.stages().delete(&id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "grades.list" => grades_list,
        "grades.title" => grades_title,
        "stages.list" => stages_list,
        "stages.create" => stages_create,
        "stages.rename" => stages_rename,
        "stages.recolor" => stages_recolor,
        "stages.delete" => stages_delete,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
