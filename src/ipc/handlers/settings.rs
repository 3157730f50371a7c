use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{file_data_url, get_opt_str, get_required_path, get_required_text, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::prefs;
use crate::workspace::Workspace;
use serde_json::{json, Value};

fn settings_get(ws: &mut Workspace, _cfg: &Config, _params: &Value) -> HandlerResult {
    Ok(json!({
        "settings": prefs::site_settings(&ws.local),
        "backgrounds": prefs::page_backgrounds(&ws.local),
    }))
}

fn settings_update(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let patch = params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))?;
    let updated = prefs::update_site_settings(&mut ws.local, patch).map_err(|e| match e {
        crate::store::StoreError::Json(j) => HandlerErr::bad_params(format!("invalid settings: {}", j)),
        other => other.into(),
    })?;
    Ok(json!({ "settings": updated }))
}

fn settings_set_background(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let page = get_required_text(params, "page")?;
    let url = file_data_url(&get_required_path(params, "imagePath")?)?;
    prefs::set_page_background(&mut ws.local, &page, &url)?;
    Ok(json!({ "page": page }))
}

/// Without a page (or with `all`) every background is removed.
fn settings_clear_background(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let page = get_opt_str(params, "page").filter(|p| !p.is_empty() && p != "all");
    prefs::clear_page_background(&mut ws.local, page.as_deref())?;
    Ok(json!({ "backgrounds": prefs::page_backgrounds(&ws.local) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "settings.get" => settings_get,
        "settings.update" => settings_update,
        "settings.setBackground" => settings_set_background,
        "settings.clearBackground" => settings_clear_background,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
