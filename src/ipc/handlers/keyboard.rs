use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::keyboard::{self, Key};
use serde_json::{json, Value};

fn offset(params: &Value, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(default)
}

/// Missing selection offsets mean a caret at the end of the text.
fn keyboard_apply(params: &Value) -> HandlerResult {
    let text = get_required_str(params, "text")?;
    let raw_key = get_required_str(params, "key")?;
    let key = Key::parse(&raw_key).ok_or_else(|| HandlerErr::bad_params("empty key"))?;
    let len = text.chars().count();
    let start = offset(params, "selectionStart", len);
    let end = offset(params, "selectionEnd", start);
    let edit = keyboard::apply_key(&text, start, end, &key);
    Ok(json!(edit))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "keyboard.layout" => Some(respond(req, Ok(json!(keyboard::layout())))),
        "keyboard.apply" => Some(respond(req, keyboard_apply(&req.params))),
        _ => None,
    }
}
