use super::error::{err, ok, HandlerErr};
use super::types::{AppState, Request};
use crate::config::Config;
use crate::model::{self, Term};
use crate::workspace::Workspace;
use base64::Engine;
use chrono::NaiveDate;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub type HandlerResult = Result<Value, HandlerErr>;

/// Run `f` against the open workspace, rendering its result as a response.
pub fn with_workspace<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&mut Workspace, &Config, &Value) -> HandlerResult,
{
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(req, f(ws, &state.config, &req.params))
}

pub fn respond(req: &Request, result: HandlerResult) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            tracing::warn!(method = %req.method, id = %req.id, code = e.code, "{}", e.message);
            e.response(&req.id)
        }
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Non-empty after trimming.
pub fn get_required_text(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let s = get_required_str(params, key)?;
    let t = s.trim();
    if t.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(t.to_string())
}

pub fn get_required_path(params: &Value, key: &str) -> Result<PathBuf, HandlerErr> {
    get_required_text(params, key).map(PathBuf::from)
}

pub fn get_grade(params: &Value) -> Result<String, HandlerErr> {
    let grade = get_required_str(params, "grade")?;
    if !model::is_valid_grade(&grade) {
        return Err(HandlerErr::bad_params(format!("invalid grade: {}", grade)));
    }
    Ok(grade)
}

pub fn get_term(params: &Value) -> Result<Term, HandlerErr> {
    let raw = match params.get("term") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err(HandlerErr::bad_params("missing term")),
    };
    Term::parse(&raw).ok_or_else(|| HandlerErr::bad_params(format!("invalid term: {}", raw)))
}

/// Destructive batch operations must be confirmed explicitly.
pub fn require_confirm(params: &Value) -> Result<(), HandlerErr> {
    if params.get("confirm").and_then(|v| v.as_bool()) == Some(true) {
        Ok(())
    } else {
        Err(HandlerErr::new(
            "not_confirmed",
            "this operation requires confirm: true",
        ))
    }
}

/// `params.today` as `YYYY-MM-DD`, falling back to the local date.
pub fn get_today(params: &Value) -> Result<NaiveDate, HandlerErr> {
    match params.get("today").and_then(|v| v.as_str()) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| HandlerErr::bad_params(format!("invalid today {}: {}", s, e))),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Read a file and encode it as a `data:` URL.
pub fn file_data_url(path: &Path) -> Result<String, HandlerErr> {
    let bytes = std::fs::read(path).map_err(|e| {
        HandlerErr::new("io_failed", format!("read {}: {}", path.display(), e))
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(format!(
        "data:{};base64,{}",
        model::guess_mime(&name),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

pub fn io_err(context: &str, e: impl std::fmt::Display) -> HandlerErr {
    HandlerErr::new("io_failed", format!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn param_getters() {
        let p = json!({ "grade": "prim1", "name": "  ", "term": 2, "confirm": true });
        assert_eq!(get_grade(&p).expect("grade"), "prim1");
        assert_eq!(get_required_text(&p, "name").unwrap_err().code, "bad_params");
        assert_eq!(get_term(&p).expect("term"), Term::Second);
        assert!(require_confirm(&p).is_ok());
        assert_eq!(
            require_confirm(&json!({})).unwrap_err().code,
            "not_confirmed"
        );
        assert!(get_grade(&json!({ "grade": "../etc" })).is_err());
    }

    #[test]
    fn today_param_parses_iso_dates() {
        let d = get_today(&json!({ "today": "2026-10-03" })).expect("today");
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 10, 3).expect("date"));
        assert!(get_today(&json!({ "today": "03/10/2026" })).is_err());
    }
}
