use crate::calendar;
use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_grade, get_required_str, get_today, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::Month;
use crate::workspace::Workspace;
use chrono::NaiveDate;
use serde_json::{json, Value};

/// Merge every named student's unpaid months into the grade's defaulters.
/// A student's number is their position in the list.
pub fn refresh(ws: &mut Workspace, grade: &str, today: NaiveDate) -> Result<usize, HandlerErr> {
    let mut flagged = 0;
    {
        let repo = ws.grade(grade);
        for (i, s) in repo.students()?.iter().enumerate() {
            if !s.has_name() {
                continue;
            }
            let unpaid = calendar::unpaid_months(s, today);
            if unpaid.is_empty() {
                continue;
            }
            repo.merge_defaulter(i as u32 + 1, &s.name, &unpaid)?;
            flagged += 1;
        }
    }
    ws.mark_defaulters_refreshed(grade);
    tracing::debug!(grade, flagged, %today, "defaulters refreshed");
    Ok(flagged)
}

fn month_label(key: &str) -> String {
    Month::parse(key)
        .map(|m| m.arabic_name().to_string())
        .unwrap_or_else(|| key.to_string())
}

fn defaulters_refresh(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let today = get_today(params)?;
    let flagged = refresh(ws, &grade, today)?;
    Ok(json!({ "flagged": flagged }))
}

fn defaulters_list(ws: &mut Workspace, cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    if !ws.defaulters_fresh(&grade, cfg.defaulters_refresh_interval()) {
        let today = get_today(params)?;
        refresh(ws, &grade, today)?;
    }
    let rows: Vec<Value> = ws
        .grade(&grade)
        .defaulters()?
        .iter()
        .map(|d| {
            json!({
                "id": d.id,
                "studentNumber": d.student_number,
                "name": d.name,
                "months": d.months,
                "monthLabels": d.months.iter().map(|m| month_label(m)).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(json!({ "rows": rows }))
}

fn defaulters_remove(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "defaulterId")?;
    ws.grade(&grade).remove_defaulter(&id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "defaulters.refresh" => defaulters_refresh,
        "defaulters.list" => defaulters_list,
        "defaulters.remove" => defaulters_remove,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
