use crate::calendar;
use crate::ipc::helpers::{get_today, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::Month;
use chrono::Datelike;
use serde_json::{json, Value};

fn calendar_today(params: &Value) -> HandlerResult {
    let today = get_today(params)?;
    let coptic = calendar::coptic_date(today);
    let billed = Month::from_number(today.month()).filter(|m| m.is_billed());
    let due: Vec<&str> = calendar::due_months(today).iter().map(|m| m.key()).collect();
    Ok(json!({
        "date": today.format("%Y-%m-%d").to_string(),
        "weekday": today.weekday().number_from_monday(),
        "coptic": {
            "day": coptic.day,
            "month": coptic.month + 1,
            "monthName": coptic.month_name(),
            "year": coptic.year,
            "text": coptic.to_string(),
        },
        "academicYear": calendar::academic_year_label(today),
        "billedMonth": billed.map(|m| json!({ "key": m.key(), "label": m.arabic_name() })),
        "dueMonths": due,
    }))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "calendar.today" => Some(respond(req, calendar_today(&req.params))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn july_has_no_billed_month() {
        let v = calendar_today(&json!({ "today": "2027-07-10" })).expect("today");
        assert!(v["billedMonth"].is_null());
        assert_eq!(v["academicYear"], "2026/2027");
    }

    #[test]
    fn reports_the_current_billed_month() {
        let v = calendar_today(&json!({ "today": "2026-10-02" })).expect("today");
        assert_eq!(v["billedMonth"]["key"], "october");
        assert_eq!(v["dueMonths"], json!(["august", "september"]));
        assert_eq!(v["date"], "2026-10-02");
    }
}
