use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_grade, get_required_str, get_required_text, require_confirm, with_workspace,
    HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Month, Student};
use crate::prefs;
use crate::repo::{GradeRepo, ABSENCES, EXAMS, STUDENTS};
use crate::search::{self, SearchRow};
use crate::workspace::Workspace;
use serde_json::{json, Value};

/// Students in list order with their 1-based row numbers.
pub fn numbered_students(repo: &GradeRepo<'_>) -> Result<Vec<(usize, Student)>, HandlerErr> {
    Ok(repo
        .students()?
        .into_iter()
        .enumerate()
        .map(|(i, s)| (i + 1, s))
        .collect())
}

pub fn search_outcome(students: &[(usize, Student)], query: &str) -> Value {
    let rows: Vec<SearchRow> = students
        .iter()
        .map(|(n, s)| SearchRow {
            number: *n,
            name: s.name.clone(),
        })
        .collect();
    json!(search::search_rows(&rows, query))
}

fn require_student(repo: &GradeRepo<'_>, id: &str) -> Result<Student, HandlerErr> {
    repo.student(id)?
        .ok_or_else(|| HandlerErr::not_found(format!("student not found: {}", id)))
}

/// Remove a student and everything keyed by their id.
pub fn delete_student_cascade(ws: &mut Workspace, grade: &str, id: &str) -> Result<(), HandlerErr> {
    {
        let repo = ws.grade(grade);
        require_student(&repo, id)?;
        repo.delete_student(id)?;
        repo.delete_exam_scores(id)?;
        repo.delete_memo(id)?;
        repo.delete_absences_for(id)?;
    }
    prefs::forget_student(&mut ws.local, grade, id)?;
    Ok(())
}

fn students_list(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let notes = prefs::student_notes(&ws.local, &grade);
    let students = numbered_students(&ws.grade(&grade))?;
    let empty_slots: Vec<usize> = students
        .iter()
        .filter(|(_, s)| !s.has_name())
        .map(|(n, _)| *n)
        .collect();
    let rows: Vec<Value> = students
        .iter()
        .map(|(n, s)| {
            json!({
                "id": s.id,
                "number": n,
                "name": s.name,
                "payments": s.payments,
                "hasNote": notes.contains_key(&s.id),
            })
        })
        .collect();
    Ok(json!({
        "months": Month::BILLED.iter().map(|m| json!({ "key": m.key(), "label": m.arabic_name() })).collect::<Vec<_>>(),
        "rows": rows,
        "emptySlots": empty_slots,
    }))
}

fn students_create(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let name = get_required_text(params, "name")?;
    let repo = ws.grade(&grade);
    if repo.students()?.iter().any(|s| s.name == name) {
        return Err(HandlerErr::new("duplicate", "student already exists")
            .with_details(json!({ "name": name })));
    }
    let id = repo.add_student(&Student::new(name.clone()))?;
    Ok(json!({ "studentId": id, "name": name }))
}

fn students_rename(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    let name = get_required_text(params, "name")?;
    ws.grade(&grade).rename_student(&id, &name)?;
    Ok(json!({ "studentId": id, "name": name }))
}

fn students_toggle_payment(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    let raw = get_required_str(params, "month")?;
    let month = Month::parse(&raw)
        .filter(|m| m.is_billed())
        .ok_or_else(|| HandlerErr::bad_params(format!("invalid month: {}", raw)))?;
    let repo = ws.grade(&grade);
    let mut student = require_student(&repo, &id)?;
    let paid = !student.is_paid(month);
    student.payments.insert(month.key().to_string(), paid);
    repo.set_payments(&id, &student.payments)?;
    Ok(json!({ "studentId": id, "month": month.key(), "paid": paid }))
}

fn students_delete(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    delete_student_cascade(ws, &grade, &id)?;
    Ok(json!({ "ok": true }))
}

fn students_delete_all(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    require_confirm(params)?;
    let repo = ws.grade(&grade);
    let mut removed = 0;
    for name in [STUDENTS, EXAMS, ABSENCES] {
        removed += repo.clear(name)?;
    }
    tracing::info!(grade = %grade, removed, "deleted all students");
    Ok(json!({ "removed": removed }))
}

fn students_search(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let query = get_required_str(params, "query")?;
    let students = numbered_students(&ws.grade(&grade))?;
    Ok(search_outcome(&students, &query))
}

fn students_note_get(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    let notes = prefs::student_notes(&ws.local, &grade);
    Ok(json!({ "studentId": id, "text": notes.get(&id) }))
}

fn students_note_set(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    let text = get_required_str(params, "text")?;
    prefs::set_student_note(&mut ws.local, &grade, &id, &text)?;
    Ok(json!({ "studentId": id, "hasNote": !text.trim().is_empty() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "students.list" => students_list,
        "students.create" => students_create,
        "students.rename" => students_rename,
        "students.togglePayment" => students_toggle_payment,
        "students.delete" => students_delete,
        "students.deleteAll" => students_delete_all,
        "students.search" => students_search,
        "students.noteGet" => students_note_get,
        "students.noteSet" => students_note_set,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}
