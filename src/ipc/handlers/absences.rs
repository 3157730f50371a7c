use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_grade, get_required_str, get_today, with_workspace, HandlerResult};
use crate::ipc::handlers::students::delete_student_cascade;
use crate::ipc::types::{AppState, Request};
use crate::model::{Absence, ExamScores, Student};
use crate::repo::GradeRepo;
use crate::workspace::Workspace;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const ABSENCE_DATE_FORMAT: &str = "%d/%m/%Y";

fn exam_sort_key(exam: &str) -> (u32, String) {
    (exam.parse().unwrap_or(u32::MAX), exam.to_string())
}

/// Exams with at least one non-empty score, in numeric order.
pub fn active_exams(scores: &BTreeMap<String, ExamScores>) -> Vec<String> {
    let set: BTreeSet<(u32, String)> = scores
        .values()
        .flat_map(|s| s.iter())
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, _)| exam_sort_key(k))
        .collect();
    set.into_iter().map(|(_, k)| k).collect()
}

/// Every named student without a score on an active exam is absent from it.
pub fn compute_absences(
    students: &[Student],
    scores: &BTreeMap<String, ExamScores>,
    today: NaiveDate,
) -> Vec<Absence> {
    let date = today.format(ABSENCE_DATE_FORMAT).to_string();
    let mut out = Vec::new();
    for exam in active_exams(scores) {
        for s in students.iter().filter(|s| s.has_name()) {
            let has_score = scores
                .get(&s.id)
                .and_then(|m| m.get(&exam))
                .map(|v| !v.is_empty())
                .unwrap_or(false);
            if !has_score {
                out.push(Absence {
                    id: String::new(),
                    student_id: s.id.clone(),
                    student_name: s.name.clone(),
                    exam_number: exam.clone(),
                    date: date.clone(),
                });
            }
        }
    }
    out
}

/// Replace the grade's absence records with a fresh computation.
pub fn recompute(repo: &GradeRepo<'_>, today: NaiveDate) -> Result<usize, HandlerErr> {
    let students = repo.students()?;
    let scores = repo.all_exam_scores()?;
    let records = compute_absences(&students, &scores, today);
    repo.replace_absences(&records)?;
    tracing::debug!(grade = repo.grade(), count = records.len(), "absences recomputed");
    Ok(records.len())
}

/// Sorted by student name then exam number.
pub fn sorted_absences(mut list: Vec<Absence>) -> Vec<Absence> {
    list.sort_by(|a, b| {
        a.student_name
            .cmp(&b.student_name)
            .then_with(|| exam_sort_key(&a.exam_number).cmp(&exam_sort_key(&b.exam_number)))
    });
    list
}

fn absences_list(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let list = sorted_absences(ws.grade(&grade).absences()?);
    let mut per_student: HashMap<&str, usize> = HashMap::new();
    for a in &list {
        *per_student.entry(a.student_name.as_str()).or_default() += 1;
    }
    let rows: Vec<Value> = list
        .iter()
        .enumerate()
        .map(|(i, a)| {
            json!({
                "number": i + 1,
                "id": a.id,
                "studentId": a.student_id,
                "studentName": a.student_name,
                "examNumber": a.exam_number,
                "date": a.date,
                "multiple": per_student.get(a.student_name.as_str()).copied().unwrap_or(0) > 1,
            })
        })
        .collect();
    Ok(json!({ "rows": rows }))
}

fn absences_recompute(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let today = get_today(params)?;
    let count = recompute(&ws.grade(&grade), today)?;
    Ok(json!({ "count": count }))
}

fn absences_delete_student(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let id = get_required_str(params, "studentId")?;
    delete_student_cascade(ws, &grade, &id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "absences.list" => absences_list,
        "absences.recompute" => absences_recompute,
        "absences.deleteStudent" => absences_delete_student,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, name: &str) -> Student {
        let mut s = Student::new(name);
        s.id = id.to_string();
        s
    }

    fn scores(entries: Vec<(&str, Vec<(&str, &str)>)>) -> BTreeMap<String, ExamScores> {
        entries
            .into_iter()
            .map(|(sid, s)| {
                (
                    sid.to_string(),
                    s.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn missing_scores_on_active_exams_are_absences() {
        let students = vec![student("a", "Ali"), student("b", "Badr"), student("c", "")];
        let s = scores(vec![
            ("a", vec![("1", "15"), ("10", "9"), ("2", "")]),
            ("b", vec![("10", "0")]),
        ]);
        assert_eq!(active_exams(&s), vec!["1", "10"]);

        let today = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        let out = compute_absences(&students, &s, today);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].student_id, "b");
        assert_eq!(out[0].exam_number, "1");
        assert_eq!(out[0].date, "18/10/2026");
    }

    #[test]
    fn no_scores_means_no_absences() {
        let students = vec![student("a", "Ali")];
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        assert!(compute_absences(&students, &BTreeMap::new(), today).is_empty());
    }

    #[test]
    fn sorted_by_name_then_exam_number() {
        let mk = |name: &str, exam: &str| Absence {
            id: String::new(),
            student_id: String::new(),
            student_name: name.to_string(),
            exam_number: exam.to_string(),
            date: String::new(),
        };
        let out = sorted_absences(vec![mk("Sara", "2"), mk("Ali", "10"), mk("Ali", "9")]);
        let got: Vec<(&str, &str)> = out
            .iter()
            .map(|a| (a.student_name.as_str(), a.exam_number.as_str()))
            .collect();
        assert_eq!(got, vec![("Ali", "9"), ("Ali", "10"), ("Sara", "2")]);
    }
}
