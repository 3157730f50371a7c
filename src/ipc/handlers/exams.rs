use crate::config::Config;
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::absences;
use crate::ipc::handlers::students::{numbered_students, search_outcome};
use crate::ipc::helpers::{get_grade, get_required_str, get_today, with_workspace, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::{ExamScores, ExamTotals, Student, MAX_EXAM_COUNT};
use crate::repo::GradeRepo;
use crate::report::{score_class, Cell, TableModel};
use crate::workspace::Workspace;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const MAX_SCORE_LEN: usize = 3;

fn is_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

fn parse_exam(params: &Value, count: u32) -> Result<String, HandlerErr> {
    let raw = match params.get("exam") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        _ => return Err(HandlerErr::bad_params("missing exam")),
    };
    match raw.parse::<u32>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n.to_string()),
        _ => Err(HandlerErr::bad_params(format!("invalid exam: {}", raw))),
    }
}

/// Named students with their list numbers; unnamed slots are skipped but
/// keep their place in the numbering.
fn named_students(repo: &GradeRepo<'_>) -> Result<Vec<(usize, Student)>, HandlerErr> {
    Ok(numbered_students(repo)?
        .into_iter()
        .filter(|(_, s)| s.has_name())
        .collect())
}

/// Which exams a grades view covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamSelection {
    Specific(Vec<String>),
    All,
    Auto,
}

impl ExamSelection {
    pub fn from_params(params: &Value) -> Result<Self, HandlerErr> {
        let kind = params
            .get("selection")
            .and_then(|v| v.as_str())
            .unwrap_or("specific");
        match kind {
            "all" => Ok(ExamSelection::All),
            "auto" => Ok(ExamSelection::Auto),
            "specific" => {
                let exams: Vec<String> = params
                    .get("exams")
                    .and_then(|v| v.as_array())
                    .map(|a| {
                        a.iter()
                            .filter_map(|e| match e {
                                Value::Number(n) => Some(n.to_string()),
                                Value::String(s) => Some(s.trim().to_string()),
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                if exams.is_empty() {
                    return Err(HandlerErr::bad_params("choose at least one exam"));
                }
                Ok(ExamSelection::Specific(exams))
            }
            other => Err(HandlerErr::bad_params(format!("invalid selection: {}", other))),
        }
    }

    pub fn resolve(&self, count: u32, totals: &ExamTotals) -> Result<Vec<String>, HandlerErr> {
        let mut exams: Vec<String> = match self {
            ExamSelection::All => (1..=count).map(|n| n.to_string()).collect(),
            ExamSelection::Specific(list) => {
                for e in list {
                    if !matches!(e.parse::<u32>(), Ok(n) if (1..=count).contains(&n)) {
                        return Err(HandlerErr::bad_params(format!("no such exam: {}", e)));
                    }
                }
                list.clone()
            }
            ExamSelection::Auto => totals
                .iter()
                .filter(|(_, t)| !t.is_empty())
                .map(|(k, _)| k.clone())
                .collect(),
        };
        exams.sort_by_key(|e| e.parse::<u32>().unwrap_or(u32::MAX));
        exams.dedup();
        if exams.is_empty() {
            return Err(HandlerErr::bad_params("no exams have a total score yet"));
        }
        Ok(exams)
    }
}

/// Scores table for the selected exams. Cells are classed `absent` for a
/// literal zero and `perfect` when they equal the exam total.
pub fn grades_table(
    title: &str,
    students: &[(usize, Student)],
    scores: &BTreeMap<String, ExamScores>,
    totals: &ExamTotals,
    exams: &[String],
) -> TableModel {
    let mut headers = vec!["م".to_string(), "اسم الطالب".to_string()];
    headers.extend(exams.iter().map(|e| match totals.get(e).filter(|t| !t.is_empty()) {
        Some(t) => format!("الامتحان {} ({})", e, t),
        None => format!("الامتحان {}", e),
    }));
    let mut table = TableModel::new(title, headers);
    for (i, (_, s)) in students.iter().enumerate() {
        let mine = scores.get(&s.id);
        let mut row = vec![Cell::plain((i + 1).to_string()), Cell::plain(s.name.clone())];
        for e in exams {
            let score = mine.and_then(|m| m.get(e)).cloned().unwrap_or_default();
            let class = score_class(&score, totals.get(e).map(|t| t.as_str()));
            row.push(Cell::with_class(score, class));
        }
        table.rows.push(row);
    }
    table
}

pub fn build_grades_table(repo: &GradeRepo<'_>, title: &str, selection: &ExamSelection) -> Result<TableModel, HandlerErr> {
    let count = repo.exam_count()?;
    let totals = repo.exam_totals()?;
    let exams = selection.resolve(count, &totals)?;
    let students = named_students(repo)?;
    let scores = repo.all_exam_scores()?;
    Ok(grades_table(title, &students, &scores, &totals, &exams))
}

fn exams_open(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let repo = ws.grade(&grade);
    let count = repo.exam_count()?;
    let totals = repo.exam_totals()?;
    let scores = repo.all_exam_scores()?;
    let rows: Vec<Value> = named_students(&repo)?
        .iter()
        .map(|(n, s)| {
            json!({
                "number": n,
                "studentId": s.id,
                "name": s.name,
                "scores": scores.get(&s.id).cloned().unwrap_or_default(),
            })
        })
        .collect();
    Ok(json!({ "count": count, "totals": totals, "rows": rows }))
}

fn exams_add_exam(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let repo = ws.grade(&grade);
    let count = repo.exam_count()?;
    if count >= MAX_EXAM_COUNT {
        return Err(HandlerErr::new(
            "limit_reached",
            format!("at most {} exams per grade", MAX_EXAM_COUNT),
        )
        .with_details(json!({ "count": count })));
    }
    repo.set_exam_count(count + 1)?;
    Ok(json!({ "count": count + 1 }))
}

fn exams_set_total(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let repo = ws.grade(&grade);
    let exam = parse_exam(params, repo.exam_count()?)?;
    let total = get_required_str(params, "total")?.trim().to_string();
    if !is_digits(&total) {
        return Err(HandlerErr::bad_params("total must be digits only"));
    }
    let mut totals = repo.exam_totals()?;
    if total.is_empty() {
        totals.remove(&exam);
    } else {
        totals.insert(exam.clone(), total.clone());
    }
    repo.set_exam_totals(&totals)?;
    Ok(json!({ "exam": exam, "total": total, "totals": totals }))
}

fn exams_set_score(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let today = get_today(params)?;
    let repo = ws.grade(&grade);
    let student_id = get_required_str(params, "studentId")?;
    let exam = parse_exam(params, repo.exam_count()?)?;
    let score = get_required_str(params, "score")?.trim().to_string();
    if !is_digits(&score) || score.len() > MAX_SCORE_LEN {
        return Err(HandlerErr::bad_params(format!(
            "score must be at most {} digits",
            MAX_SCORE_LEN
        )));
    }
    if repo.student(&student_id)?.is_none() {
        return Err(HandlerErr::not_found(format!("student not found: {}", student_id)));
    }

    let totals = repo.exam_totals()?;
    if let (Ok(s), Some(Ok(t))) = (
        score.parse::<u32>(),
        totals.get(&exam).map(|t| t.parse::<u32>()),
    ) {
        if s > t {
            return Err(HandlerErr::new(
                "score_exceeds_total",
                format!("score must be at most {}", t),
            )
            .with_details(json!({ "exam": exam, "total": t })));
        }
    }

    let mut scores = repo.exam_scores(&student_id)?;
    if score.is_empty() {
        scores.remove(&exam);
    } else {
        scores.insert(exam.clone(), score.clone());
    }
    repo.set_exam_scores(&student_id, &scores)?;
    let absences = absences::recompute(&repo, today)?;
    Ok(json!({ "studentId": student_id, "exam": exam, "score": score, "absences": absences }))
}

fn exams_grades_view(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let selection = ExamSelection::from_params(params)?;
    let table = build_grades_table(&ws.grade(&grade), "درجات الطلاب", &selection)?;
    Ok(json!(table))
}

fn exams_search(ws: &mut Workspace, _cfg: &Config, params: &Value) -> HandlerResult {
    let grade = get_grade(params)?;
    let query = get_required_str(params, "query")?;
    let students = named_students(&ws.grade(&grade))?;
    Ok(search_outcome(&students, &query))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: fn(&mut Workspace, &Config, &Value) -> HandlerResult = match req.method.as_str() {
        "exams.open" => exams_open,
        "exams.addExam" => exams_add_exam,
        "exams.setTotal" => exams_set_total,
        "exams.setScore" => exams_set_score,
        "exams.gradesView" => exams_grades_view,
        "exams.search" => exams_search,
        _ => return None,
    };
    Some(with_workspace(state, req, f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CellClass;

    #[test]
    fn selection_resolves_in_numeric_order() {
        let totals = ExamTotals::from([
            ("10".to_string(), "20".to_string()),
            ("2".to_string(), "15".to_string()),
            ("3".to_string(), String::new()),
        ]);
        assert_eq!(
            ExamSelection::Auto.resolve(12, &totals).expect("auto"),
            vec!["2", "10"]
        );
        assert_eq!(ExamSelection::All.resolve(3, &totals).expect("all").len(), 3);
        assert!(ExamSelection::Auto.resolve(8, &ExamTotals::new()).is_err());
        let sel = ExamSelection::from_params(&json!({ "selection": "specific", "exams": [3, "1"] }))
            .expect("specific");
        assert_eq!(sel.resolve(8, &totals).expect("resolve"), vec!["1", "3"]);
        let beyond = ExamSelection::from_params(&json!({ "exams": [9] })).expect("specific");
        let e = beyond.resolve(8, &totals).expect_err("past the exam count");
        assert_eq!(e.code, "bad_params");
        let junk = ExamSelection::from_params(&json!({ "exams": ["x"] })).expect("specific");
        assert!(junk.resolve(8, &totals).is_err());
    }

    #[test]
    fn grades_table_classes_cells() {
        let mut s = Student::new("Ali");
        s.id = "a".into();
        let scores = BTreeMap::from([(
            "a".to_string(),
            ExamScores::from([
                ("1".to_string(), "0".to_string()),
                ("2".to_string(), "20".to_string()),
            ]),
        )]);
        let totals = ExamTotals::from([("2".to_string(), "20".to_string())]);
        let exams = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let t = grades_table("t", &[(4, s)], &scores, &totals, &exams);
        assert_eq!(t.headers[3], "الامتحان 2 (20)");
        assert_eq!(t.rows[0][0].text, "1");
        assert_eq!(t.rows[0][2].class, Some(CellClass::Absent));
        assert_eq!(t.rows[0][3].class, Some(CellClass::Perfect));
        assert_eq!(t.rows[0][4].text, "");
    }

    #[test]
    fn exam_numbers_are_bounded_by_count() {
        assert_eq!(parse_exam(&json!({ "exam": 3 }), 8).expect("exam"), "3");
        assert!(parse_exam(&json!({ "exam": "9" }), 8).is_err());
        assert!(parse_exam(&json!({ "exam": "0" }), 8).is_err());
    }
}
