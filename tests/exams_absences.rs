mod test_support;

use serde_json::json;
use test_support::{open_workspace, request_err, request_ok};

const GRADE: &str = "prim4";
const TODAY: &str = "2026-10-18";

#[test]
fn scores_drive_absences_and_grade_views() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("classroom-exams");

    let mut ids = Vec::new();
    for (i, name) in ["يوسف", "مريم"].iter().enumerate() {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            "students.create",
            json!({ "grade": GRADE, "name": name }),
        );
        ids.push(created["studentId"].as_str().expect("studentId").to_string());
    }

    let opened = request_ok(&mut stdin, &mut reader, "o1", "exams.open", json!({ "grade": GRADE }));
    assert_eq!(opened["count"], 8);
    assert_eq!(opened["rows"].as_array().expect("rows").len(), 2);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "t1",
        "exams.setTotal",
        json!({ "grade": GRADE, "exam": 1, "total": "20" }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "e1",
        "exams.setScore",
        json!({ "grade": GRADE, "studentId": ids[0], "exam": 1, "score": "25", "today": TODAY }),
    );
    assert_eq!(code, "score_exceeds_total");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "e2",
        "exams.setScore",
        json!({ "grade": GRADE, "studentId": ids[0], "exam": 1, "score": "1a", "today": TODAY }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "e3",
        "exams.setScore",
        json!({ "grade": GRADE, "studentId": ids[0], "exam": 9, "score": "5", "today": TODAY }),
    );
    assert_eq!(code, "bad_params");

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "s1",
        "exams.setScore",
        json!({ "grade": GRADE, "studentId": ids[0], "exam": 1, "score": "20", "today": TODAY }),
    );
    assert_eq!(set["absences"], 1);
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "s2",
        "exams.setScore",
        json!({ "grade": GRADE, "studentId": ids[1], "exam": 2, "score": "0", "today": TODAY }),
    );
    assert_eq!(set["absences"], 2);

    let absences = request_ok(&mut stdin, &mut reader, "a1", "absences.list", json!({ "grade": GRADE }));
    let rows = absences["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    let maryam = rows
        .iter()
        .find(|r| r["studentName"] == "مريم")
        .expect("absence for second student");
    assert_eq!(maryam["examNumber"], "1");
    assert_eq!(maryam["date"], "18/10/2026");
    assert_eq!(maryam["multiple"], false);

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "v1",
        "exams.gradesView",
        json!({ "grade": GRADE, "selection": "auto" }),
    );
    assert_eq!(view["headers"], json!(["م", "اسم الطالب", "الامتحان 1 (20)"]));
    assert_eq!(view["rows"][0][2]["text"], "20");
    assert_eq!(view["rows"][0][2]["class"], "perfect");

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "v2",
        "exams.gradesView",
        json!({ "grade": GRADE, "selection": "specific", "exams": [2] }),
    );
    assert_eq!(view["rows"][1][2]["class"], "absent");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "v3",
        "exams.gradesView",
        json!({ "grade": GRADE, "selection": "specific", "exams": [] }),
    );
    assert_eq!(code, "bad_params");

    // Clearing a score shrinks the active exam set.
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "s3",
        "exams.setScore",
        json!({ "grade": GRADE, "studentId": ids[1], "exam": 2, "score": "", "today": TODAY }),
    );
    assert_eq!(set["absences"], 1);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ad1",
        "absences.deleteStudent",
        json!({ "grade": GRADE, "studentId": ids[1] }),
    );
    let absences = request_ok(&mut stdin, &mut reader, "a2", "absences.list", json!({ "grade": GRADE }));
    assert!(absences["rows"].as_array().expect("rows").is_empty());
    let opened = request_ok(&mut stdin, &mut reader, "o2", "exams.open", json!({ "grade": GRADE }));
    assert_eq!(opened["rows"].as_array().expect("rows").len(), 1);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exam_count_is_capped() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("classroom-exam-count");

    for i in 9..=12 {
        let added = request_ok(
            &mut stdin,
            &mut reader,
            &format!("a{}", i),
            "exams.addExam",
            json!({ "grade": GRADE }),
        );
        assert_eq!(added["count"], i);
    }
    let code = request_err(
        &mut stdin,
        &mut reader,
        "a13",
        "exams.addExam",
        json!({ "grade": GRADE }),
    );
    assert_eq!(code, "limit_reached");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
