mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{open_workspace, payments_with, request_err, request_ok};

fn names(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, grade: &str) -> Vec<String> {
    let list = request_ok(stdin, reader, &format!("list-{}", grade), "students.list", json!({ "grade": grade }));
    list["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .filter_map(|r| r["name"].as_str().map(|s| s.to_string()))
        .collect()
}

#[test]
fn annual_transfer_promotes_every_grade() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("classroom-transfer");

    let seed = [
        ("prim1", "آدم"),
        ("prim1", "جنى"),
        ("prim2", "زياد"),
        ("sec2", "رنا"),
        ("sec3", "طارق"),
    ];
    let mut adam = String::new();
    for (i, (grade, name)) in seed.iter().enumerate() {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            "students.create",
            json!({ "grade": grade, "name": name }),
        );
        if i == 0 {
            adam = created["studentId"].as_str().expect("studentId").to_string();
        }
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "pay",
        "students.togglePayment",
        json!({ "grade": "prim1", "studentId": adam, "month": "august" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "def",
        "defaulters.refresh",
        json!({ "grade": "prim2", "today": "2027-06-10" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "note",
        "notes.create",
        json!({ "grade": "prim1", "content": "ملاحظة قديمة" }),
    );

    let code = request_err(&mut stdin, &mut reader, "t0", "transfer.annual", json!({}));
    assert_eq!(code, "not_confirmed");

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "t1",
        "transfer.annual",
        json!({ "confirm": true }),
    );
    let moves = moved["moves"].as_array().expect("moves");
    assert_eq!(moves.len(), 12);
    assert_eq!(moves[0]["from"], "sec3");
    assert!(moves[0]["to"].is_null());

    assert!(names(&mut stdin, &mut reader, "prim1").is_empty());
    assert_eq!(names(&mut stdin, &mut reader, "prim2"), vec!["آدم", "جنى"]);
    assert_eq!(names(&mut stdin, &mut reader, "prim3"), vec!["زياد"]);
    assert_eq!(names(&mut stdin, &mut reader, "sec3"), vec!["رنا"]);

    let list = request_ok(&mut stdin, &mut reader, "p2", "students.list", json!({ "grade": "prim2" }));
    assert_eq!(list["rows"][0]["payments"], payments_with(&[]));

    let notes = request_ok(&mut stdin, &mut reader, "n1", "notes.list", json!({ "grade": "prim1" }));
    assert!(notes["notes"].as_array().expect("notes").is_empty());

    let defaulters = request_ok(
        &mut stdin,
        &mut reader,
        "d1",
        "defaulters.list",
        json!({ "grade": "prim2", "today": "2026-08-01" }),
    );
    assert!(defaulters["rows"].as_array().expect("rows").is_empty());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
