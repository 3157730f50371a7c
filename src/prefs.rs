//! Typed views over the local key/value store.

use crate::local::LocalStore;
use crate::model::Term;
use crate::store::StoreResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SITE_SETTINGS_KEY: &str = "siteSettings";
pub const PAGE_BACKGROUNDS_KEY: &str = "pageBackgrounds";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomColors {
    pub primary: String,
    pub secondary: String,
}

impl Default for CustomColors {
    fn default() -> Self {
        Self {
            primary: "#ff0000".into(),
            secondary: "#0066cc".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub theme: String,
    pub font_size: String,
    pub color_scheme: String,
    pub font: String,
    pub notifications: bool,
    pub mobile_view: bool,
    pub custom_colors: CustomColors,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            theme: "light".into(),
            font_size: "medium".into(),
            color_scheme: "default".into(),
            font: "cairo".into(),
            notifications: false,
            mobile_view: false,
            custom_colors: CustomColors::default(),
        }
    }
}

pub fn site_settings(local: &LocalStore) -> SiteSettings {
    local.get_json(SITE_SETTINGS_KEY).unwrap_or_default()
}

/// Shallow-merge `patch` over the stored settings and persist the result.
pub fn update_site_settings(
    local: &mut LocalStore,
    patch: &Map<String, Value>,
) -> StoreResult<SiteSettings> {
    let current = site_settings(local);
    let mut merged = match serde_json::to_value(&current)? {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    for (k, v) in patch {
        merged.insert(k.clone(), v.clone());
    }
    let updated: SiteSettings = serde_json::from_value(Value::Object(merged))?;
    local.set_json(SITE_SETTINGS_KEY, &updated)?;
    Ok(updated)
}

pub fn page_backgrounds(local: &LocalStore) -> BTreeMap<String, String> {
    local.get_json(PAGE_BACKGROUNDS_KEY).unwrap_or_default()
}

pub fn set_page_background(local: &mut LocalStore, page: &str, data_url: &str) -> StoreResult<()> {
    let mut bgs = page_backgrounds(local);
    bgs.insert(page.to_string(), data_url.to_string());
    local.set_json(PAGE_BACKGROUNDS_KEY, &bgs)
}

/// Remove one page's background, or all of them when `page` is `None`.
pub fn clear_page_background(local: &mut LocalStore, page: Option<&str>) -> StoreResult<()> {
    match page {
        None => local.remove(PAGE_BACKGROUNDS_KEY).map(|_| ()),
        Some(p) => {
            let mut bgs = page_backgrounds(local);
            bgs.remove(p);
            local.set_json(PAGE_BACKGROUNDS_KEY, &bgs)
        }
    }
}

// student notes

pub fn student_notes_key(grade: &str) -> String {
    format!("student-notes-{}", grade)
}

pub fn student_notes(local: &LocalStore, grade: &str) -> BTreeMap<String, String> {
    local.get_json(&student_notes_key(grade)).unwrap_or_default()
}

/// Empty text removes the note.
pub fn set_student_note(
    local: &mut LocalStore,
    grade: &str,
    student_id: &str,
    text: &str,
) -> StoreResult<()> {
    let mut notes = student_notes(local, grade);
    if text.trim().is_empty() {
        notes.remove(student_id);
    } else {
        notes.insert(student_id.to_string(), text.to_string());
    }
    local.set_json(&student_notes_key(grade), &notes)
}

// memo notes

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoNote {
    pub text: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

pub fn memo_notes_key(grade: &str, term: Term) -> String {
    format!("memo-notes-{}-{}", grade, term.number())
}

pub fn memo_notes(local: &LocalStore, grade: &str, term: Term) -> BTreeMap<String, MemoNote> {
    local.get_json(&memo_notes_key(grade, term)).unwrap_or_default()
}

pub fn set_memo_note(
    local: &mut LocalStore,
    grade: &str,
    term: Term,
    student_id: &str,
    note: Option<MemoNote>,
) -> StoreResult<()> {
    let mut notes = memo_notes(local, grade, term);
    match note {
        Some(n) if !n.text.trim().is_empty() => {
            notes.insert(student_id.to_string(), n);
        }
        _ => {
            notes.remove(student_id);
        }
    }
    local.set_json(&memo_notes_key(grade, term), &notes)
}

/// Drop a student's notes from both terms and the student note map.
pub fn forget_student(local: &mut LocalStore, grade: &str, student_id: &str) -> StoreResult<()> {
    let mut notes = student_notes(local, grade);
    if notes.remove(student_id).is_some() {
        local.set_json(&student_notes_key(grade), &notes)?;
    }
    for term in [Term::First, Term::Second] {
        let mut m = memo_notes(local, grade, term);
        if m.remove(student_id).is_some() {
            local.set_json(&memo_notes_key(grade, term), &m)?;
        }
    }
    Ok(())
}

/// Keys the purely-local version of the app kept per grade.
pub fn legacy_grade_keys(grade: &str) -> Vec<String> {
    [
        "students", "exams", "exam-count", "exam-totals", "notes", "student-notes", "absences",
        "defaulters",
    ]
    .iter()
    .map(|p| format!("{}-{}", p, grade))
    .chain((1..=2).flat_map(|t| {
        [
            format!("memos-{}-{}", grade, t),
            format!("memo-notes-{}-{}", grade, t),
        ]
    }))
    .collect()
}
