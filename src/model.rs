use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Months a fee is collected for, in academic order. July is a break.
    pub const BILLED: [Month; 11] = [
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
    ];

    pub fn from_number(n: u32) -> Option<Month> {
        if (1..=12).contains(&n) {
            Some(Self::ALL[(n - 1) as usize])
        } else {
            None
        }
    }

    pub fn number(self) -> u32 {
        Self::ALL
            .iter()
            .position(|m| *m == self)
            .map(|i| i as u32 + 1)
            .unwrap_or(1)
    }

    pub fn key(self) -> &'static str {
        match self {
            Month::January => "january",
            Month::February => "february",
            Month::March => "march",
            Month::April => "april",
            Month::May => "may",
            Month::June => "june",
            Month::July => "july",
            Month::August => "august",
            Month::September => "september",
            Month::October => "october",
            Month::November => "november",
            Month::December => "december",
        }
    }

    pub fn parse(s: &str) -> Option<Month> {
        let t = s.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|m| m.key() == t)
    }

    pub fn arabic_name(self) -> &'static str {
        match self {
            Month::January => "يناير",
            Month::February => "فبراير",
            Month::March => "مارس",
            Month::April => "أبريل",
            Month::May => "مايو",
            Month::June => "يونيو",
            Month::July => "يوليو",
            Month::August => "أغسطس",
            Month::September => "سبتمبر",
            Month::October => "أكتوبر",
            Month::November => "نوفمبر",
            Month::December => "ديسمبر",
        }
    }

    pub fn is_billed(self) -> bool {
        self != Month::July
    }
}

pub const BUILTIN_GRADES: [(&str, &str); 12] = [
    ("prim1", "الصف الأول الابتدائي"),
    ("prim2", "الصف الثاني الابتدائي"),
    ("prim3", "الصف الثالث الابتدائي"),
    ("prim4", "الصف الرابع الابتدائي"),
    ("prim5", "الصف الخامس الابتدائي"),
    ("prim6", "الصف السادس الابتدائي"),
    ("prep1", "الصف الأول الاعدادي"),
    ("prep2", "الصف الثاني الاعدادي"),
    ("prep3", "الصف الثالث الاعدادي"),
    ("sec1", "الصف الأول الثانوي"),
    ("sec2", "الصف الثاني الثانوي"),
    ("sec3", "الصف الثالث الثانوي"),
];

pub fn builtin_grade_title(grade: &str) -> Option<&'static str> {
    BUILTIN_GRADES
        .iter()
        .find(|(id, _)| *id == grade)
        .map(|(_, title)| *title)
}

/// Index of a `custom<N>` grade into the custom stage listing.
pub fn custom_grade_index(grade: &str) -> Option<usize> {
    grade.strip_prefix("custom")?.parse().ok()
}

/// Grades double as path segments, so keep them to a safe alphabet.
pub fn is_valid_grade(grade: &str) -> bool {
    !grade.is_empty()
        && grade.len() <= 64
        && grade
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Student {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub payments: BTreeMap<String, bool>,
}

impl Student {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            payments: Month::BILLED
                .iter()
                .map(|m| (m.key().to_string(), false))
                .collect(),
        }
    }

    pub fn is_paid(&self, month: Month) -> bool {
        self.payments.get(month.key()).copied().unwrap_or(false)
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Exam number ("1".."12") to score string, per student.
pub type ExamScores = BTreeMap<String, String>;

/// Exam number to maximum score string.
pub type ExamTotals = BTreeMap<String, String>;

pub const DEFAULT_EXAM_COUNT: u32 = 8;
pub const MAX_EXAM_COUNT: u32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSettings {
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    pub student_name: String,
    pub exam_number: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaulter {
    #[serde(skip)]
    pub id: String,
    pub student_number: u32,
    pub name: String,
    #[serde(default)]
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoStatus {
    #[default]
    None,
    Pending,
    Received,
}

impl MemoStatus {
    pub fn next(self) -> MemoStatus {
        match self {
            MemoStatus::None => MemoStatus::Pending,
            MemoStatus::Pending => MemoStatus::Received,
            MemoStatus::Received => MemoStatus::None,
        }
    }

    pub fn parse(s: &str) -> Option<MemoStatus> {
        match s.trim() {
            "none" => Some(MemoStatus::None),
            "pending" => Some(MemoStatus::Pending),
            "received" => Some(MemoStatus::Received),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            MemoStatus::None => "none",
            MemoStatus::Pending => "pending",
            MemoStatus::Received => "received",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MemoStatus::None => "لم يتم الدفع",
            MemoStatus::Pending => "قيد الانتظار",
            MemoStatus::Received => "تم الاستلام",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    First,
    Second,
}

impl Term {
    pub fn parse(s: &str) -> Option<Term> {
        match s.trim() {
            "1" | "term1" => Some(Term::First),
            "2" | "term2" => Some(Term::Second),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Term::First => 1,
            Term::Second => 2,
        }
    }

    /// Field name inside a memo record.
    pub fn field(self) -> &'static str {
        match self {
            Term::First => "term1",
            Term::Second => "term2",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term1: Option<MemoStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term2: Option<MemoStatus>,
}

impl MemoRecord {
    pub fn status(&self, term: Term) -> MemoStatus {
        match term {
            Term::First => self.term1,
            Term::Second => self.term2,
        }
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumItem {
    #[serde(skip)]
    pub id: String,
    pub section: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    pub url: String,
    pub storage_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Pdf,
    File,
}

impl FileKind {
    pub fn from_mime(mime: &str) -> FileKind {
        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else if mime == "application/pdf" {
            FileKind::Pdf
        } else {
            FileKind::File
        }
    }
}

/// Best-effort MIME type from a file extension.
pub fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomStage {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub color: String,
}

pub const STAGE_COLORS: [&str; 12] = [
    "#1a237e", "#1b5e20", "#311b92", "#b71c1c", "#004d40", "#263238", "#3e2723", "#212121",
    "#0d47a1", "#1a472a", "#2e1437", "#641e16",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_numbers_and_keys_round_trip_through_parse() {
        assert_eq!(Month::from_number(8), Some(Month::August));
        assert_eq!(Month::from_number(13), None);
        assert_eq!(Month::August.number(), 8);
        assert_eq!(Month::parse(" June "), Some(Month::June));
        assert_eq!(Month::parse("juin"), None);
        assert!(!Month::July.is_billed());
        assert_eq!(Month::BILLED.len(), 11);
    }

    #[test]
    fn new_student_has_every_billed_month_unpaid() {
        let s = Student::new("Ali");
        assert_eq!(s.payments.len(), 11);
        assert!(!s.payments.contains_key("july"));
        assert!(Month::BILLED.iter().all(|m| !s.is_paid(*m)));
    }

    #[test]
    fn memo_status_cycles_through_three_states() {
        assert_eq!(MemoStatus::None.next(), MemoStatus::Pending);
        assert_eq!(MemoStatus::Pending.next(), MemoStatus::Received);
        assert_eq!(MemoStatus::Received.next(), MemoStatus::None);
        let rec: MemoRecord =
            serde_json::from_value(serde_json::json!({ "term2": "pending" })).expect("decode");
        assert_eq!(rec.status(Term::First), MemoStatus::None);
        assert_eq!(rec.status(Term::Second), MemoStatus::Pending);
    }

    #[test]
    fn grade_identifiers() {
        assert_eq!(builtin_grade_title("sec3"), Some("الصف الثالث الثانوي"));
        assert_eq!(custom_grade_index("custom2"), Some(2));
        assert_eq!(custom_grade_index("prim1"), None);
        assert!(is_valid_grade("custom0"));
        assert!(!is_valid_grade("../x"));
        assert!(!is_valid_grade(""));
    }

    #[test]
    fn file_kinds_follow_mime_prefixes() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("video/mp4"), FileKind::Video);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime("text/plain"), FileKind::File);
        assert_eq!(guess_mime("Unit 1.PDF"), "application/pdf");
    }
}
