//! Typed access to one grade's collections.

use crate::calendar;
use crate::model::{
    Absence, CurriculumItem, CustomStage, Defaulter, ExamScores, ExamSettings, ExamTotals,
    MemoRecord, MemoStatus, Month, Note, Student, Term, DEFAULT_EXAM_COUNT,
};
use crate::store::{encode, CollectionPath, DocPath, Document, DocumentStore, StoreResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const STUDENTS: &str = "students";
pub const EXAMS: &str = "exams";
pub const SETTINGS: &str = "settings";
pub const ABSENCES: &str = "absences";
pub const DEFAULTERS: &str = "defaulters";
pub const MEMOS: &str = "memos";
pub const NOTES: &str = "notes";
pub const CURRICULUM: &str = "curriculum";

/// Every per-grade collection, cleared together by the annual transfer.
pub const GRADE_COLLECTIONS: [&str; 8] = [
    STUDENTS, EXAMS, SETTINGS, ABSENCES, DEFAULTERS, MEMOS, NOTES, CURRICULUM,
];

const EXAM_SETTINGS_DOC: &str = "exams";
const EXAM_TOTALS_DOC: &str = "examTotals";

fn decode_with_id<T: DeserializeOwned>(
    doc: &Document,
    set_id: impl FnOnce(&mut T, String),
) -> StoreResult<T> {
    let mut rec: T = doc.decode()?;
    set_id(&mut rec, doc.id.clone());
    Ok(rec)
}

fn string_map(doc: Option<Document>) -> BTreeMap<String, String> {
    doc.map(|d| {
        d.data
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                Value::Number(n) => Some((k, n.to_string())),
                _ => None,
            })
            .collect()
    })
    .unwrap_or_default()
}

fn to_body(map: &BTreeMap<String, String>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

pub struct GradeRepo<'a> {
    store: &'a dyn DocumentStore,
    grade: String,
}

impl<'a> GradeRepo<'a> {
    pub fn new(store: &'a dyn DocumentStore, grade: impl Into<String>) -> Self {
        Self {
            store,
            grade: grade.into(),
        }
    }

    pub fn grade(&self) -> &str {
        &self.grade
    }

    pub fn collection(&self, name: &str) -> StoreResult<CollectionPath> {
        CollectionPath::new(["grades", self.grade.as_str(), name])
    }

    fn doc(&self, name: &str, id: &str) -> StoreResult<DocPath> {
        self.collection(name)?.doc(id)
    }

    // students

    pub fn students(&self) -> StoreResult<Vec<Student>> {
        self.store
            .get_all(&self.collection(STUDENTS)?)?
            .iter()
            .map(|d| decode_with_id(d, |s: &mut Student, id| s.id = id))
            .collect()
    }

    pub fn student(&self, id: &str) -> StoreResult<Option<Student>> {
        match self.store.get(&self.doc(STUDENTS, id)?)? {
            Some(d) => Ok(Some(decode_with_id(&d, |s: &mut Student, id| s.id = id)?)),
            None => Ok(None),
        }
    }

    pub fn add_student(&self, student: &Student) -> StoreResult<String> {
        self.store.add(&self.collection(STUDENTS)?, encode(student)?)
    }

    pub fn rename_student(&self, id: &str, name: &str) -> StoreResult<()> {
        let mut patch = Map::new();
        patch.insert("name".into(), Value::String(name.to_string()));
        self.store.update(&self.doc(STUDENTS, id)?, patch)
    }

    pub fn set_payments(&self, id: &str, payments: &BTreeMap<String, bool>) -> StoreResult<()> {
        let mut patch = Map::new();
        patch.insert("payments".into(), serde_json::to_value(payments)?);
        self.store.update(&self.doc(STUDENTS, id)?, patch)
    }

    pub fn delete_student(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&self.doc(STUDENTS, id)?)
    }

    // exams

    pub fn all_exam_scores(&self) -> StoreResult<BTreeMap<String, ExamScores>> {
        Ok(self
            .store
            .get_all(&self.collection(EXAMS)?)?
            .into_iter()
            .map(|d| (d.id.clone(), string_map(Some(d))))
            .collect())
    }

    pub fn exam_scores(&self, student_id: &str) -> StoreResult<ExamScores> {
        Ok(string_map(self.store.get(&self.doc(EXAMS, student_id)?)?))
    }

    pub fn set_exam_scores(&self, student_id: &str, scores: &ExamScores) -> StoreResult<()> {
        self.store
            .set(&self.doc(EXAMS, student_id)?, to_body(scores))
    }

    pub fn delete_exam_scores(&self, student_id: &str) -> StoreResult<()> {
        self.store.delete(&self.doc(EXAMS, student_id)?)
    }

    pub fn exam_count(&self) -> StoreResult<u32> {
        match self.store.get(&self.doc(SETTINGS, EXAM_SETTINGS_DOC)?)? {
            Some(d) => Ok(d.decode::<ExamSettings>()?.count),
            None => Ok(DEFAULT_EXAM_COUNT),
        }
    }

    pub fn set_exam_count(&self, count: u32) -> StoreResult<()> {
        self.store.set(
            &self.doc(SETTINGS, EXAM_SETTINGS_DOC)?,
            encode(&ExamSettings { count })?,
        )
    }

    pub fn exam_totals(&self) -> StoreResult<ExamTotals> {
        Ok(string_map(
            self.store.get(&self.doc(SETTINGS, EXAM_TOTALS_DOC)?)?,
        ))
    }

    pub fn set_exam_totals(&self, totals: &ExamTotals) -> StoreResult<()> {
        self.store
            .set(&self.doc(SETTINGS, EXAM_TOTALS_DOC)?, to_body(totals))
    }

    // absences

    pub fn absences(&self) -> StoreResult<Vec<Absence>> {
        self.store
            .get_all(&self.collection(ABSENCES)?)?
            .iter()
            .map(|d| decode_with_id(d, |a: &mut Absence, id| a.id = id))
            .collect()
    }

    /// Drop every absence record and write `records` in their place.
    pub fn replace_absences(&self, records: &[Absence]) -> StoreResult<()> {
        let coll = self.collection(ABSENCES)?;
        self.store.delete_all(&coll)?;
        for rec in records {
            self.store.add(&coll, encode(rec)?)?;
        }
        Ok(())
    }

    pub fn delete_absences_for(&self, student_id: &str) -> StoreResult<usize> {
        let coll = self.collection(ABSENCES)?;
        let mut removed = 0;
        for a in self.absences()? {
            if a.student_id == student_id {
                self.store.delete(&coll.doc(&a.id)?)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // defaulters

    pub fn defaulters(&self) -> StoreResult<Vec<Defaulter>> {
        let mut list = self
            .store
            .get_all(&self.collection(DEFAULTERS)?)?
            .iter()
            .map(|d| decode_with_id(d, |x: &mut Defaulter, id| x.id = id))
            .collect::<StoreResult<Vec<_>>>()?;
        list.sort_by_key(|d| d.student_number);
        for d in &mut list {
            calendar::sort_month_keys(&mut d.months);
        }
        Ok(list)
    }

    /// Record unpaid months for a student number. Months already on file
    /// are kept; the result is in academic order.
    pub fn merge_defaulter(&self, number: u32, name: &str, months: &[Month]) -> StoreResult<()> {
        let doc = self.doc(DEFAULTERS, &number.to_string())?;
        let mut merged: Vec<String> = match self.store.get(&doc)? {
            Some(d) => d.decode::<Defaulter>().map(|x| x.months).unwrap_or_default(),
            None => Vec::new(),
        };
        for m in months {
            if !merged.iter().any(|k| k == m.key()) {
                merged.push(m.key().to_string());
            }
        }
        calendar::sort_month_keys(&mut merged);
        let rec = Defaulter {
            id: String::new(),
            student_number: number,
            name: name.to_string(),
            months: merged,
        };
        self.store.set(&doc, encode(&rec)?)
    }

    pub fn remove_defaulter(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&self.doc(DEFAULTERS, id)?)
    }

    pub fn clear_defaulters(&self) -> StoreResult<usize> {
        self.clear(DEFAULTERS)
    }

    // memos

    pub fn memos(&self) -> StoreResult<BTreeMap<String, MemoRecord>> {
        self.store
            .get_all(&self.collection(MEMOS)?)?
            .into_iter()
            .map(|d| -> StoreResult<(String, MemoRecord)> { Ok((d.id.clone(), d.decode()?)) })
            .collect()
    }

    pub fn memo(&self, student_id: &str) -> StoreResult<MemoRecord> {
        match self.store.get(&self.doc(MEMOS, student_id)?)? {
            Some(d) => d.decode(),
            None => Ok(MemoRecord::default()),
        }
    }

    /// Set one term's status, leaving the other term untouched.
    pub fn set_memo_status(&self, student_id: &str, term: Term, status: MemoStatus) -> StoreResult<()> {
        let mut patch = Map::new();
        patch.insert(term.field().into(), serde_json::to_value(status)?);
        self.store.merge(&self.doc(MEMOS, student_id)?, patch)
    }

    pub fn delete_memo(&self, student_id: &str) -> StoreResult<()> {
        self.store.delete(&self.doc(MEMOS, student_id)?)
    }

    // notes

    pub fn notes(&self) -> StoreResult<Vec<Note>> {
        self.store
            .get_all(&self.collection(NOTES)?)?
            .iter()
            .map(|d| decode_with_id(d, |n: &mut Note, id| n.id = id))
            .collect()
    }

    pub fn note(&self, id: &str) -> StoreResult<Option<Note>> {
        match self.store.get(&self.doc(NOTES, id)?)? {
            Some(d) => Ok(Some(decode_with_id(&d, |n: &mut Note, id| n.id = id)?)),
            None => Ok(None),
        }
    }

    pub fn add_note(&self, note: &Note) -> StoreResult<String> {
        self.store.add(&self.collection(NOTES)?, encode(note)?)
    }

    pub fn update_note(&self, id: &str, patch: Map<String, Value>) -> StoreResult<()> {
        self.store.update(&self.doc(NOTES, id)?, patch)
    }

    pub fn delete_note(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&self.doc(NOTES, id)?)
    }

    // curriculum

    pub fn curriculum(&self) -> StoreResult<Vec<CurriculumItem>> {
        self.store
            .get_all(&self.collection(CURRICULUM)?)?
            .iter()
            .map(|d| decode_with_id(d, |c: &mut CurriculumItem, id| c.id = id))
            .collect()
    }

    pub fn curriculum_item(&self, id: &str) -> StoreResult<Option<CurriculumItem>> {
        match self.store.get(&self.doc(CURRICULUM, id)?)? {
            Some(d) => Ok(Some(decode_with_id(&d, |c: &mut CurriculumItem, id| {
                c.id = id
            })?)),
            None => Ok(None),
        }
    }

    pub fn add_curriculum_item(&self, item: &CurriculumItem) -> StoreResult<String> {
        self.store.add(&self.collection(CURRICULUM)?, encode(item)?)
    }

    pub fn delete_curriculum_item(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&self.doc(CURRICULUM, id)?)
    }

    pub fn clear(&self, name: &str) -> StoreResult<usize> {
        self.store.delete_all(&self.collection(name)?)
    }

    /// Empty every per-grade collection. Returns the number of documents removed.
    pub fn clear_all(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for name in GRADE_COLLECTIONS {
            removed += self.clear(name)?;
        }
        Ok(removed)
    }
}

pub const CUSTOM_STAGES: &str = "customStages";

pub struct StagesRepo<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> StagesRepo<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    fn collection() -> StoreResult<CollectionPath> {
        CollectionPath::new([CUSTOM_STAGES])
    }

    pub fn list(&self) -> StoreResult<Vec<CustomStage>> {
        self.store
            .get_all(&Self::collection()?)?
            .iter()
            .map(|d| decode_with_id(d, |s: &mut CustomStage, id| s.id = id))
            .collect()
    }

    pub fn add(&self, stage: &CustomStage) -> StoreResult<String> {
        self.store.add(&Self::collection()?, encode(stage)?)
    }

    pub fn update_field(&self, id: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut patch = Map::new();
        patch.insert(field.to_string(), Value::String(value.to_string()));
        self.store.update(&Self::collection()?.doc(id)?, patch)
    }

    pub fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&Self::collection()?.doc(id)?)
    }
}
