//! Academic-year arithmetic and the Coptic date shown on the dashboard clock.

use crate::model::{Month, Student};
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::fmt;

/// A month's fee becomes overdue on this day of the month.
pub const DUE_DAY: u32 = 3;

/// Position inside the academic year: August is 0, July is 11.
pub fn academic_index(month: Month) -> u32 {
    (month.number() + 12 - 8) % 12
}

pub fn academic_cmp(a: Month, b: Month) -> Ordering {
    academic_index(a).cmp(&academic_index(b))
}

/// Sort month keys in academic order. Unknown keys go last, in their
/// original relative order.
pub fn sort_month_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| match (Month::parse(a), Month::parse(b)) {
        (Some(a), Some(b)) => academic_cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Calendar year in which the academic year containing `today` began.
pub fn academic_year_start(today: NaiveDate) -> i32 {
    if today.month() >= 8 {
        today.year()
    } else {
        today.year() - 1
    }
}

pub fn academic_year_label(today: NaiveDate) -> String {
    let start = academic_year_start(today);
    format!("{}/{}", start, start + 1)
}

/// Billed months whose fee is due by `today`: every billed month before the
/// current one in the academic year, plus the current month from the due day.
pub fn due_months(today: NaiveDate) -> Vec<Month> {
    let Some(current) = Month::from_number(today.month()) else {
        return Vec::new();
    };
    let current_idx = academic_index(current);
    Month::BILLED
        .iter()
        .copied()
        .filter(|m| {
            let idx = academic_index(*m);
            idx < current_idx || (*m == current && today.day() >= DUE_DAY)
        })
        .collect()
}

/// Due months the student has not paid, in academic order.
pub fn unpaid_months(student: &Student, today: NaiveDate) -> Vec<Month> {
    due_months(today)
        .into_iter()
        .filter(|m| !student.is_paid(*m))
        .collect()
}

const COPTIC_MONTHS: [&str; 13] = [
    "توت", "بابه", "هاتور", "كيهك", "طوبة", "أمشير", "برمهات", "برمودة", "بشنس", "بؤونة", "أبيب",
    "مسرى", "نسيء",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopticDate {
    pub day: u32,
    pub month: usize,
    pub year: i64,
}

impl CopticDate {
    pub fn month_name(&self) -> &'static str {
        COPTIC_MONTHS[self.month.min(COPTIC_MONTHS.len() - 1)]
    }
}

impl fmt::Display for CopticDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.day, self.month_name(), self.year)
    }
}

fn coptic_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(284, 9, 11).unwrap_or(NaiveDate::MIN)
}

/// Approximate Coptic date: 365.25-day years of twelve 30-day months with
/// the thirteenth month taking the remainder.
pub fn coptic_date(today: NaiveDate) -> CopticDate {
    let days = (today - coptic_epoch()).num_days().max(0) as f64;
    let year = (days / 365.25).floor() as i64 + 1;
    let remaining = (days - (year - 1) as f64 * 365.25).floor() as i64;
    let mut month = remaining / 30;
    let mut day = remaining % 30;
    if month >= 13 {
        month = 12;
        day = remaining - 12 * 30;
    }
    CopticDate {
        day: day as u32 + 1,
        month: month as usize,
        year,
    }
}
