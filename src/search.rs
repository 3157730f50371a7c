//! Student row search used by the list pages.
//!
//! A digits-only query is a student number and must match exactly; anything
//! else matches names by substring. Matches float to the top and are
//! highlighted, everything else keeps list order.

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SearchRow {
    pub number: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// Row numbers in display order.
    pub order: Vec<usize>,
    pub highlighted: Vec<usize>,
    pub no_match: bool,
}

fn is_number_query(q: &str) -> bool {
    !q.is_empty() && q.chars().all(|c| c.is_ascii_digit())
}

pub fn search_rows(rows: &[SearchRow], query: &str) -> SearchOutcome {
    let mut by_number: Vec<&SearchRow> = rows.iter().collect();
    by_number.sort_by_key(|r| r.number);
    let original: Vec<usize> = by_number.iter().map(|r| r.number).collect();

    let q = query.trim();
    if q.is_empty() {
        return SearchOutcome {
            order: original,
            highlighted: Vec::new(),
            no_match: false,
        };
    }

    let numeric = is_number_query(q);
    let (hits, rest): (Vec<&SearchRow>, Vec<&SearchRow>) = by_number.into_iter().partition(|r| {
        if numeric {
            r.number.to_string() == q
        } else {
            r.name.contains(q)
        }
    });

    if hits.is_empty() {
        return SearchOutcome {
            order: original,
            highlighted: Vec::new(),
            no_match: true,
        };
    }

    let highlighted: Vec<usize> = hits.iter().map(|r| r.number).collect();
    let order = highlighted
        .iter()
        .copied()
        .chain(rest.iter().map(|r| r.number))
        .collect();
    SearchOutcome {
        order,
        highlighted,
        no_match: false,
    }
}
