//! On-screen Arabic keyboard for name and note fields.

use serde::Serialize;

const ROWS: [&[&str]; 5] = [
    &["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"],
    &["ق", "و", "ع", "ر", "ت", "ي", "و", "ي", "ه", "خ"],
    &["ض", "ص", "ث", "ف", "غ", "ع", "ه", "خ", "ح", "ج", "د"],
    &["ط", "ك", "م", "ن", "ت", "ا", "ل", "ب", "ي", "س", "ش"],
    &["ظ", "ز", "و", "ة", "ى", "لا", "ر", "ؤ", "ء", "ئ"],
];

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub rows: Vec<Vec<&'static str>>,
    pub controls: Vec<&'static str>,
}

pub fn layout() -> Layout {
    Layout {
        rows: ROWS.iter().map(|r| r.to_vec()).collect(),
        controls: vec!["backspace", "space", "clear"],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(String),
    Backspace,
    Space,
    Clear,
}

impl Key {
    pub fn parse(s: &str) -> Option<Key> {
        match s {
            "" => None,
            "backspace" => Some(Key::Backspace),
            "space" => Some(Key::Space),
            "clear" => Some(Key::Clear),
            other => Some(Key::Char(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditResult {
    pub text: String,
    pub caret: usize,
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Apply a key press to `text` with the selection `[start, end)` given in
/// char offsets. Out-of-range offsets clamp to the end of the text.
pub fn apply_key(text: &str, start: usize, end: usize, key: &Key) -> EditResult {
    let len = text.chars().count();
    let (mut start, mut end) = (start.min(len), end.min(len));
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }

    let insert = |s: &str| {
        let mut out = String::with_capacity(text.len() + s.len());
        out.push_str(&text[..byte_offset(text, start)]);
        out.push_str(s);
        out.push_str(&text[byte_offset(text, end)..]);
        EditResult {
            text: out,
            caret: start + s.chars().count(),
        }
    };

    match key {
        Key::Char(c) => insert(c),
        Key::Space => insert(" "),
        Key::Clear => EditResult {
            text: String::new(),
            caret: 0,
        },
        Key::Backspace if start != end => insert(""),
        Key::Backspace if start == 0 => EditResult {
            text: text.to_string(),
            caret: 0,
        },
        Key::Backspace => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..byte_offset(text, start - 1)]);
            out.push_str(&text[byte_offset(text, start)..]);
            EditResult {
                text: out,
                caret: start - 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_digit_row_first() {
        let l = layout();
        assert_eq!(l.rows.len(), 5);
        assert_eq!(l.rows[0].len(), 10);
        assert!(l.rows[4].contains(&"لا"));
    }

    #[test]
    fn inserts_at_caret_and_replaces_selection() {
        let r = apply_key("علي", 1, 1, &Key::Char("ل".into()));
        assert_eq!(r.text, "عللي");
        assert_eq!(r.caret, 2);

        let r = apply_key("محمد علي", 5, 8, &Key::Char("حسن".into()));
        assert_eq!(r.text, "محمد حسن");
        assert_eq!(r.caret, 8);
    }

    #[test]
    fn backspace_and_controls() {
        let r = apply_key("سارة", 4, 4, &Key::Backspace);
        assert_eq!(r.text, "سار");
        assert_eq!(r.caret, 3);

        let r = apply_key("سارة", 0, 0, &Key::Backspace);
        assert_eq!(r.text, "سارة");

        let r = apply_key("ab", 99, 99, &Key::Space);
        assert_eq!(r.text, "ab ");
        assert_eq!(r.caret, 3);

        assert_eq!(apply_key("xyz", 1, 2, &Key::Clear).text, "");
        assert_eq!(Key::parse("clear"), Some(Key::Clear));
        assert_eq!(Key::parse(""), None);
    }
}
