//! `@` trigger detection for the message composer.

/// An in-progress `@query` ending at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Byte offset of the `@`.
    pub start: usize,
    /// Byte offset of the cursor.
    pub end: usize,
    /// Text between the `@` and the cursor, untrimmed.
    pub query: String,
}

impl Trigger {
    /// Whether the `@` opens a word in `text` rather than sitting inside one
    /// (`me@host`).
    pub fn starts_word(&self, text: &str) -> bool {
        text[..self.start]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace)
    }
}

/// Finds the active trigger in `text` for a cursor at char index `cursor`.
///
/// Only the text before the cursor is considered. The last `@` there is the
/// trigger as long as nothing after it is whitespace.
pub fn active_trigger(text: &str, cursor: usize) -> Option<Trigger> {
    let end = byte_offset(text, cursor);
    let before = &text[..end];
    let start = before.rfind('@')?;
    let query = &before[start + 1..];

    if query.chars().any(char::is_whitespace) {
        return None;
    }

    Some(Trigger {
        start,
        end,
        query: query.to_string(),
    })
}

/// Removes the trigger text from `text`, returning the new text and the
/// cursor (char index) where the trigger began.
pub fn remove_trigger(text: &str, trigger: &Trigger) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..trigger.start]);
    out.push_str(&text[trigger.end..]);
    let cursor = text[..trigger.start].chars().count();
    (out, cursor)
}

/// Char index to byte offset, clamped to the end of `text`.
fn byte_offset(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
