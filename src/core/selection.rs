// LogFold - core/selection.rs
//
// Turns a caret or selection inside one line into a candidate hidden
// substring. Offsets are byte offsets into the line and must fall on
// character boundaries.

use crate::util::constants::{HIDE_ACTION_LABEL_CHARS, MAX_HIDDEN_SUBSTRING_CHARS};
use crate::util::error::SelectionUnavailable;
use std::ops::Range;

/// Derive the substring to hide from `selection` within `line`.
///
/// A non-empty selection is taken as-is. An empty selection (a bare caret)
/// expands to the maximal run of alphanumeric characters touching the caret.
/// The result is rejected when empty or longer than
/// `MAX_HIDDEN_SUBSTRING_CHARS` characters.
pub fn derive_hidden_substring(
    line: &str,
    selection: Range<usize>,
) -> Result<String, SelectionUnavailable> {
    let Range { start, end } = selection;
    if start > end
        || end > line.len()
        || !line.is_char_boundary(start)
        || !line.is_char_boundary(end)
    {
        return Err(SelectionUnavailable::OutOfBounds {
            start,
            end,
            len: line.len(),
        });
    }

    let span = if start == end {
        word_at(line, start)
    } else {
        start..end
    };

    let text = &line[span];
    let length = text.chars().count();
    if length == 0 {
        return Err(SelectionUnavailable::Empty);
    }
    if length > MAX_HIDDEN_SUBSTRING_CHARS {
        return Err(SelectionUnavailable::TooLong {
            length,
            max_length: MAX_HIDDEN_SUBSTRING_CHARS,
        });
    }
    Ok(text.to_string())
}

/// Byte range of the alphanumeric run touching `caret`.
fn word_at(line: &str, caret: usize) -> Range<usize> {
    let start = line[..caret]
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric())
        .last()
        .map_or(caret, |(i, _)| i);
    let end = line[caret..]
        .char_indices()
        .find(|(_, c)| !c.is_alphanumeric())
        .map_or(line.len(), |(i, _)| caret + i);
    start..end
}

/// Menu label for the "hide lines containing ..." action.
pub fn hide_action_label(substring: &str) -> String {
    if substring.chars().count() > HIDE_ACTION_LABEL_CHARS {
        let head: String = substring.chars().take(HIDE_ACTION_LABEL_CHARS).collect();
        format!("Hide lines containing '{head}...'")
    } else {
        format!("Hide lines containing '{substring}'")
    }
}
