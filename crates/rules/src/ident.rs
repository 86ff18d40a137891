//! Sensor identifier scheme for rule expressions.
//!
//! A sensor with command `010D` is addressed in an expression as `s010D`.
//! The prefix keeps identifiers from starting with a digit, which most
//! expression grammars reject.

/// Prefix prepended to a sensor command to form its expression identifier.
pub const IDENT_PREFIX: char = 's';

/// Expression identifier for a sensor command, e.g. `010D` -> `s010D`.
pub fn identifier_for(command: &str) -> String {
    format!("{IDENT_PREFIX}{command}")
}

/// Command encoded in an identifier, if it carries the sensor prefix.
pub fn command_for(identifier: &str) -> Option<&str> {
    identifier
        .strip_prefix(IDENT_PREFIX)
        .filter(|rest| !rest.is_empty())
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Scan `text` for candidate sensor identifiers.
///
/// A candidate is a maximal identifier-shaped word (`[A-Za-z_][A-Za-z0-9_]*`)
/// that starts with [`IDENT_PREFIX`] and has at least one character after it.
/// Occurrences are returned in order, duplicates included.
///
/// Known limitation: any other identifier starting with the prefix letter,
/// such as a function named `sin`, is also reported and will fail the
/// activation match against bound sensors.
pub fn extract_sensor_idents(text: &str) -> Vec<&str> {
    let mut idents = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if !is_ident_start(ch) {
            continue;
        }
        let mut end = start + ch.len_utf8();
        while let Some(&(idx, next)) = chars.peek() {
            if !is_ident_continue(next) {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }
        let word = &text[start..end];
        if word.len() > IDENT_PREFIX.len_utf8() && word.starts_with(IDENT_PREFIX) {
            idents.push(word);
        }
    }
    idents
}
