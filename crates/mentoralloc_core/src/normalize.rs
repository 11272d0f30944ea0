//! Text and integer normalization for raw input fields.
//!
//! - Digit folding: Persian `۰`–`۹` (U+06F0–U+06F9) and Arabic-Indic
//!   `٠`–`٩` (U+0660–U+0669) map to ASCII `0`–`9`.
//! - Letter folding: Arabic `ي` (U+064A) → Persian `ی` (U+06CC),
//!   Arabic `ك` (U+0643) → Persian `ک` (U+06A9).
//! - Zero-width joiner (U+200C) is stripped everywhere.
//! - National-code normalization additionally strips leading/trailing
//!   whitespace and the separators `-` and space.

use crate::errors::CoreError;

const ZWNJ: char = '\u{200C}';

fn fold_char(c: char) -> Option<char> {
    match c {
        '۰'..='۹' => char::from_u32('0' as u32 + (c as u32 - '۰' as u32)),
        '٠'..='٩' => char::from_u32('0' as u32 + (c as u32 - '٠' as u32)),
        'ي' => Some('ی'),
        'ك' => Some('ک'),
        ZWNJ => None,
        other => Some(other),
    }
}

/// Fold Persian/Arabic digits and letter variants, strip ZWNJ. Does not
/// trim whitespace or strip separators — callers decide that per context.
pub fn fold_digits_and_letters(s: &str) -> String {
    s.chars().filter_map(fold_char).collect()
}

/// Normalize a mentor id or student-facing identifier: digit/letter
/// folding plus outer whitespace trim. Internal separators are
/// preserved (they carry meaning for the natural-sort prefix).
pub fn normalize_identifier(s: &str) -> String {
    fold_digits_and_letters(s.trim())
}

/// Normalize a national code: digit/letter folding, trimmed, and with
/// `-` and space separators removed entirely.
pub fn normalize_national_code(s: &str) -> String {
    fold_digits_and_letters(s.trim())
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect()
}

/// Coerce a raw join-key value to an integer, folding Persian/Arabic
/// digits first. `key_name` and `row_index` are carried for the error.
pub fn coerce_join_key_int(
    raw: &str,
    key_name: &'static str,
    row_index: usize,
) -> Result<i64, CoreError> {
    let folded = fold_digits_and_letters(raw.trim());
    folded
        .parse::<i64>()
        .map_err(|_| CoreError::JoinKeyNotInteger { key: key_name, row_index })
}

/// Split a delimiter-joined school-code token list on `, ; |`, trim each
/// token, and drop empty tokens.
pub fn split_school_tokens(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == ';' || c == '|')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
