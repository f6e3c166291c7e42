//! Filename ordering for the `NNN_name` convention.
//!
//! Posts are ordered by an optional numeric prefix followed by an underscore:
//!
//! - `1_intro.md` → prefix `1`
//! - `010_setup.md` → prefix `10`
//! - `notes.md` → no prefix
//!
//! ## Ordering Rules
//!
//! 1. Two prefixed names compare by prefix value (`2_x` before `10_x`).
//! 2. A prefixed name always sorts before an unprefixed one.
//! 3. Everything else (no prefixes, or equal prefix values) falls back to
//!    plain lexicographic comparison of the full name.
//!
//! The result is a total order, so it can drive `sort_by` directly.

use std::cmp::Ordering;

/// Numeric prefix of a `NNN_name` filename, as its digit string.
///
/// Returns `None` unless the name starts with at least one ASCII digit
/// immediately followed by `_`:
/// - `"12_post.md"` → `Some("12")`
/// - `"12post.md"` → `None`
/// - `"_post.md"` → `None`
pub fn numeric_prefix(name: &str) -> Option<&str> {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && name.as_bytes().get(digits) == Some(&b'_') {
        Some(&name[..digits])
    } else {
        None
    }
}

/// Compare two decimal digit strings by integer value, without parsing.
///
/// Prefixes can be arbitrarily long, so leading zeros are stripped and the
/// remaining digits are compared by length first, then digit by digit.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Total order over post filenames, numeric-prefix aware.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (numeric_prefix(a), numeric_prefix(b)) {
        (Some(pa), Some(pb)) => compare_digits(pa, pb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sort filenames in place by [`compare_names`].
pub fn sort_names(names: &mut [String]) {
    names.sort_by(|a, b| compare_names(a, b));
}
