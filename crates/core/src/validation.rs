//! Small field checks shared by every input draft.

use crate::error::ValidationErrors;

/// Trimmed, non-empty text no longer than `max_len` characters.
///
/// Reports into `errors` and returns `None` on failure.
pub fn required_text(errors: &mut ValidationErrors, field: &str, value: &str, max_len: usize) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, "is required");
        return None;
    }
    if value.chars().count() > max_len {
        errors.push(field, format!("may not be longer than {max_len} characters"));
        return None;
    }
    Some(value.to_string())
}

/// Optional text; blank collapses to `None`. `max_len` of `None` means unbounded.
pub fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_len: Option<usize>,
) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if let Some(max_len) = max_len {
        if value.chars().count() > max_len {
            errors.push(field, format!("may not be longer than {max_len} characters"));
            return None;
        }
    }
    Some(value.to_string())
}

/// Unwrap a required value, reporting `is required` when absent.
pub fn required<T>(errors: &mut ValidationErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.push(field, "is required");
    }
    value
}
