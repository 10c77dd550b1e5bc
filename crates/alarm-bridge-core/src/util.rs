//! Text helpers for config handling and the CLI, plus poison-tolerant locking.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Longest piece of caller input echoed back inside an error message.
pub const EXCERPT_CHARS: usize = 120;

/// Trimmed text, or `None` when the value is absent or only whitespace.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Trimmed start of `text`, cut to [`EXCERPT_CHARS`] characters with a
/// trailing `...` when anything was dropped.
pub fn excerpt(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.char_indices();
    match chars.nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Lock a std mutex; a holder that panicked leaves plain data behind, so the
/// poison flag is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
