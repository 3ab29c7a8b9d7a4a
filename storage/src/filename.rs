//! Keyword → filesystem-safe token.

pub const MAX_FILENAME_LEN: usize = 100;
pub const PLACEHOLDER: &str = "untitled";

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Keeps `[A-Za-z0-9._-]`, collapses every run of other characters into a
/// single `_` and truncates to [`MAX_FILENAME_LEN`]. Input without a single
/// allowed character becomes [`PLACEHOLDER`].
pub fn sanitize_filename(name: &str) -> String {
    let mut safe = String::with_capacity(name.len());
    let mut in_run = false;
    let mut kept_any = false;

    for c in name.trim().chars() {
        if is_allowed(c) {
            safe.push(c);
            in_run = false;
            kept_any = true;
        } else if !in_run {
            safe.push('_');
            in_run = true;
        }
    }

    safe.truncate(MAX_FILENAME_LEN);

    if !kept_any {
        return PLACEHOLDER.to_string();
    }
    safe
}
