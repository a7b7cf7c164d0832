use similar::TextDiff;
use std::path::Path;

use crate::RegresqlError;

/// Lines of context around each hunk.
pub const DEFAULT_CONTEXT: usize = 3;

fn read_lines(path: &Path) -> crate::Result<String> {
    std::fs::read_to_string(path).map_err(|source| RegresqlError::Comparison {
        path: path.to_path_buf(),
        source,
    })
}

/// Unified diff from `expected` to `actual`, empty when both files hold the
/// same text.
///
/// An unreadable file is a `Comparison` error, never an empty diff.
pub fn diff_files(expected: &Path, actual: &Path, context: usize) -> crate::Result<String> {
    let a = read_lines(expected)?;
    let b = read_lines(actual)?;

    Ok(diff_lines(
        &expected.display().to_string(),
        &actual.display().to_string(),
        &a,
        &b,
        context,
    ))
}

/// Compares two texts line by line and reports differences in the unified
/// format; `from` and `to` name the two sides in the headers.
pub fn diff_lines(from: &str, to: &str, a: &str, b: &str, context: usize) -> String {
    if a == b {
        return String::new();
    }

    TextDiff::from_lines(a, b)
        .unified_diff()
        .context_radius(context)
        .header(from, to)
        .to_string()
}
