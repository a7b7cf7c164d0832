use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::RegresqlError;
use crate::plan::Bindings;

// psql variable syntax: :name, :"name" or :'name'
static PARAMETER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#":(?:"([A-Za-z][A-Za-z0-9_]*)"|'([A-Za-z][A-Za-z0-9_]*)'|([A-Za-z][A-Za-z0-9_]*))"#)
        .unwrap()
});

/// A SQL query read from `path`, with its named parameters rewritten into
/// positional markers.
///
/// ```text
/// select * from foo where a = :a and b between :a and :b
/// ```
///
/// normalizes to `select * from foo where a = $1 and b between $1 and $2`,
/// with `vars = [a, b]`, `params = [a, a, b]` and `ordinals = [1, 1, 2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub path: PathBuf,
    /// Original query text
    pub text: String,
    /// Query text with `$n` markers, as sent to the server
    pub normalized: String,
    /// Every parameter occurrence, in text order
    pub params: Vec<String>,
    /// Distinct parameter names, in first-appearance order
    pub vars: Vec<String>,
    /// The `$n` marker written for each entry of `params`
    pub ordinals: Vec<usize>,
}

pub fn parse_query_file(path: &Path) -> crate::Result<Query> {
    let text = std::fs::read_to_string(path).map_err(|source| RegresqlError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse_query_string(path, &text))
}

pub fn parse_query_string(path: impl Into<PathBuf>, text: &str) -> Query {
    let mut params = Vec::new();
    let mut ordinals = Vec::new();
    let mut vars: Vec<String> = Vec::new();
    let mut normalized = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PARAMETER_RE.captures_iter(text) {
        let Some(token) = caps.get(0) else {
            continue;
        };

        // `::type` is a cast, not a parameter
        if text[..token.start()].ends_with(':') {
            continue;
        }

        let Some(name) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let name = name.as_str();

        let ordinal = match vars.iter().position(|v| v == name) {
            Some(idx) => idx + 1,
            None => {
                vars.push(name.to_string());
                vars.len()
            }
        };

        normalized.push_str(&text[last..token.start()]);
        normalized.push('$');
        normalized.push_str(&ordinal.to_string());
        last = token.end();

        params.push(name.to_string());
        ordinals.push(ordinal);
    }
    normalized.push_str(&text[last..]);

    let path = path.into();
    debug!(
        "Parsed query '{}': vars={:?} params={:?}",
        path.display(),
        vars,
        params
    );

    Query {
        path,
        text: text.to_string(),
        normalized,
        params,
        vars,
        ordinals,
    }
}

impl Query {
    /// Positional arguments for `bindings`, one per parameter occurrence.
    ///
    /// A name absent from `bindings` yields an empty string, same as the
    /// placeholder written into a freshly created plan.
    pub fn prepare(&self, bindings: &Bindings) -> (&str, Vec<String>) {
        let args = self
            .params
            .iter()
            .map(|name| bindings.get(name).cloned().unwrap_or_default())
            .collect();

        (&self.normalized, args)
    }

    /// Folds per-occurrence `args` into one value per `$n` marker, in
    /// marker order, using the ordinals recorded while parsing.
    ///
    /// A repeated occurrence carries the same value as the first one, so
    /// the first one wins. Arguments that do not line up with the recorded
    /// occurrences are passed through and the server reports the mismatch.
    pub fn fold_args<'a>(&self, args: &'a [String]) -> Vec<&'a str> {
        if args.len() != self.ordinals.len() {
            return args.iter().map(String::as_str).collect();
        }

        let mut values: Vec<&str> = vec![""; self.vars.len()];
        for (&ordinal, arg) in self.ordinals.iter().zip(args).rev() {
            values[ordinal - 1] = arg.as_str();
        }

        values
    }

    pub fn has_variables(&self) -> bool {
        !self.vars.is_empty()
    }

    /// File name without its extension, used to name plans and results.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
