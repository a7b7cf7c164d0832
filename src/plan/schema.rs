use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Parameter name to value, in the order the plan file lists them.
pub type Bindings = IndexMap<String, String>;

#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("Plan file '{}' already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Plan file '{}' not found for query '{}' which uses variables", path.display(), query.display())]
    Missing { path: PathBuf, query: PathBuf },

    #[error("Malformed plan file '{}': {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

/// On-disk shape of a plan: `label -> {param: value}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDocument {
    pub names: Vec<String>,
    pub bindings: Vec<Bindings>,
}

impl PlanDocument {
    /// Reads a plan document, keeping label and key order as written.
    ///
    /// Scalars of any YAML type are accepted and turned into strings, so a
    /// user writing `id: 5` or an unquoted `1:` label gets what they meant.
    pub fn parse(path: &Path, content: &str) -> Result<Self, PlanError> {
        let malformed = |message: String| PlanError::Malformed {
            path: path.to_path_buf(),
            message,
        };

        let root: Value = serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

        let mapping = match root {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(malformed(format!(
                    "expected a mapping of binding sets, found {}",
                    kind_of(&other)
                )));
            }
        };

        let mut document = Self::default();

        for (label, entry) in mapping {
            let label = scalar_to_string(&label)
                .ok_or_else(|| malformed(format!("binding label {:?} is not a scalar", label)))?;

            // labels become part of result file names
            if label.is_empty() || label == "." || label == ".." || label.contains(['/', '\\']) {
                return Err(malformed(format!(
                    "binding label '{}' cannot be used in a file name",
                    label
                )));
            }

            let entry = match entry {
                Value::Mapping(m) => m,
                Value::Null => Mapping::new(),
                other => {
                    return Err(malformed(format!(
                        "binding set '{}' must be a mapping, found {}",
                        label,
                        kind_of(&other)
                    )));
                }
            };

            let mut bindings = Bindings::new();
            for (key, value) in entry {
                let key = scalar_to_string(&key).ok_or_else(|| {
                    malformed(format!("parameter name {:?} in '{}' is not a scalar", key, label))
                })?;
                let value = scalar_to_string(&value).ok_or_else(|| {
                    malformed(format!(
                        "value of '{}' in binding set '{}' must be a scalar, found {}",
                        key,
                        label,
                        kind_of(&value)
                    ))
                })?;
                bindings.insert(key, value);
            }

            document.names.push(label);
            document.bindings.push(bindings);
        }

        Ok(document)
    }

    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let doc: IndexMap<&str, &Bindings> = self
            .names
            .iter()
            .map(String::as_str)
            .zip(self.bindings.iter())
            .collect();

        serde_yaml::to_string(&doc)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
