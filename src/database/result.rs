use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::RegresqlError;
use crate::database::Value;

/// The full result grid of one query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Renders the result set as a fixed-width table, psql style:
    ///
    /// ```text
    /// id | name
    /// ---+-----
    /// 1  | a
    /// 22 | bb
    /// ```
    ///
    /// The output only depends on column and row order, so it can be
    /// compared textually between runs.
    pub fn pretty_print(&self) -> String {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Value::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, value) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(value.chars().count());
                }
            }
        }

        let mut out = String::new();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(name, &width)| {
                let justify = " ".repeat((width - name.chars().count()) / 2);
                format!("{:<width$}", format!("{}{}", justify, name), width = width)
            })
            .collect();
        out.push_str(&header.join(" | "));
        out.push('\n');

        let separator: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        out.push_str(&separator.join("-+-"));
        out.push('\n');

        let ncols = widths.len();
        for row in &rendered {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    if i + 1 < ncols {
                        format!("{:<width$}", value, width = widths[i])
                    } else {
                        value.clone()
                    }
                })
                .collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }

        out
    }

    /// Writes the pretty-printed result set to `path`.
    ///
    /// An existing file is an error unless `overwrite` is set, in which case
    /// it is truncated and rewritten.
    pub fn write(&self, path: &Path, overwrite: bool) -> crate::Result<()> {
        let serialization = |message: String| RegresqlError::Serialization {
            path: path.to_path_buf(),
            message,
        };

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                serialization("target file already exists".to_string())
            } else {
                serialization(e.to_string())
            }
        })?;

        file.write_all(self.pretty_print().as_bytes())
            .map_err(|e| serialization(e.to_string()))?;

        debug!(
            "Wrote {} row(s) to '{}'",
            self.rows.len(),
            path.display()
        );
        Ok(())
    }
}
