use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::RegresqlError;
use crate::plan::{PlanError, create_empty_plan};
use crate::query::parse_query_file;
use crate::suite::layout::{Layout, ensure_dir};
use crate::suite::session::RunSummary;

const QUERY_EXTENSION: &str = "sql";

/// A directory of query files, relative to the suite root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// `.` for the root itself
    pub dir: PathBuf,
    pub files: Vec<String>,
}

impl Folder {
    /// This folder's mirror under `base`.
    pub fn under(&self, base: &Path) -> PathBuf {
        if self.dir == Path::new(".") {
            base.to_path_buf()
        } else {
            base.join(&self.dir)
        }
    }
}

/// The query files found under a root, grouped by directory.
#[derive(Debug, Clone)]
pub struct Suite {
    pub layout: Layout,
    pub folders: Vec<Folder>,
}

impl Suite {
    /// Recursively collects `*.sql` files under `root` in lexical order.
    pub fn walk(root: impl Into<PathBuf>) -> crate::Result<Self> {
        Self::walk_with(Layout::new(root))
    }

    /// Like `walk`, for a layout whose artifacts may live elsewhere.
    pub fn walk_with(layout: Layout) -> crate::Result<Self> {
        let root = layout.root.clone();
        if !root.is_dir() {
            return Err(RegresqlError::Config(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        let mut folders: IndexMap<PathBuf, Vec<String>> = IndexMap::new();

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(QUERY_EXTENSION)
            {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            let dir = match relative.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let name = entry.file_name().to_string_lossy().into_owned();

            debug!("Found query file '{}'", path.display());
            folders.entry(dir).or_default().push(name);
        }

        Ok(Self {
            layout,
            folders: folders
                .into_iter()
                .map(|(dir, files)| Folder { dir, files })
                .collect(),
        })
    }

    /// Every query file as `(folder, path)`, in traversal order.
    pub fn query_files(&self) -> impl Iterator<Item = (&Folder, PathBuf)> + '_ {
        self.folders.iter().flat_map(move |folder| {
            let dir = folder.under(&self.layout.root);
            folder.files.iter().map(move |name| (folder, dir.join(name)))
        })
    }

    pub fn len(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes an empty plan for every query file that has none yet.
    pub fn create_plans(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        for (folder, path) in self.query_files() {
            summary.files += 1;
            let plans_dir = folder.under(&self.layout.plans_dir());

            let created = ensure_dir(&plans_dir)
                .and_then(|_| parse_query_file(&path))
                .and_then(|query| create_empty_plan(&query, &plans_dir).map(|_| ()));

            match created {
                Ok(()) => {}
                Err(RegresqlError::Plan(PlanError::AlreadyExists { path })) => {
                    info!("Skipping: plan '{}' already exists", path.display());
                }
                Err(e) => summary.fail(path, e),
            }
        }

        summary
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.layout.root.display())?;
        for folder in &self.folders {
            writeln!(f, "  {}/", folder.dir.display())?;
            for name in &folder.files {
                writeln!(f, "    {}", name)?;
            }
        }
        Ok(())
    }
}
