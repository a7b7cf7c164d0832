use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::RegresqlError;
use crate::plan::schema::{Bindings, PlanDocument, PlanError};
use crate::query::Query;

pub const PLAN_EXTENSION: &str = "yaml";
pub const RESULT_EXTENSION: &str = "out";

/// The labeled binding sets a query is tested with.
///
/// `names` and `bindings` are parallel: `names[i]` labels `bindings[i]`.
#[derive(Debug, Clone)]
pub struct Plan<'q> {
    pub query: &'q Query,
    /// Where the plan is (or would be) stored
    pub path: PathBuf,
    pub names: Vec<String>,
    pub bindings: Vec<Bindings>,
}

/// `<dir>/<query stem>.yaml`
pub fn plan_path(query: &Query, dir: &Path) -> PathBuf {
    dir.join(format!("{}.{}", query.stem(), PLAN_EXTENSION))
}

pub fn create_empty_plan<'q>(query: &'q Query, dir: &Path) -> crate::Result<Plan<'q>> {
    let path = plan_path(query, dir);

    if path.exists() {
        return Err(PlanError::AlreadyExists { path }.into());
    }

    let mut plan = Plan::empty(query, path);

    if query.has_variables() {
        let placeholders: Bindings = query
            .vars
            .iter()
            .map(|name| (name.clone(), String::new()))
            .collect();
        plan.names.push("1".to_string());
        plan.bindings.push(placeholders);
    }

    plan.write()?;
    Ok(plan)
}

pub fn get_plan<'q>(query: &'q Query, dir: &Path) -> crate::Result<Plan<'q>> {
    let path = plan_path(query, dir);

    if !path.exists() {
        if query.has_variables() {
            return Err(PlanError::Missing {
                path,
                query: query.path.clone(),
            }
            .into());
        }
        return Ok(Plan::empty(query, path));
    }

    info!("Reading bindings from '{}'", path.display());

    let content = std::fs::read_to_string(&path).map_err(|e| PlanError::Malformed {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let document = PlanDocument::parse(&path, &content)?;

    debug!(
        "Plan '{}' has {} binding set(s): {:?}",
        path.display(),
        document.names.len(),
        document.names
    );

    Ok(Plan {
        query,
        path,
        names: document.names,
        bindings: document.bindings,
    })
}

impl<'q> Plan<'q> {
    pub fn empty(query: &'q Query, path: PathBuf) -> Self {
        Self {
            query,
            path,
            names: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Persists the plan. A plan without binding sets is never written, so
    /// user edits are never clobbered by an empty document.
    pub fn write(&self) -> crate::Result<()> {
        if self.is_empty() {
            info!(
                "Skipping plan '{}': query uses no variable",
                self.path.display()
            );
            return Ok(());
        }

        info!("Creating plan '{}'", self.path.display());

        let document = PlanDocument {
            names: self.names.clone(),
            bindings: self.bindings.clone(),
        };
        let content = document.render().map_err(|e| RegresqlError::Serialization {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        std::fs::write(&self.path, content).map_err(|e| RegresqlError::Serialization {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Result file name for the `index`-th execution of this plan.
    pub fn output_file_name(&self, index: usize) -> String {
        match self.names.get(index) {
            Some(name) if self.query.has_variables() => {
                format!("{}.{}.{}", self.query.stem(), name, RESULT_EXTENSION)
            }
            _ => format!("{}.{}", self.query.stem(), RESULT_EXTENSION),
        }
    }
}
