use tracing::{debug, error, warn};

use crate::RegresqlError;
use crate::database::{Connection, ResultSet};
use crate::plan::Plan;

/// Runs plans against a single open connection.
pub struct QueryExecutor<C> {
    connection: C,
}

impl<C: Connection> QueryExecutor<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    /// Runs the trivial pre-flight query.
    pub fn ping(&mut self) -> crate::Result<()> {
        self.connection.ping()
    }

    /// Executes `plan` once per binding set, or exactly once without
    /// arguments when the query has no variables.
    ///
    /// The first failure is returned as is; the remaining binding sets of
    /// the plan are not run.
    pub fn execute(&mut self, plan: &Plan<'_>) -> crate::Result<Vec<ResultSet>> {
        let query = plan.query;

        if !query.has_variables() {
            debug!("Executing '{}'", query.path.display());
            let result = self
                .connection
                .query(&query.normalized, &[])
                .map_err(|e| failed(plan, None, &[], e))?;
            return Ok(vec![result]);
        }

        if plan.is_empty() {
            warn!(
                "Plan '{}' has no binding sets, '{}' is not executed",
                plan.path.display(),
                query.path.display()
            );
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(plan.len());

        for (name, bindings) in plan.names.iter().zip(&plan.bindings) {
            let (_, args) = query.prepare(bindings);
            debug!(
                "Executing '{}' with bindings '{}': {:?}",
                query.path.display(),
                name,
                args
            );

            let result = self
                .connection
                .execute(query, &args)
                .map_err(|e| failed(plan, Some(name.as_str()), &args, e))?;
            results.push(result);
        }

        Ok(results)
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

fn failed(plan: &Plan<'_>, name: Option<&str>, args: &[String], err: RegresqlError) -> RegresqlError {
    error!(
        "Error executing\n{}\nwith params: {:?}",
        plan.query.normalized, args
    );

    match err {
        RegresqlError::Execution { message } => RegresqlError::Execution {
            message: match name {
                Some(name) => format!(
                    "'{}' with bindings '{}' from '{}': {}",
                    plan.query.path.display(),
                    name,
                    plan.path.display(),
                    message
                ),
                None => format!("'{}': {}", plan.query.path.display(), message),
            },
        },
        other => other,
    }
}
