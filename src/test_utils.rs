use crate::RegresqlError;
use crate::database::{Connection, ResultSet};

/// An in-memory `Connection` that records every call and answers from a
/// script instead of a server.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    /// Every `(sql, args)` received, in order
    pub calls: Vec<(String, Vec<String>)>,
    responses: Vec<(String, ResultSet)>,
    default_response: ResultSet,
    failures: Vec<(String, String)>,
    ping_error: Option<String>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result returned when no `respond_to` fragment matches.
    pub fn respond_with(&mut self, result: ResultSet) -> &mut Self {
        self.default_response = result;
        self
    }

    /// Result returned for any query whose text contains `fragment`.
    pub fn respond_to(&mut self, fragment: &str, result: ResultSet) -> &mut Self {
        self.responses.push((fragment.to_string(), result));
        self
    }

    /// Fail any query whose text contains `fragment` or that receives it as
    /// an argument.
    pub fn fail_on_arg(&mut self, fragment: &str, message: &str) -> &mut Self {
        self.failures
            .push((fragment.to_string(), message.to_string()));
        self
    }

    pub fn fail_ping(&mut self, message: &str) -> &mut Self {
        self.ping_error = Some(message.to_string());
        self
    }
}

impl Connection for ScriptedConnection {
    fn query(&mut self, sql: &str, args: &[String]) -> crate::Result<ResultSet> {
        self.calls.push((sql.to_string(), args.to_vec()));

        if let Some((_, message)) = self
            .failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()) || args.contains(fragment))
        {
            return Err(RegresqlError::Execution {
                message: message.clone(),
            });
        }

        let result = self
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(result)
    }

    fn uri(&self) -> &str {
        "memory://scripted"
    }

    fn ping(&mut self) -> crate::Result<()> {
        match &self.ping_error {
            Some(message) => Err(RegresqlError::Execution {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
