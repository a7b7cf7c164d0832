use bytes::BytesMut;
use postgres::{Client, NoTls};
use postgres_types::{Format, IsNull, ToSql, Type, to_sql_checked};
use std::error::Error;
use tracing::{debug, info};

use crate::RegresqlError;
use crate::database::{ResultSet, Value};
use crate::query::Query;

/// Something that runs a normalized query with positional text arguments
/// and hands back the whole result grid.
pub trait Connection {
    /// Runs `sql` with one argument per `$n` marker.
    fn query(&mut self, sql: &str, args: &[String]) -> crate::Result<ResultSet>;

    /// Runs a parsed query with one argument per parameter occurrence, as
    /// derived from a plan.
    fn execute(&mut self, query: &Query, args: &[String]) -> crate::Result<ResultSet> {
        self.query(&query.normalized, args)
    }

    /// Where the connection points, for error messages.
    fn uri(&self) -> &str;

    /// Some failures (bad credentials, missing certificates) only show up
    /// once a query runs, so validating a connection means running one.
    fn ping(&mut self) -> crate::Result<()> {
        self.query("select 1", &[]).map(|_| ())
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn query(&mut self, sql: &str, args: &[String]) -> crate::Result<ResultSet> {
        (**self).query(sql, args)
    }

    fn execute(&mut self, query: &Query, args: &[String]) -> crate::Result<ResultSet> {
        (**self).execute(query, args)
    }

    fn uri(&self) -> &str {
        (**self).uri()
    }

    fn ping(&mut self) -> crate::Result<()> {
        (**self).ping()
    }
}

pub struct PgConnection {
    client: Client,
    uri: String,
}

impl PgConnection {
    pub fn connect(uri: &str) -> crate::Result<Self> {
        info!("Connecting to '{}'", uri);

        let client = Client::connect(uri, NoTls).map_err(|e| RegresqlError::Connection {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            uri: uri.to_string(),
        })
    }

    fn run(&mut self, sql: &str, args: &[&str]) -> crate::Result<ResultSet> {
        debug!("Executing: {} with {:?}", sql, args);

        let statement = self.client.prepare(sql)?;

        let params: Vec<TextArg<'_>> = args.iter().copied().map(TextArg).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows = self.client.query(&statement, &refs)?;

        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut result_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = (0..row.len())
                .map(|idx| row.try_get::<_, Value>(idx))
                .collect::<Result<Vec<_>, _>>()?;
            result_rows.push(values);
        }

        Ok(ResultSet::new(columns, result_rows))
    }
}

impl Connection for PgConnection {
    fn query(&mut self, sql: &str, args: &[String]) -> crate::Result<ResultSet> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(sql, &args)
    }

    fn execute(&mut self, query: &Query, args: &[String]) -> crate::Result<ResultSet> {
        let args = query.fold_args(args);
        self.run(&query.normalized, &args)
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

/// A plan value sent to the server.
///
/// Plans only hold strings, so every argument goes out in text format and
/// the server parses it into whatever type it inferred for the marker.
#[derive(Debug)]
struct TextArg<'a>(&'a str);

impl ToSql for TextArg<'_> {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}
