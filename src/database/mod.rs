pub mod connection;
pub mod executor;
pub mod result;
pub mod value;

pub use connection::{Connection, PgConnection};
pub use executor::QueryExecutor;
pub use result::ResultSet;
pub use value::Value;
