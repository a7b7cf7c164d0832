pub mod parser;


pub use parser::{Query, parse_query_file, parse_query_string};
