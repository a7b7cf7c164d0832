pub mod diff;
pub mod tap;

pub use diff::{DEFAULT_CONTEXT, diff_files, diff_lines};
pub use tap::{Case, Diagnostic, ReportSummary, Reporter, TestEvent};
