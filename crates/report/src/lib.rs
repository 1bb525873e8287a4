pub mod render;
pub mod rows;

pub use render::{to_csv, to_html};
pub use rows::{build_rows, ReportOptions, ReportRow, RowKind, StatusLabels};
