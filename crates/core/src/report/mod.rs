pub mod builder;
pub mod export;
pub mod types;

pub use export::{ExportFormat, ReportError, Reporter};
pub use types::*;
