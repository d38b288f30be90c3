//! Export path resolution and table serialization.
//!
//! [`path::resolve_export_path`] turns a loose user hint ("csv",
//! "out/", "report.json", "~") into a concrete file path;
//! [`writer::Exporter`] then dispatches the table to a format writer
//! chosen by that path's extension.

pub mod path;
pub mod writer;

pub use path::{resolve_export_path, DEFAULT_STEM};
pub use writer::{CsvWriter, ExportError, ExportFormat, Exporter, JsonWriter, TableWriter};
