//! Extension-dispatched table writers.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use cbs_core::Table;

use crate::path::EXPORT_EXTENSIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
    Parquet,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Result<Self, ExportError> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "xls" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            "parquet" => Ok(ExportFormat::Parquet),
            other => Err(ExportError::UnsupportedExtension {
                extension: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export extension {extension:?}; expected one of {}", EXPORT_EXTENSIONS.join(", "))]
    UnsupportedExtension { extension: String },
    #[error("no writer registered for {0:?} output")]
    NoWriter(ExportFormat),
    #[error("csv serialization failed")]
    Csv(#[from] csv::Error),
    #[error("json serialization failed")]
    Json(#[from] serde_json::Error),
    #[error("writing {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One serialization backend. Spreadsheet and columnar backends plug in
/// through this trait; only CSV and JSON ship here.
pub trait TableWriter: Send + Sync {
    fn write(&self, table: &Table, path: &Path) -> Result<(), ExportError>;
}

pub struct CsvWriter;

impl TableWriter for CsvWriter {
    fn write(&self, table: &Table, path: &Path) -> Result<(), ExportError> {
        let mut out = csv::Writer::from_path(path)?;
        out.write_record(table.columns())?;
        for row in table.rows() {
            out.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        out.flush().map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Rows as an array of `{column: value}` objects.
pub struct JsonWriter;

impl TableWriter for JsonWriter {
    fn write(&self, table: &Table, path: &Path) -> Result<(), ExportError> {
        let rows: Result<Vec<serde_json::Value>, serde_json::Error> = table
            .rows()
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for (column, cell) in table.columns().iter().zip(row) {
                    object.insert(column.clone(), serde_json::to_value(cell)?);
                }
                Ok(serde_json::Value::Object(object))
            })
            .collect();
        let file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, &rows?)?;
        Ok(())
    }
}

/// Format-writer registry. CSV and JSON are registered out of the box;
/// exporting a recognized format with no registered writer is an error,
/// not a panic.
pub struct Exporter {
    writers: HashMap<ExportFormat, Box<dyn TableWriter>>,
    overwrite: bool,
}

impl Default for Exporter {
    fn default() -> Self {
        let mut exporter = Exporter {
            writers: HashMap::new(),
            overwrite: true,
        };
        exporter.register(ExportFormat::Csv, Box::new(CsvWriter));
        exporter.register(ExportFormat::Json, Box::new(JsonWriter));
        exporter
    }
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn register(&mut self, format: ExportFormat, writer: Box<dyn TableWriter>) {
        self.writers.insert(format, writer);
    }

    /// Write `table` to `path`, returning the path actually written.
    /// With overwrite disabled, an existing target gets a short unique
    /// id appended to its stem instead of being replaced.
    pub fn export(&self, table: &Table, path: &Path) -> Result<PathBuf, ExportError> {
        let extension = path.extension().and_then(OsStr::to_str).unwrap_or("");
        let format = ExportFormat::from_extension(extension)?;
        let writer = self
            .writers
            .get(&format)
            .ok_or(ExportError::NoWriter(format))?;

        let target = if path.exists() && !self.overwrite {
            unique_sibling(path, extension)
        } else {
            if path.exists() {
                warn!(path = %path.display(), "overwriting existing export");
            }
            path.to_path_buf()
        };

        writer.write(table, &target)?;
        Ok(target)
    }
}

fn unique_sibling(path: &Path, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(crate::path::DEFAULT_STEM);
    let id = Uuid::new_v4().simple().to_string();
    let name = format!("{stem}-{}.{extension}", &id[..8]);
    path.with_file_name(name)
}
