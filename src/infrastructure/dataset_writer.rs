//! Dataset output
//!
//! Writes the full records as CSV (and optionally pretty JSON) and the mint
//! projection as CSV. CSV files always carry a header row in the fixed column
//! order, even when there are no rows.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::domain::{ItemRecord, MintRecord};
use crate::infrastructure::config::OutputConfig;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths of the files produced by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDatasets {
    pub full_csv: PathBuf,
    pub full_json: Option<PathBuf>,
    pub mint_csv: PathBuf,
}

pub struct DatasetWriter {
    output: OutputConfig,
}

impl DatasetWriter {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    /// Write every dataset, creating the output directory when missing.
    pub fn write_all(&self, records: &[ItemRecord], fx_rate: f64) -> DatasetResult<WrittenDatasets> {
        fs::create_dir_all(&self.output.directory).map_err(io_error(&self.output.directory))?;

        let full_csv = self.output.full_csv_path();
        write_csv(&full_csv, &ItemRecord::COLUMNS, records, self.output.csv_bom)?;
        info!("CSV saved: {}", full_csv.display());

        let full_json = if self.output.save_json {
            let path = self.output.full_json_path();
            write_json(&path, records)?;
            info!("JSON saved: {}", path.display());
            Some(path)
        } else {
            None
        };

        let mint_csv = self.output.mint_csv_path();
        let mint = MintRecord::project_all(records, fx_rate);
        write_csv(&mint_csv, &MintRecord::COLUMNS, &mint, self.output.csv_bom)?;
        info!("Mint CSV saved: {}", mint_csv.display());

        Ok(WrittenDatasets {
            full_csv,
            full_json,
            mint_csv,
        })
    }
}

/// Header row from `columns`, then one serialized row per item.
pub fn write_csv<T: Serialize>(path: &Path, columns: &[&str], rows: &[T], bom: bool) -> DatasetResult<()> {
    let mut file = BufWriter::new(File::create(path).map_err(io_error(path))?);
    if bom {
        file.write_all(UTF8_BOM).map_err(io_error(path))?;
    }

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

/// Pretty-printed JSON array; non-ASCII text is written as-is.
pub fn write_json<T: Serialize>(path: &Path, rows: &[T]) -> DatasetResult<()> {
    let mut file = BufWriter::new(File::create(path).map_err(io_error(path))?);
    serde_json::to_writer_pretty(&mut file, rows)?;
    file.write_all(b"\n").map_err(io_error(path))?;
    file.flush().map_err(io_error(path))?;
    Ok(())
}
