//! Writing a [`ResultTable`] to disk.
//!
//! Writes are staged: the format name is validated, the table is serialized
//! in memory, and only then is the destination directory created and the
//! file placed with an atomic rename. A failed call leaves no partial file
//! and none of the directories it created behind.

use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use polars::prelude::{
    Column as FrameColumn, CsvWriter, DataFrame, JsonFormat, JsonWriter, NamedFrom,
    ParquetWriter, PlSmallStr, PolarsError, PolarsResult, SerWriter, Series,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    error::AirError,
    table::{Cell, ColumnKind, ResultTable},
};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Basename of the written file; the extension comes from the format.
pub const DEFAULT_OUTPUT_FILE: &str = "multiple_city_aqi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Csv,
    Json,
    Parquet,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub const fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Csv, OutputFormat::Json, OutputFormat::Parquet]
    }

    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(OutputFormat::as_str).collect()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = AirError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_lowercase();

        Self::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| AirError::InvalidOutputFormat { value: value.to_string() })
    }
}

/// Where a table in `format` lands inside `dir`.
pub fn output_path(dir: &Path, format: OutputFormat) -> PathBuf {
    dir.join(DEFAULT_OUTPUT_FILE).with_extension(format.extension())
}

/// Validate `format` by name, then write `table` into `dir`.
pub fn write(table: &ResultTable, format: &str, dir: &Path) -> Result<PathBuf, AirError> {
    let format: OutputFormat = format.parse()?;
    write_table(table, format, dir)
}

/// Write `table` into `dir` as [`output_path`]`(dir, format)`.
pub fn write_table(
    table: &ResultTable,
    format: OutputFormat,
    dir: &Path,
) -> Result<PathBuf, AirError> {
    let bytes = serialize(table, format)?;
    let path = output_path(dir, format);

    in_new_dir(dir, || place(&bytes, dir, &path))?;

    info!(path = %path.display(), rows = table.len(), %format, "wrote air-quality table");
    Ok(path)
}

/// Create `dir` and run `stage` in it. If either step fails, every directory
/// this call created is removed again.
fn in_new_dir<F>(dir: &Path, stage: F) -> Result<(), AirError>
where
    F: FnOnce() -> Result<(), AirError>,
{
    let created = first_missing_ancestor(dir);

    let result = fs::create_dir_all(dir)
        .map_err(|source| AirError::Io { path: dir.to_path_buf(), source })
        .and_then(|()| stage());

    if let (Err(_), Some(top)) = (&result, &created) {
        debug!(dir = %top.display(), "removing directories created for failed write");
        let _ = fs::remove_dir_all(top);
    }

    result
}

/// Top-most ancestor of `dir` (possibly `dir` itself) that does not exist yet.
fn first_missing_ancestor(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .last()
        .map(Path::to_path_buf)
}

/// Temp file in the same directory, then rename over `path`.
fn place(bytes: &[u8], dir: &Path, path: &Path) -> Result<(), AirError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| AirError::Io { path, source }
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    debug!(tmp = %tmp.path().display(), "staging output");

    tmp.write_all(bytes).map_err(io_err(path))?;
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| AirError::Io { path: path.to_path_buf(), source: e.error })?;

    Ok(())
}

/// Serialize `table` in `format` into memory.
pub fn serialize(table: &ResultTable, format: OutputFormat) -> Result<Vec<u8>, AirError> {
    let wrap = |source: PolarsError| AirError::Serialize { format, source };

    let mut df = to_dataframe(table).map_err(wrap)?;
    let mut buf = Vec::new();

    match format {
        OutputFormat::Csv => CsvWriter::new(&mut buf).include_header(true).finish(&mut df),
        OutputFormat::Json => {
            JsonWriter::new(&mut buf).with_json_format(JsonFormat::Json).finish(&mut df)
        }
        OutputFormat::Parquet => ParquetWriter::new(&mut buf).finish(&mut df).map(|_| ()),
    }
    .map_err(wrap)?;

    Ok(buf)
}

/// One `Float64` or `String` frame column per table column.
pub fn to_dataframe(table: &ResultTable) -> PolarsResult<DataFrame> {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let name = PlSmallStr::from(col.name());
            let cells = table.rows().iter().map(|r| &r.cells()[idx]);

            let series = match col.kind() {
                ColumnKind::Float => {
                    let values: Vec<f64> = cells
                        .map(|c| match c {
                            Cell::Float(v) => *v,
                            Cell::Text(_) => f64::NAN,
                        })
                        .collect();
                    Series::new(name, values)
                }
                ColumnKind::Text => {
                    let values: Vec<Option<&str>> = cells.map(Cell::as_str).collect();
                    Series::new(name, values)
                }
            };

            FrameColumn::from(series)
        })
        .collect();

    DataFrame::new(columns)
}
