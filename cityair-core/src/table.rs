//! Column selection, per-city row normalization and the assembled result table.
//!
//! Columns are data rather than struct fields: a [`ColumnSpec`] is an ordered
//! list of named columns, and every [`Row`] carries exactly one [`Cell`] per
//! column. Parameters a payload lacks, including names no provider knows, are
//! still present as missing cells.

use std::{collections::HashSet, fmt};

use tracing::warn;

use crate::model::{FetchOutcome, MeasurementPayload};

pub const CITY_COLUMN: &str = "city";

/// Parameter columns used when the caller does not pick any.
pub const DEFAULT_PARAMS: &[&str] = &[
    "aqi", "pm2.5", "pm10", "o3", "co", "no2", "so2", "dew", "h", "p", "t", "w", "wg",
];

const METADATA_COLUMNS: &[(&str, Field)] = &[
    ("latitude", Field::Latitude),
    ("longitude", Field::Longitude),
    ("dominant_pollutant", Field::DominantPollutant),
    ("AQI_meaning", Field::AqiMeaning),
    ("AQI_health_implications", Field::AqiHealthImplications),
    ("timestamp", Field::Timestamp),
    ("timestamp_timezone", Field::TimestampTimezone),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `f64`, missing is NaN.
    Float,
    /// UTF-8 text, missing is `None`.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    City,
    Latitude,
    Longitude,
    DominantPollutant,
    AqiMeaning,
    AqiHealthImplications,
    Timestamp,
    TimestampTimezone,
    Param,
}

impl Field {
    fn kind(self) -> ColumnKind {
        match self {
            Field::Latitude | Field::Longitude | Field::Param => ColumnKind::Float,
            _ => ColumnKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    field: Field,
}

impl Column {
    fn new(name: &str, field: Field) -> Self {
        Self { name: name.to_string(), field }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.field.kind()
    }

    fn missing(&self) -> Cell {
        match self.kind() {
            ColumnKind::Float => Cell::Float(f64::NAN),
            ColumnKind::Text => Cell::Text(None),
        }
    }

    fn extract(&self, payload: &MeasurementPayload) -> Cell {
        let float = |v: Option<f64>| Cell::Float(v.unwrap_or(f64::NAN));
        let text = |v: &Option<String>| Cell::Text(v.clone());

        match self.field {
            // Filled in by `ColumnSpec::normalize`.
            Field::City => Cell::Text(None),
            Field::Latitude => float(payload.latitude),
            Field::Longitude => float(payload.longitude),
            Field::DominantPollutant => text(&payload.dominant_pollutant),
            Field::AqiMeaning => text(&payload.aqi_meaning),
            Field::AqiHealthImplications => text(&payload.aqi_health_implications),
            Field::Timestamp => text(&payload.timestamp),
            Field::TimestampTimezone => text(&payload.timestamp_timezone),
            Field::Param => float(payload.param(&self.name).and_then(|v| v.as_f64())),
        }
    }
}

/// The ordered set of columns one invocation produces.
///
/// Always `city`, then the metadata columns, then the requested parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    columns: Vec<Column>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self::with_params(DEFAULT_PARAMS.iter().copied())
    }
}

impl ColumnSpec {
    /// Spec with the given parameter columns, in order.
    ///
    /// Names are used verbatim, including ones no provider reports. Blank
    /// names, repeats and names that clash with `city` or a metadata column
    /// are skipped.
    pub fn with_params<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = vec![Column::new(CITY_COLUMN, Field::City)];
        columns.extend(METADATA_COLUMNS.iter().map(|(name, field)| Column::new(name, *field)));

        let mut seen: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();

        for param in params {
            let name = param.as_ref();
            if name.trim().is_empty() {
                continue;
            }
            if seen.contains(name) {
                if columns.iter().any(|c| c.name == name && c.field != Field::Param) {
                    warn!(param = %name, "parameter clashes with a fixed column, skipping");
                }
                continue;
            }
            seen.insert(name.to_string());
            columns.push(Column::new(name, Field::Param));
        }

        Self { columns }
    }

    /// `params` when given, else [`DEFAULT_PARAMS`].
    pub fn resolve<S: AsRef<str>>(params: Option<&[S]>) -> Self {
        match params {
            Some(params) => Self::with_params(params),
            None => Self::default(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// The parameter (non-fixed) column names.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter(|c| c.field == Field::Param).map(Column::name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Build the row for one city from its outcome.
    pub fn normalize(&self, city: &str, outcome: &FetchOutcome) -> Row {
        let cells = self
            .columns
            .iter()
            .map(|col| match (col.field, outcome) {
                (Field::City, _) => Cell::Text(Some(city.to_string())),
                (_, FetchOutcome::Success(payload)) => col.extract(payload),
                (_, FetchOutcome::Failure(_)) => col.missing(),
            })
            .collect();

        let failure = match outcome {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure(reason) => Some(reason.clone()),
        };

        Row { cells, failure }
    }
}

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Float(f64),
    Text(Option<String>),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Float(v) => v.is_nan(),
            Cell::Text(v) => v.is_none(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => v.as_deref(),
            Cell::Float(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Float(v) if v.is_nan() => f.write_str("NaN"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(Some(s)) => f.write_str(s),
            Cell::Text(None) => Ok(()),
        }
    }
}

/// One output record, cells in [`ColumnSpec`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
    failure: Option<String>,
}

impl Row {
    pub fn city(&self) -> &str {
        self.cells.first().and_then(Cell::as_str).unwrap_or_default()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Why the lookup failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Rows for a batch of cities, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    spec: ColumnSpec,
    rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(spec: ColumnSpec, rows: Vec<Row>) -> Self {
        Self { spec, rows }
    }

    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    pub fn columns(&self) -> &[Column] {
        self.spec.columns()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.spec.index_of(name).is_some()
    }

    /// Cell at `row` in the column called `column`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.spec.index_of(column)?;
        self.rows.get(row)?.cells.get(idx)
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.spec.index_of(name)?;
        Some(self.rows.iter().map(|r| &r.cells[idx]).collect())
    }

    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_failed()).count()
    }
}

impl fmt::Display for ResultTable {
    /// Plain aligned text; long text cells are shortened.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_WIDTH: usize = 32;

        let shorten = |s: String| -> String {
            if s.chars().count() <= MAX_WIDTH {
                return s;
            }
            let cut = s.char_indices().nth(MAX_WIDTH - 3).map_or(s.len(), |(idx, _)| idx);
            format!("{}...", &s[..cut])
        };

        let header: Vec<String> = self.spec.names().map(str::to_string).collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| shorten(c.to_string())).collect())
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                body.iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for line in std::iter::once(&header).chain(body.iter()) {
            let padded: Vec<String> =
                line.iter().zip(&widths).map(|(s, &w)| format!("{s:<w$}")).collect();
            writeln!(f, "{}", padded.join("  ").trim_end())?;
        }

        Ok(())
    }
}
