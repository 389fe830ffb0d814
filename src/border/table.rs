//! Tabular I/O for located records
//!
//! Columns are matched by position; header names on input are not checked.
//! Output headers are fixed and consumed by downstream tooling.

use super::types::{BorderError, GroupLabel, LocatedRecord, Result};
use crate::geo::MAX_LATITUDE;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Headers of the raw located-cluster table
pub const LOCATED_HEADERS: [&str; 5] = ["LATNUM", "LONGNUM", "afterCovidStarted", "v001", "v024"];

/// Headers written by the unrestricted pass
pub const EDGE_HEADERS: [&str; 6] = [
    "LATNUM",
    "LONGNUM",
    "afterCovidStarted",
    "v001",
    "v024",
    "distanceToBorders",
];

/// Headers written by the within-region pass
pub const EDGE_IN_REGION_HEADERS: [&str; 7] = [
    "LATNUM",
    "LONGNUM",
    "afterCovidStarted",
    "v001",
    "v024",
    "distanceToBorders",
    "distanceToBordersInsideState",
];

/// Column layout of a record table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Coordinates, group, cluster id, region
    Located,
    /// `Located` plus the unrestricted distance
    Edge,
    /// `Edge` plus the within-region distance
    EdgeInRegion,
}

impl TableLayout {
    /// Column names in order
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            TableLayout::Located => &LOCATED_HEADERS,
            TableLayout::Edge => &EDGE_HEADERS,
            TableLayout::EdgeInRegion => &EDGE_IN_REGION_HEADERS,
        }
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.headers().len()
    }
}

/// Format a float the way the downstream tables expect
///
/// Shortest round-trip digits. Integral values keep a trailing `.0`, and
/// decimal exponents below -4 or from 16 up switch to `1e-05` / `1e+20`
/// notation.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

// ============================================================
// Reading
// ============================================================

/// Read all records from `path`, requiring exactly the columns of `layout`
pub fn read_records(path: &Path, layout: TableLayout) -> Result<Vec<LocatedRecord>> {
    if !path.exists() {
        return Err(BorderError::InputNotFound(path.to_path_buf()));
    }

    let csv_err = |source: csv::Error| BorderError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let expected = layout.column_count();
    let found = reader.headers().map_err(csv_err)?.len();
    if found != expected {
        return Err(BorderError::ColumnCount {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(csv_err)?;
        let record = parse_row(&row, layout).map_err(|reason| {
            BorderError::MalformedRow {
                path: path.to_path_buf(),
                row: index + 1,
                reason,
            }
        })?;
        records.push(record);
    }

    tracing::debug!(path = %path.display(), rows = records.len(), "read records");
    Ok(records)
}

fn parse_row(row: &StringRecord, layout: TableLayout) -> std::result::Result<LocatedRecord, String> {
    let expected = layout.column_count();
    if row.len() != expected {
        return Err(format!("expected {} fields, found {}", expected, row.len()));
    }

    let headers = layout.headers();
    let number = |i: usize| -> std::result::Result<f64, String> {
        let field = &row[i];
        field
            .parse::<f64>()
            .map_err(|_| format!("{} value '{}' is not numeric", headers[i], field))
    };

    let coordinate = |i: usize, limit: Option<f64>| -> std::result::Result<f64, String> {
        let value = number(i)?;
        if !value.is_finite() {
            return Err(format!("{} value '{}' is not finite", headers[i], &row[i]));
        }
        if let Some(limit) = limit {
            if value.abs() > limit {
                return Err(format!(
                    "{} value '{}' is outside [-{limit}, {limit}]",
                    headers[i], &row[i]
                ));
            }
        }
        Ok(value)
    };
    // +inf is a valid sentinel written by an earlier pass
    let distance = |i: usize| -> std::result::Result<f64, String> {
        let value = number(i)?;
        if value.is_nan() || value < 0.0 {
            return Err(format!("{} value '{}' is not a distance", headers[i], &row[i]));
        }
        Ok(value)
    };

    let group: GroupLabel = row[2].parse()?;
    let latitude = coordinate(0, Some(MAX_LATITUDE))?;
    let longitude = coordinate(1, None)?;
    let mut record = LocatedRecord::new(latitude, longitude, group, &row[3], &row[4]);

    if matches!(layout, TableLayout::Edge | TableLayout::EdgeInRegion) {
        record.distance_to_opposite_group = Some(distance(5)?);
    }
    if layout == TableLayout::EdgeInRegion {
        record.distance_to_opposite_group_within_region = Some(distance(6)?);
    }

    Ok(record)
}

// ============================================================
// Writing
// ============================================================

/// Write records in `layout` to any writer
pub fn write_records_to<W: Write>(
    writer: W,
    layout: TableLayout,
    records: &[LocatedRecord],
) -> std::result::Result<(), TableWriteError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(layout.headers())?;

    for (index, record) in records.iter().enumerate() {
        let mut fields = vec![
            format_float(record.latitude),
            format_float(record.longitude),
            record.group.as_str().to_string(),
            record.cluster_id.clone(),
            record.region.clone(),
        ];
        if matches!(layout, TableLayout::Edge | TableLayout::EdgeInRegion) {
            let km = record
                .distance_to_opposite_group
                .ok_or(TableWriteError::Missing {
                    row: index + 1,
                    column: EDGE_HEADERS[5],
                })?;
            fields.push(format_float(km));
        }
        if layout == TableLayout::EdgeInRegion {
            let km = record
                .distance_to_opposite_group_within_region
                .ok_or(TableWriteError::Missing {
                    row: index + 1,
                    column: EDGE_IN_REGION_HEADERS[6],
                })?;
            fields.push(format_float(km));
        }
        wtr.write_record(&fields)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write records to `path`
///
/// Output goes to a temporary file next to `path` that is renamed into
/// place only after every row is written.
pub fn write_records(path: &Path, layout: TableLayout, records: &[LocatedRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let tmp = NamedTempFile::new_in(&dir)?;
    write_records_to(tmp.as_file(), layout, records).map_err(|e| e.into_border_error(path))?;
    tmp.persist(path).map_err(|e| BorderError::IoError(e.error))?;

    tracing::debug!(path = %path.display(), rows = records.len(), "wrote records");
    Ok(())
}

/// Failure while serializing records
#[derive(Debug, thiserror::Error)]
pub enum TableWriteError {
    #[error("record {row} has no value for column {column}")]
    Missing { row: usize, column: &'static str },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TableWriteError {
    fn into_border_error(self, path: &Path) -> BorderError {
        match self {
            TableWriteError::Missing { row, column } => BorderError::MissingField { row, column },
            TableWriteError::Csv(source) => BorderError::Csv {
                path: path.to_path_buf(),
                source,
            },
            TableWriteError::Io(e) => BorderError::IoError(e),
        }
    }
}
