use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use super::error::{DataError, Result};
use super::model::{ColumnDef, ColumnKind, Record, RowSet, Schema, SourceFormat, Value};

// ---------------------------------------------------------------------------
// Dataset specification
// ---------------------------------------------------------------------------

/// The columns a dataset must provide, and how to type them.
///
/// Columns present in the file but not declared here are kept and their
/// kind is inferred from every value in the column.
#[derive(Debug, Clone, Default)]
pub struct DatasetSpec {
    columns: Vec<(String, ColumnKind)>,
}

impl DatasetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: &str, kind: ColumnKind) -> Self {
        self.columns.push((name.to_string(), kind));
        self
    }

    fn declared(&self, name: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, k)| *k)
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a CSV file into a [`RowSet`], validating it against `spec`.
pub fn load(path: &Path, spec: &DatasetSpec) -> Result<RowSet> {
    let bytes = std::fs::read(path).map_err(|e| DataError::load(path, e.to_string()))?;
    let rows = parse_csv(&bytes, path, spec)?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        rows.schema().len(),
        path.display()
    );
    Ok(rows)
}

/// Parse CSV bytes already in memory. `origin` is only used in error messages.
pub fn parse_csv(bytes: &[u8], origin: &Path, spec: &DatasetSpec) -> Result<RowSet> {
    let (bom, body) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, bytes),
    };
    let source_format = sniff_format(body);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body);
    let header = reader
        .headers()
        .map_err(|e| DataError::load(origin, format!("reading header: {e}")))?
        .clone();
    if header.is_empty() {
        return Err(DataError::load(origin, "missing header row"));
    }

    let mut raw_rows: Vec<StringRecord> = Vec::new();
    let mut starts: Vec<usize> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::load(origin, format!("row {row_no}: {e}")))?;
        let start = record
            .position()
            .map(|p| p.byte() as usize)
            .ok_or_else(|| DataError::load(origin, format!("row {row_no}: no source position")))?;
        starts.push(start);
        raw_rows.push(record);
    }
    // Each row runs up to the next row's start; the header up to the first row.
    let header_end = starts.first().copied().unwrap_or(body.len());
    let line_ends: Vec<usize> = starts
        .iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(body.len()))
        .collect();

    for (name, _) in &spec.columns {
        if !header.iter().any(|h| h == name) {
            return Err(DataError::load(origin, format!("missing column `{name}`")));
        }
    }

    let defs: Vec<ColumnDef> = header
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnDef {
            name: name.to_string(),
            kind: spec
                .declared(name)
                .unwrap_or_else(|| infer_kind(raw_rows.iter().map(|r| r.get(i).unwrap_or("")))),
            derived: false,
        })
        .collect();

    let mut records = Vec::with_capacity(raw_rows.len());
    for (row_no, ((raw, start), end)) in raw_rows.into_iter().zip(starts).zip(line_ends).enumerate() {
        let values = defs
            .iter()
            .enumerate()
            .map(|(i, def)| {
                parse_cell(raw.get(i).unwrap_or(""), def.kind).ok_or_else(|| {
                    DataError::load(
                        origin,
                        format!(
                            "row {row_no}: `{}` is not a valid {} for column `{}`",
                            raw.get(i).unwrap_or(""),
                            def.kind,
                            def.name
                        ),
                    )
                })
            })
            .collect::<Result<Vec<Value>>>()?;
        let line = trim_line(body.get(start..end).unwrap_or_default());
        records.push(Record::new(values, raw).with_source_line(line));
    }

    let schema = Schema::new(defs).map_err(|e| DataError::load(origin, e.to_string()))?;
    RowSet::new(
        schema,
        SourceFormat {
            header,
            header_line: Some(trim_line(body.get(..header_end).unwrap_or(body)).to_vec()),
            bom,
            ..source_format
        },
        records,
    )
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Drop the line breaks around one CSV row. A span may start with the tail of
/// the previous terminator or skipped blank lines; a break inside a quoted
/// field is always followed by its closing quote, so it is never trimmed.
fn trim_line(bytes: &[u8]) -> &[u8] {
    let is_break = |b: &u8| *b == b'\n' || *b == b'\r';
    let start = bytes.iter().position(|b| !is_break(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_break(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn sniff_format(bytes: &[u8]) -> SourceFormat {
    let crlf = bytes
        .iter()
        .position(|&b| b == b'\n')
        .is_some_and(|pos| pos > 0 && bytes[pos - 1] == b'\r');
    SourceFormat {
        header: StringRecord::new(),
        header_line: None,
        bom: false,
        crlf,
        trailing_newline: bytes.ends_with(b"\n"),
    }
}

/// Typed value for one cell. `None` means the cell is malformed for a kind
/// that does not tolerate bad input (dates).
fn parse_cell(s: &str, kind: ColumnKind) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return Some(Value::Missing);
    }
    match kind {
        // Unparseable numbers become missing rather than failing the load.
        ColumnKind::Numeric => Some(parse_number(s).map_or(Value::Missing, Value::Number)),
        ColumnKind::Date => parse_date(s).map(Value::Date),
        ColumnKind::Bool => Some(parse_bool(s).map_or(Value::Missing, Value::Bool)),
        ColumnKind::Categorical => Some(Value::Text(s.to_string())),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Accepts plain dates and timestamps; timestamps keep only their date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut numeric = true;
    let mut date = true;
    let mut boolean = true;
    let mut seen = false;
    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        seen = true;
        numeric &= parse_number(cell).is_some();
        date &= parse_date(cell).is_some();
        boolean &= parse_bool(cell).is_some();
        if !(numeric || date || boolean) {
            break;
        }
    }
    match (seen, numeric, date, boolean) {
        (false, ..) => ColumnKind::Categorical,
        (true, true, _, _) => ColumnKind::Numeric,
        (true, _, true, _) => ColumnKind::Date,
        (true, _, _, true) => ColumnKind::Bool,
        _ => ColumnKind::Categorical,
    }
}
