use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, StringRecord, Terminator, WriterBuilder};

use super::error::{DataError, Result};
use super::model::RowSet;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `rows` as CSV with the source file's header, column order and line
/// terminator. Derived columns are not written.
///
/// Rows and the header are copied byte for byte from the source, so quoting
/// and a leading BOM survive; only rows without a source span are encoded.
pub fn write_csv<W: Write>(rows: &RowSet, mut out: W) -> Result<()> {
    let source = rows.source();
    let terminator: &[u8] = if source.crlf { b"\r\n" } else { b"\n" };

    if source.bom {
        out.write_all(UTF8_BOM)?;
    }
    match &source.header_line {
        Some(line) => out.write_all(line)?,
        None => encode(&source.header, &mut out)?,
    }
    out.write_all(terminator)?;

    for rec in rows.rows() {
        match rec.source_line() {
            Some(line) => out.write_all(line)?,
            None => encode(rec.raw(), &mut out)?,
        }
        out.write_all(terminator)?;
    }
    out.flush()?;
    Ok(())
}

/// One record, quoted only where needed, without a terminator.
fn encode(record: &StringRecord, out: &mut impl Write) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(record)?;
    let mut bytes = writer
        .into_inner()
        .map_err(|e| DataError::Export(e.to_string()))?;
    bytes.pop();
    out.write_all(&bytes)?;
    Ok(())
}

/// Serialize `rows` to CSV bytes, e.g. for a download button.
pub fn to_csv_bytes(rows: &RowSet) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    if !rows.source().trailing_newline {
        let cut = if rows.source().crlf { 2 } else { 1 };
        buf.truncate(buf.len().saturating_sub(cut));
    }
    Ok(buf)
}

pub fn export_to_path(rows: &RowSet, path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(rows)?;
    std::fs::write(path, bytes)
        .map_err(|e| DataError::Export(format!("{}: {e}", path.display())))?;
    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}
