use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::model::RecordCollection;

/// Write `records` as CSV using the dataset's own column names, only for
/// columns the dataset has, in the collection's current order. Absent values
/// become empty cells. Ratings keep their decimal point (`4.0`, not `4`).
pub fn write_csv<W: Write>(records: &RecordCollection, sink: W) -> Result<()> {
    let schema = &records.schema;
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record(schema.headers())
        .context("writing CSV header")?;

    for (row_no, rec) in records.iter().enumerate() {
        let mut row: Vec<String> = Vec::with_capacity(4);
        if schema.has_student_id() {
            row.push(rec.student_id.map(|id| id.to_string()).unwrap_or_default());
        }
        row.push(rec.subject.clone());
        row.push(rec.rating.map(|r| format!("{r:?}")).unwrap_or_default());
        if schema.has_comment() {
            row.push(rec.comment.clone().unwrap_or_default());
        }
        writer
            .write_record(&row)
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }

    writer.flush().context("flushing CSV output")?;
    Ok(())
}

/// Render `records` to an in-memory CSV string, e.g. for a download button.
pub fn to_csv_string(records: &RecordCollection) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

/// Write `records` to a CSV file at `path`.
pub fn export_csv(records: &RecordCollection, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating export file {}", path.display()))?;
    write_csv(records, std::io::BufWriter::new(file))?;
    info!("exported {} records to {}", records.len(), path.display());
    Ok(())
}
