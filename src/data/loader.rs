use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use log::{info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::model::{normalize_column_name, FeedbackRecord, RecordCollection, RecordStore, Schema};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Row accounting for a single load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadReport {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// A freshly loaded dataset.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub store: RecordStore,
    pub report: LoadReport,
}

/// Load a feedback dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one feedback record per line
/// * `.json`    – `[{ "Student_ID": 1, "Subject": "Math", "Rating": 4.5, "Comment": "..." }, ...]`
/// * `.parquet` – flat columns with the same names
///
/// `Subject` and `Rating` are required; `Student_ID` and `Comment` are optional.
/// Rows with an unparseable rating or student id are skipped with a warning.
pub fn load_file(path: &Path) -> Result<Loaded> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening CSV file {}", path.display()))?;
            read_csv(file)?
        }
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(SchemaError::UnsupportedExtension(other.to_string()).into()),
    };

    info!(
        "loaded {} feedback records from {} ({} skipped, student ids: {}, comments: {})",
        loaded.report.rows_loaded,
        path.display(),
        loaded.report.rows_skipped,
        loaded.store.schema().has_student_id(),
        loaded.store.schema().has_comment(),
    );
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// Column layout shared by every format
// ---------------------------------------------------------------------------

/// Positions of the known fields among the source columns.
#[derive(Debug, Clone)]
struct ColumnLayout {
    schema: Schema,
    student_id: Option<usize>,
    subject: usize,
    rating: usize,
    comment: Option<usize>,
}

impl ColumnLayout {
    fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, SchemaError> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| normalize_column_name(h.as_ref()) == wanted)
        };
        let name = |idx: usize| headers[idx].as_ref().to_string();

        let subject = find("subject").ok_or(SchemaError::MissingColumn("Subject"))?;
        let rating = find("rating").ok_or(SchemaError::MissingColumn("Rating"))?;
        let student_id = find("studentid");
        let comment = find("comment");

        Ok(ColumnLayout {
            schema: Schema {
                student_id_column: student_id.map(name),
                subject_column: name(subject),
                rating_column: name(rating),
                comment_column: comment.map(name),
            },
            student_id,
            subject,
            rating,
            comment,
        })
    }
}

/// Accumulates parsed rows, skipping malformed ones.
struct RowSink {
    records: Vec<FeedbackRecord>,
    skipped: usize,
}

impl RowSink {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }

    fn push(&mut self, row_no: usize, row: Result<FeedbackRecord>) {
        match row {
            Ok(rec) => self.records.push(rec),
            Err(err) => {
                warn!("skipping row {row_no}: {err:#}");
                self.skipped += 1;
            }
        }
    }

    fn finish(self, schema: Schema) -> Loaded {
        let report = LoadReport {
            rows_loaded: self.records.len(),
            rows_skipped: self.skipped,
        };
        Loaded {
            store: RecordStore::new(RecordCollection::new(schema, self.records)),
            report,
        }
    }
}

fn parse_rating(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let value: f64 = s
        .parse()
        .with_context(|| format!("rating '{s}' is not a number"))?;
    finite_rating(Some(value))
}

fn finite_rating(rating: Option<f64>) -> Result<Option<f64>> {
    match rating {
        Some(r) if !r.is_finite() => bail!("rating {r} is not finite"),
        other => Ok(other),
    }
}

/// Integer ids, also accepting integral floats (`"12.0"`) as written by
/// tools that promote id columns containing blanks to floating point.
fn parse_student_id(s: &str) -> Result<Option<i64>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(id) = s.parse::<i64>() {
        return Ok(Some(id));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(Some(f as i64)),
        _ => bail!("student id '{s}' is not an integer"),
    }
}

fn required_subject(s: Option<&str>) -> Result<String> {
    match s.map(str::trim) {
        Some(subject) if !subject.is_empty() => Ok(subject.to_string()),
        _ => bail!("subject is empty"),
    }
}

fn optional_text(s: Option<&str>) -> Option<String> {
    s.filter(|c| !c.is_empty()).map(str::to_string)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read delimited text with a header row. Columns other than the four known
/// fields are ignored. Rows may be shorter than the header; missing trailing
/// cells read as empty.
pub fn read_csv<R: Read>(source: R) -> Result<Loaded> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let layout = ColumnLayout::resolve(&headers)?;

    let mut sink = RowSink::new();
    for (row_no, result) in reader.records().enumerate() {
        let parsed = match result {
            Ok(record) => csv_row(&layout, &record),
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("reading CSV row {row_no}"));
            }
            Err(err) => Err(err.into()),
        };
        sink.push(row_no, parsed);
    }
    Ok(sink.finish(layout.schema))
}

fn csv_row(layout: &ColumnLayout, record: &csv::StringRecord) -> Result<FeedbackRecord> {
    let student_id = match layout.student_id {
        Some(idx) => parse_student_id(record.get(idx).unwrap_or(""))?,
        None => None,
    };
    Ok(FeedbackRecord {
        student_id,
        subject: required_subject(record.get(layout.subject))?,
        rating: parse_rating(record.get(layout.rating).unwrap_or(""))?,
        comment: layout.comment.and_then(|idx| optional_text(record.get(idx))),
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Student_ID": 1, "Subject": "Math", "Rating": 4.5, "Comment": "clear" },
///   { "Student_ID": 2, "Subject": "Art",  "Rating": 3.0, "Comment": null },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Loaded> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text)
}

/// Parse records-oriented JSON text. The set of columns is the union of keys
/// across all objects, in first-seen order.
pub fn read_json(text: &str) -> Result<Loaded> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut objects: Vec<&Map<String, JsonValue>> = Vec::with_capacity(rows.len());
    let mut keys: Vec<String> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        objects.push(obj);
    }
    let layout = ColumnLayout::resolve(&keys)?;

    let mut sink = RowSink::new();
    for (row_no, obj) in objects.into_iter().enumerate() {
        sink.push(row_no, json_row(&layout, &keys, obj));
    }
    Ok(sink.finish(layout.schema))
}

fn json_row(
    layout: &ColumnLayout,
    keys: &[String],
    obj: &Map<String, JsonValue>,
) -> Result<FeedbackRecord> {
    static NULL: JsonValue = JsonValue::Null;
    let cell = |idx: usize| obj.get(&keys[idx]).unwrap_or(&NULL);

    let student_id = match layout.student_id.map(cell) {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(id), _) => Some(id),
            (None, Some(f)) if f.fract() == 0.0 => Some(f as i64),
            _ => bail!("student id {n} is not an integer"),
        },
        Some(JsonValue::String(s)) => parse_student_id(s)?,
        Some(other) => bail!("student id {other} is not an integer"),
    };
    let subject = match cell(layout.subject) {
        JsonValue::String(s) => required_subject(Some(s.as_str()))?,
        JsonValue::Null => bail!("subject is empty"),
        other => other.to_string(),
    };
    let rating = match cell(layout.rating) {
        JsonValue::Null => None,
        JsonValue::Number(n) => finite_rating(n.as_f64())?,
        JsonValue::String(s) => parse_rating(s)?,
        other => bail!("rating {other} is not a number"),
    };
    let comment = match layout.comment.map(cell) {
        Some(JsonValue::String(s)) => optional_text(Some(s.as_str())),
        Some(JsonValue::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    Ok(FeedbackRecord {
        student_id,
        subject,
        rating,
        comment,
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of feedback records.
///
/// Numeric columns may be any integer or float width; they are cast to
/// `Int64` / `Float64` before reading. Text columns may be `Utf8` or `LargeUtf8`.
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Loaded> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let field_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let layout = ColumnLayout::resolve(&field_names)?;
    let reader = builder.build().context("building parquet reader")?;

    let mut sink = RowSink::new();
    let mut row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let student_ids = layout
            .student_id
            .map(|idx| cast_column(batch.column(idx), &DataType::Int64))
            .transpose()?;
        let subjects = cast_column(batch.column(layout.subject), &DataType::Utf8)?;
        let ratings = cast_column(batch.column(layout.rating), &DataType::Float64)?;
        let comments = layout
            .comment
            .map(|idx| cast_column(batch.column(idx), &DataType::Utf8))
            .transpose()?;

        let subjects = subjects.as_string_opt::<i32>().context("subject column")?;
        let ratings = ratings
            .as_primitive_opt::<Float64Type>()
            .context("rating column")?;
        let student_ids = student_ids
            .as_ref()
            .map(|col| col.as_primitive_opt::<Int64Type>().context("student id column"))
            .transpose()?;
        let comments = comments
            .as_ref()
            .map(|col| col.as_string_opt::<i32>().context("comment column"))
            .transpose()?;

        for row in 0..batch.num_rows() {
            let subject = (!subjects.is_null(row)).then(|| subjects.value(row));
            let rating = (!ratings.is_null(row)).then(|| ratings.value(row));
            let parsed = required_subject(subject).and_then(|subject| {
                Ok(FeedbackRecord {
                    student_id: student_ids
                        .filter(|col| !col.is_null(row))
                        .map(|col| col.value(row)),
                    subject,
                    rating: finite_rating(rating)?,
                    comment: comments
                        .filter(|col| !col.is_null(row))
                        .and_then(|col| optional_text(Some(col.value(row)))),
                })
            });
            sink.push(row_offset + row, parsed);
        }
        row_offset += batch.num_rows();
    }

    Ok(sink.finish(layout.schema))
}

fn cast_column(col: &ArrayRef, to: &DataType) -> Result<ArrayRef> {
    if col.data_type() == to {
        return Ok(col.clone());
    }
    cast(col, to).with_context(|| format!("casting {:?} column to {to:?}", col.data_type()))
}
