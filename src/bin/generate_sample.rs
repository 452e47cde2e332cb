use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use course_feedback::data::export::export_csv;
use course_feedback::{FeedbackRecord, RecordCollection};

/// SplitMix64 stream; reproducible across runs for a fixed seed.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Approximately normal: twelve uniforms summed (Irwin-Hall), recentred.
    fn rating_noise(&mut self, mean: f64, spread: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.unit()).sum();
        mean + spread * (sum - 6.0)
    }
}

/// Subject name and the mean rating its feedback clusters around.
const SUBJECTS: &[(&str, f64)] = &[
    ("Mathematics", 3.4),
    ("Physics", 3.1),
    ("Chemistry", 3.3),
    ("Biology", 3.8),
    ("History", 3.6),
    ("Literature", 4.0),
    ("Computer Science", 4.2),
    ("Art", 3.9),
];

const POSITIVE: &[&str] = &[
    "Great explanations and clear examples",
    "Engaging lectures, learned a lot",
    "Helpful instructor and well organised material",
    "Assignments were challenging but fair",
];

const NEGATIVE: &[&str] = &[
    "Pace was too fast",
    "Lectures felt disorganised",
    "Needs more practical examples",
    "Grading criteria were unclear",
];

const ROWS: usize = 1000;
const STUDENTS: usize = 200;

fn generate(rng: &mut SampleRng) -> Vec<FeedbackRecord> {
    (0..ROWS)
        .map(|_| {
            let (subject, mean) = SUBJECTS[rng.below(SUBJECTS.len())];
            let student_id = 1000 + rng.below(STUDENTS) as i64;
            // 0.5 steps clamped to the 0–5 scale
            let rating = ((rng.rating_noise(mean, 0.9) * 2.0).round() / 2.0).clamp(0.0, 5.0);

            let comment = match rng.below(10) {
                0..=1 => None,
                2 => Some("   "),
                _ if rating >= 3.5 => Some(POSITIVE[rng.below(POSITIVE.len())]),
                _ => Some(NEGATIVE[rng.below(NEGATIVE.len())]),
            };
            FeedbackRecord::new(Some(student_id), subject, Some(rating), comment)
        })
        .collect()
}

fn write_parquet(records: &RecordCollection, path: &Path) -> Result<()> {
    let student_ids = Int64Array::from(
        records.iter().map(|r| r.student_id).collect::<Vec<_>>(),
    );
    let subjects = StringArray::from(
        records.iter().map(|r| r.subject.as_str()).collect::<Vec<_>>(),
    );
    let ratings = Float64Array::from(records.iter().map(|r| r.rating).collect::<Vec<_>>());
    let comments = StringArray::from(
        records.iter().map(|r| r.comment.as_deref()).collect::<Vec<_>>(),
    );

    let schema = Arc::new(Schema::new(vec![
        Field::new("Student_ID", DataType::Int64, true),
        Field::new("Subject", DataType::Utf8, false),
        Field::new("Rating", DataType::Float64, true),
        Field::new("Comment", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(student_ids),
            Arc::new(subjects),
            Arc::new(ratings),
            Arc::new(comments),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SampleRng(42);
    let records = RecordCollection::from_records(generate(&mut rng));

    export_csv(&records, Path::new("sample_feedback.csv"))?;
    write_parquet(&records, Path::new("sample_feedback.parquet"))?;

    println!(
        "Wrote {} feedback records ({} subjects, {} students) to sample_feedback.csv and sample_feedback.parquet",
        records.len(),
        SUBJECTS.len(),
        STUDENTS
    );
    Ok(())
}
