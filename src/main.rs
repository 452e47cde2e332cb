use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use course_feedback::data::export::export_csv;
use course_feedback::{load_file, AnalysisConfig, AnalysisReport, FilterCriteria, RecordStore, SessionContext};

#[derive(Parser)]
#[command(name = "course-feedback")]
#[command(about = "Filter and summarise a course feedback dataset", long_about = None)]
struct Cli {
    /// Dataset to load (.csv, .json or .parquet)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Keep only this subject; repeat for several. Omit to keep every subject
    #[arg(short, long = "subject", value_name = "SUBJECT")]
    subjects: Vec<String>,

    /// Lowest rating to keep (inclusive)
    #[arg(long)]
    min_rating: Option<f64>,

    /// Highest rating to keep (inclusive)
    #[arg(long)]
    max_rating: Option<f64>,

    /// Lowest student id to keep (inclusive)
    #[arg(long)]
    min_student: Option<i64>,

    /// Highest student id to keep (inclusive)
    #[arg(long)]
    max_student: Option<i64>,

    /// JSON file overriding the analysis defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the filtered records to this CSV file
    #[arg(short, long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Print the full report as JSON instead of a text summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Cli {
    /// Build criteria from the flags. A range given on one side only is
    /// completed from the dataset's extent.
    fn criteria(&self, store: &RecordStore) -> Result<FilterCriteria> {
        let mut criteria = FilterCriteria::unconstrained().with_subjects(self.subjects.clone());

        if self.min_rating.is_some() || self.max_rating.is_some() {
            let (lo, hi) = store.rating_extent.unwrap_or((f64::MIN, f64::MAX));
            criteria = criteria
                .with_rating_range(self.min_rating.unwrap_or(lo), self.max_rating.unwrap_or(hi))?;
        }

        if self.min_student.is_some() || self.max_student.is_some() {
            if store.schema().has_student_id() {
                let (lo, hi) = store.student_id_extent.unwrap_or((i64::MIN, i64::MAX));
                criteria = criteria.with_student_id_range(
                    self.min_student.unwrap_or(lo),
                    self.max_student.unwrap_or(hi),
                )?;
            } else {
                warn!("dataset has no student id column; ignoring student id range");
            }
        }

        Ok(criteria)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let loaded = load_file(&cli.input)?;
    let criteria = cli.criteria(&loaded.store)?;
    let session = SessionContext::new(Arc::new(loaded.store));
    session.apply_criteria(criteria);

    if let Some(path) = &cli.export {
        export_csv(&session.current_view(), path)?;
    }

    let report = session.report(&config);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    info!("done");
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let m = &report.metrics;
    println!(
        "Showing {} records (out of {} total, {} filtered out)",
        report.coverage.shown, report.coverage.total, report.coverage.filtered_out
    );
    match m.average_rating {
        Some(avg) => println!("Average rating:   {avg:.2}/5"),
        None => println!("Average rating:   n/a (no rated records)"),
    }
    println!("Unique subjects:  {}", m.distinct_subjects);
    match m.distinct_students {
        Some(n) => println!("Unique students:  {n}"),
        None => println!("Unique students:  n/a (no student id column)"),
    }
    println!("Comments:         {}", m.comment_count);

    if !report.subject_average_ratings.is_empty() {
        println!("\nAverage rating by subject:");
        for row in &report.subject_average_ratings.rows {
            println!("  {:<24} {:>5.2}  (n={})", row.subject, row.mean, row.count);
        }
    }

    if !report.top_subjects.is_empty() {
        println!("\nSubjects by feedback count:");
        for row in &report.top_subjects.rows {
            println!("  {:<24} {:>5}", row.subject, row.count);
        }
    }

    if !report.comment_terms.is_empty() {
        let terms: Vec<&str> = report
            .comment_terms
            .rows
            .iter()
            .take(10)
            .map(|t| t.term.as_str())
            .collect();
        println!("\nFrequent comment terms: {}", terms.join(", "));
    }
}
