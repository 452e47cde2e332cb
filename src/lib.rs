//! Filtering and aggregation pipeline for course feedback datasets.
//!
//! A dataset is loaded once into an immutable [`RecordStore`]. A
//! [`SessionContext`] holds the user's [`FilterCriteria`] and the filtered
//! view they produce; metrics and chart tables are pure functions over that
//! view.
//!
//! ```no_run
//! use std::sync::Arc;
//! use course_feedback::{load_file, AnalysisConfig, SessionContext};
//!
//! let loaded = load_file("course_feedback.csv".as_ref())?;
//! let session = SessionContext::new(Arc::new(loaded.store));
//! session.set_subjects(["Math", "Physics"]);
//! session.set_rating_range(3.0, 5.0)?;
//! let report = session.report(&AnalysisConfig::default());
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use analysis::aggregate::{AggregateTable, SortDirection, SortSpec};
pub use analysis::metrics::{summarize, MetricsSummary, ViewCoverage};
pub use analysis::report::AnalysisReport;
pub use config::AnalysisConfig;
pub use data::filter::{apply, filtered_indices, FilterCriteria, RangeFilter};
pub use data::loader::{load_file, LoadReport, Loaded};
pub use data::model::{FeedbackRecord, RatingKey, RecordCollection, RecordStore, Schema};
pub use error::{CriteriaError, SchemaError};
pub use state::SessionContext;
