use std::collections::HashSet;

use serde::Serialize;

use crate::data::model::RecordCollection;

/// Scalar figures for the headline metric widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_records: usize,
    /// Mean of the ratings that are present. `None` means "no rated records",
    /// which callers must show differently from an average of zero.
    pub average_rating: Option<f64>,
    pub distinct_subjects: usize,
    /// `None` when the dataset has no student id column.
    pub distinct_students: Option<usize>,
    /// Records whose comment is non-blank after trimming.
    pub comment_count: usize,
}

/// Summarise any collection, raw or filtered.
pub fn summarize(records: &RecordCollection) -> MetricsSummary {
    let mut subjects = HashSet::new();
    let mut students = HashSet::new();
    let mut rating_sum = 0.0;
    let mut rated = 0usize;
    let mut comment_count = 0usize;

    for rec in records {
        subjects.insert(rec.subject.as_str());
        if let Some(id) = rec.student_id {
            students.insert(id);
        }
        if let Some(r) = rec.rating {
            rating_sum += r;
            rated += 1;
        }
        if rec.non_blank_comment().is_some() {
            comment_count += 1;
        }
    }

    MetricsSummary {
        total_records: records.len(),
        average_rating: (rated > 0).then(|| rating_sum / rated as f64),
        distinct_subjects: subjects.len(),
        distinct_students: records.schema.has_student_id().then_some(students.len()),
        comment_count,
    }
}

/// How much of the full dataset the current view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewCoverage {
    pub shown: usize,
    pub total: usize,
    pub filtered_out: usize,
}

impl ViewCoverage {
    pub fn new(shown: usize, total: usize) -> Self {
        Self {
            shown,
            total,
            filtered_out: total.saturating_sub(shown),
        }
    }
}
