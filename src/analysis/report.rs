use serde::Serialize;

use super::aggregate::{
    rating_histogram, student_average_ratings, subject_average_ratings, subject_counts,
    subject_rating_counts, subject_rating_distribution, subject_rating_spread, top_subjects,
    AggregateTable, RatingBin, StudentRating, SubjectCount, SubjectRating, SubjectRatingCount,
    SubjectRatingShare, SubjectSpread,
};
use super::metrics::{summarize, MetricsSummary, ViewCoverage};
use super::text::{comment_corpus, comment_terms, TermCount};
use crate::config::AnalysisConfig;
use crate::data::model::RecordCollection;

/// Everything the rendering layer needs for one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub coverage: ViewCoverage,
    pub metrics: MetricsSummary,
    pub subject_counts: AggregateTable<SubjectCount>,
    pub top_subjects: AggregateTable<SubjectCount>,
    pub subject_average_ratings: AggregateTable<SubjectRating>,
    pub student_average_ratings: AggregateTable<StudentRating>,
    pub subject_rating_counts: AggregateTable<SubjectRatingCount>,
    pub subject_rating_distribution: AggregateTable<SubjectRatingShare>,
    pub rating_histogram: AggregateTable<RatingBin>,
    pub subject_rating_spread: AggregateTable<SubjectSpread>,
    pub comment_terms: AggregateTable<TermCount>,
    pub comment_corpus: String,
}

impl AnalysisReport {
    /// Run every metric and aggregate over `view`. `total` is the size of the
    /// unfiltered dataset the view was taken from.
    pub fn build(view: &RecordCollection, total: usize, config: &AnalysisConfig) -> Self {
        AnalysisReport {
            coverage: ViewCoverage::new(view.len(), total),
            metrics: summarize(view),
            subject_counts: subject_counts(view),
            top_subjects: top_subjects(view, config.top_subject_limit),
            subject_average_ratings: subject_average_ratings(view),
            student_average_ratings: student_average_ratings(view, config.student_preview_limit),
            subject_rating_counts: subject_rating_counts(view),
            subject_rating_distribution: subject_rating_distribution(view),
            rating_histogram: rating_histogram(view, config.histogram_bins),
            subject_rating_spread: subject_rating_spread(view),
            comment_terms: comment_terms(view, config.comment_term_limit),
            comment_corpus: comment_corpus(view),
        }
    }
}
