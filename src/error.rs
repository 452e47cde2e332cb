use thiserror::Error;

/// Rejection of a [`FilterCriteria`](crate::data::filter::FilterCriteria) at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("{field} range is inverted: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: String,
        max: String,
    },

    #[error("{field} range bound is not a finite number")]
    NonFiniteBound { field: &'static str },
}

/// Problems with the shape of a source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("dataset is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}
