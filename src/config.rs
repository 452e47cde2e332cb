use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the chart-feeding aggregates.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "student_preview_limit": 50, "histogram_bins": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Number of student groups in the per-student average preview.
    pub student_preview_limit: usize,
    /// Rows kept in the "subjects by feedback count" table.
    pub top_subject_limit: usize,
    pub histogram_bins: usize,
    /// Maximum number of terms handed to the word cloud.
    pub comment_term_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            student_preview_limit: 20,
            top_subject_limit: 15,
            histogram_bins: 20,
            comment_term_limit: 200,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing analysis config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json_str(&text)
    }
}
