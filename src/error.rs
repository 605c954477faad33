use thiserror::Error;

/// Failures an analysis can hit before producing a full report. These never
/// cross the analysis boundary as `Err`; each analysis folds them into the
/// `error` field of its report so callers always get a structured result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no data available for this country")]
    NoData,
    #[error("insufficient data: need at least {needed} points, have {have}")]
    InsufficientData { needed: usize, have: usize },
    #[error("unknown metric: {0}")]
    InvalidMetric(String),
}
