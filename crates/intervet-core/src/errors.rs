use std::fmt;

#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Aggregation failure taxonomy. These are contract errors, not
/// transport errors: the caller decides whether to retry after more
/// evaluations arrive.
#[derive(Debug, PartialEq, Eq)]
pub enum AggregateError {
    /// No evaluations available. Averaging over zero answers is a
    /// reportable error, never a defaulted zero score.
    InsufficientData { interview_id: String },
    /// More evaluations than questions; the 1:1 answer/evaluation
    /// invariant was violated upstream.
    CountMismatch {
        interview_id: String,
        evaluated: u32,
        total_questions: u32,
    },
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::InsufficientData { interview_id } => {
                write!(f, "no evaluations to aggregate for interview {}", interview_id)
            }
            AggregateError::CountMismatch {
                interview_id,
                evaluated,
                total_questions,
            } => write!(
                f,
                "interview {} has {} evaluations but only {} questions",
                interview_id, evaluated, total_questions
            ),
        }
    }
}

impl std::error::Error for AggregateError {}
