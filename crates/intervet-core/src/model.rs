use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordinal categorical judgment produced by the scoring oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Poor => "Poor",
            Rating::Fair => "Fair",
            Rating::Good => "Good",
            Rating::Excellent => "Excellent",
        }
    }

    /// Tolerant parse: oracle output is free text, so accept any casing
    /// and surrounding whitespace. Unknown words are an error, never a
    /// defaulted rating.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poor" => Ok(Rating::Poor),
            "fair" => Ok(Rating::Fair),
            "good" => Ok(Rating::Good),
            "excellent" => Ok(Rating::Excellent),
            other => anyhow::bail!("unknown rating '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Pass,
    Borderline,
    Fail,
}

impl PassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStatus::Pass => "pass",
            PassStatus::Borderline => "borderline",
            PassStatus::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "pass" => Ok(PassStatus::Pass),
            "borderline" => Ok(PassStatus::Borderline),
            "fail" => Ok(PassStatus::Fail),
            other => anyhow::bail!("unknown pass status '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub candidate_id: String,
    pub application_id: Option<String>,
    pub job_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub interview_id: String,
    pub question_text: String,
    pub expected_answer_format: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub question_id: String,
    pub interview_id: String,
    pub answer_text: String,
    pub answered_at: Option<DateTime<Utc>>,
}

/// One criterion's judgment plus the oracle's rationale for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionJudgment {
    pub rating: Rating,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Per-answer scoring record. Append-only once written: amendments go
/// through delete-and-rescore, never in-place mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub answer_id: String,
    pub interview_id: String,
    pub question_text: String,
    pub answer_text: String,
    pub factual_accuracy: CriterionJudgment,
    pub completeness: CriterionJudgment,
    pub relevance: CriterionJudgment,
    pub coherence: CriterionJudgment,
    pub score: f64,
    pub usage: TokenUsage,
    pub final_evaluation: String,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionAverages {
    pub factual_accuracy: f64,
    pub completeness: f64,
    pub relevance: f64,
    pub coherence: f64,
}

/// Pure aggregation output, before identity and persistence are
/// attached. Same evaluation set in, bit-identical rollup out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRollup {
    pub evaluated_count: u32,
    pub total_questions: u32,
    pub averages: CriterionAverages,
    pub average_score: f64,
    pub pass_status: PassStatus,
    pub knowledge_level: String,
    pub summary_result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResult {
    pub interview_id: String,
    pub candidate_id: String,
    pub application_id: Option<String>,
    pub job_id: Option<String>,
    pub rollup: ResultRollup,
    pub recommendations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stable input for narrative generation. Everything the oracle needs
/// is spelled out here so the recommendation text is reproducible given
/// the same averages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeInput {
    pub evaluated_count: u32,
    pub total_questions: u32,
    pub averages: CriterionAverages,
    pub average_score: f64,
    pub pass_status: PassStatus,
    pub knowledge_level: String,
}

impl NarrativeInput {
    pub fn from_rollup(rollup: &ResultRollup) -> Self {
        Self {
            evaluated_count: rollup.evaluated_count,
            total_questions: rollup.total_questions,
            averages: rollup.averages,
            average_score: rollup.average_score,
            pass_status: rollup.pass_status,
            knowledge_level: rollup.knowledge_level.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub cached: bool,
    #[serde(default)]
    pub usage: TokenUsage,
}

/// JSON contract the oracle must emit for one answer. Field names match
/// the prompt's requested shape, hence the camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerVerdict {
    pub factual_accuracy: String,
    pub factual_accuracy_explanation: String,
    pub completeness: String,
    pub completeness_explanation: String,
    pub relevance: String,
    pub relevance_explanation: String,
    pub coherence: String,
    pub coherence_explanation: String,
    pub score: f64,
    pub final_evaluation: String,
}
