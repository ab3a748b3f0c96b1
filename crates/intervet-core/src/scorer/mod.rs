use crate::config::{ScoreRange, ScorerSettings};
use crate::model::{
    Answer, CriterionJudgment, Evaluation, NarrativeInput, Question, Rating, ScorerVerdict,
    TokenUsage,
};
use crate::providers::llm::LlmClient;
use crate::storage::scorer_cache::ScorerCache;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const SYSTEM_PROMPT: &str =
    "You are an expert interviewer and evaluator. Provide detailed, constructive feedback.";

#[derive(Clone)]
pub struct ScorerService {
    settings: ScorerSettings,
    score_range: ScoreRange,
    cache: ScorerCache,
    client: Arc<dyn LlmClient>,
    refresh: bool,
}

impl ScorerService {
    pub fn new(
        settings: ScorerSettings,
        score_range: ScoreRange,
        cache: ScorerCache,
        client: Arc<dyn LlmClient>,
        refresh: bool,
    ) -> Self {
        Self {
            settings,
            score_range,
            cache,
            client,
            refresh,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    /// Score one answer against its question. A malformed oracle reply
    /// is an error; no zero-score placeholder evaluation is produced.
    pub async fn score_answer(
        &self,
        question: &Question,
        answer: &Answer,
    ) -> anyhow::Result<Evaluation> {
        let prompt = build_prompt(question, answer, &self.score_range);
        let key = self.cache_key(&prompt);

        if self.settings.cache && !self.refresh {
            if let Some(cached) = self.cache.get(&key)? {
                tracing::debug!(answer_id = %answer.id, "scorer cache hit");
                let verdict: ScorerVerdict = serde_json::from_value(cached["verdict"].clone())?;
                let usage: TokenUsage =
                    serde_json::from_value(cached["usage"].clone()).unwrap_or_default();
                return self.verdict_to_evaluation(question, answer, verdict, usage);
            }
        }

        let resp = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        let verdict: ScorerVerdict = serde_json::from_str(extract_json(&resp.text)?)
            .map_err(|e| anyhow::anyhow!("oracle reply is not a valid verdict: {}", e))?;
        let evaluation = self.verdict_to_evaluation(question, answer, verdict.clone(), resp.usage)?;

        if self.settings.cache {
            self.cache.put(
                &key,
                self.client.provider_name(),
                &self.settings.model,
                &json!({ "verdict": verdict, "usage": resp.usage }),
            )?;
        }
        Ok(evaluation)
    }

    /// Narrative recommendations from the aggregate numbers. The input
    /// carries every figure the oracle needs, so the generation is
    /// reproducible given the same averages.
    pub async fn recommend(&self, input: &NarrativeInput) -> anyhow::Result<String> {
        let prompt = format!(
            "An interview was evaluated with the following aggregate outcome:\n{}\n\n\
             Write a short recommendations paragraph for the recruiter: what the candidate \
             should improve and whether to proceed. Plain text, no preamble.",
            serde_json::to_string_pretty(input)?
        );
        let resp = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(resp.text.trim().to_string())
    }

    fn cache_key(&self, prompt: &str) -> String {
        let raw = format!(
            "{}:{}:{}:{}",
            self.client.provider_name(),
            self.settings.model,
            self.settings.temperature,
            prompt
        );
        format!("{:x}", md5::compute(raw))
    }

    fn verdict_to_evaluation(
        &self,
        question: &Question,
        answer: &Answer,
        verdict: ScorerVerdict,
        usage: TokenUsage,
    ) -> anyhow::Result<Evaluation> {
        if verdict.score < self.score_range.min || verdict.score > self.score_range.max {
            anyhow::bail!(
                "oracle score {} outside configured range {}..{}",
                verdict.score,
                self.score_range.min,
                self.score_range.max
            );
        }
        let judgment = |rating: &str, explanation: &str| -> anyhow::Result<CriterionJudgment> {
            Ok(CriterionJudgment {
                rating: Rating::parse(rating)?,
                explanation: explanation.to_string(),
            })
        };
        Ok(Evaluation {
            answer_id: answer.id.clone(),
            interview_id: answer.interview_id.clone(),
            question_text: question.question_text.clone(),
            answer_text: answer.answer_text.clone(),
            factual_accuracy: judgment(
                &verdict.factual_accuracy,
                &verdict.factual_accuracy_explanation,
            )?,
            completeness: judgment(&verdict.completeness, &verdict.completeness_explanation)?,
            relevance: judgment(&verdict.relevance, &verdict.relevance_explanation)?,
            coherence: judgment(&verdict.coherence, &verdict.coherence_explanation)?,
            score: verdict.score,
            usage,
            final_evaluation: verdict.final_evaluation,
            evaluated_at: Utc::now(),
        })
    }
}

fn build_prompt(question: &Question, answer: &Answer, range: &ScoreRange) -> String {
    let format_hint = question
        .expected_answer_format
        .as_deref()
        .map(|f| format!("Expected answer format: {}\n", f))
        .unwrap_or_default();
    format!(
        "Evaluate the following candidate answer.\n\n\
         Question: {}\n{}Answer: {}\n\n\
         Rate each of the criteria as \"Poor\", \"Fair\", \"Good\", or \"Excellent\":\n\
         1. Factual Accuracy\n2. Completeness\n3. Relevance\n4. Coherence\n\
         Also provide an overall numerical score between {} and {} and a final summary.\n\n\
         Respond in exactly this JSON format:\n\
         {{\n\
           \"factualAccuracy\": \"rating\",\n\
           \"factualAccuracyExplanation\": \"detailed explanation\",\n\
           \"completeness\": \"rating\",\n\
           \"completenessExplanation\": \"detailed explanation\",\n\
           \"relevance\": \"rating\",\n\
           \"relevanceExplanation\": \"detailed explanation\",\n\
           \"coherence\": \"rating\",\n\
           \"coherenceExplanation\": \"detailed explanation\",\n\
           \"score\": numerical_score,\n\
           \"finalEvaluation\": \"overall summary\"\n\
         }}",
        question.question_text, format_hint, answer.answer_text, range.min, range.max
    )
}

/// Oracles wrap JSON in prose more often than not. Take the outermost
/// object and let serde decide whether it is a verdict.
fn extract_json(text: &str) -> anyhow::Result<&str> {
    let start = text
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("no JSON object in oracle reply"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| anyhow::anyhow!("unterminated JSON object in oracle reply"))?;
    if end < start {
        anyhow::bail!("malformed JSON object in oracle reply");
    }
    Ok(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_prose() {
        let text = "Sure! Here is the evaluation:\n{\"score\": 3.0}\nHope that helps.";
        assert_eq!(extract_json(text).unwrap(), "{\"score\": 3.0}");
    }

    #[test]
    fn extract_json_rejects_plain_text() {
        assert!(extract_json("no json here").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn prompt_carries_format_hint() {
        let q = Question {
            id: "q1".into(),
            interview_id: "int-1".into(),
            question_text: "What is ownership?".into(),
            expected_answer_format: Some("short paragraph".into()),
            created_at: Utc::now(),
        };
        let a = Answer {
            id: "a1".into(),
            question_id: "q1".into(),
            interview_id: "int-1".into(),
            answer_text: "Each value has one owner.".into(),
            answered_at: None,
        };
        let p = build_prompt(&q, &a, &ScoreRange::default());
        assert!(p.contains("What is ownership?"));
        assert!(p.contains("Expected answer format: short paragraph"));
        assert!(p.contains("factualAccuracy"));
    }
}
