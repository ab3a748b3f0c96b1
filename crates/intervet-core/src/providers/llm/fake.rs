use super::LlmClient;
use crate::model::{LlmResponse, TokenUsage};
use async_trait::async_trait;
use serde_json::json;

/// Offline stand-in for the judgment oracle. Emits a fixed mid-range
/// verdict so pipelines can be exercised without credentials.
pub struct FakeScorerClient {
    pub model: String,
    pub score: f64,
}

impl FakeScorerClient {
    pub fn new(model: &str, score: f64) -> Self {
        Self {
            model: model.to_string(),
            score,
        }
    }
}

#[async_trait]
impl LlmClient for FakeScorerClient {
    async fn complete(&self, _system: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        let text = if prompt.contains("Question:") {
            json!({
                "factualAccuracy": "Good",
                "factualAccuracyExplanation": "fake verdict",
                "completeness": "Good",
                "completenessExplanation": "fake verdict",
                "relevance": "Good",
                "relevanceExplanation": "fake verdict",
                "coherence": "Good",
                "coherenceExplanation": "fake verdict",
                "score": self.score,
                "finalEvaluation": "fake verdict"
            })
            .to_string()
        } else {
            "No recommendations: generated by the offline fake scorer.".to_string()
        };
        Ok(LlmResponse {
            text,
            provider: self.provider_name().to_string(),
            model: self.model.clone(),
            cached: false,
            usage: TokenUsage {
                input_tokens: prompt.len() as u32 / 4,
                output_tokens: 64,
            },
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
