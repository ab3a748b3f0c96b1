use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;

/// Oracle stand-in for aggregate-only runs (`provider: none`). Every
/// completion is refused, so pending answers stay pending and only the
/// evaluations already on record feed the rollup.
pub struct NullClient;

#[async_trait]
impl LlmClient for NullClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<LlmResponse> {
        anyhow::bail!("scoring is disabled (scorer provider 'none')")
    }

    fn provider_name(&self) -> &'static str {
        "none"
    }
}
