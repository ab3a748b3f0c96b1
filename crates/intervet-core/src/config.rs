use crate::errors::ConfigError;
use crate::model::Rating;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: u32,
    #[serde(default)]
    pub scorer: ScorerSettings,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerSettings {
    pub provider: String, // "openai", "fake", "none"
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub cache: bool,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4".into(),
            temperature: 0.5,
            max_tokens: 2000,
            timeout_seconds: 30,
            max_attempts: 3,
            backoff_ms: 500,
            cache: true,
        }
    }
}

/// Ordinal numeric value for each categorical rating. The mapping is
/// explicit configuration, never inferred from the oracle's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingScale {
    pub poor: f64,
    pub fair: f64,
    pub good: f64,
    pub excellent: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            poor: 1.0,
            fair: 2.0,
            good: 3.0,
            excellent: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBand {
    pub min_score: f64,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub rating_scale: RatingScale,
    #[serde(default)]
    pub score_range: ScoreRange,
    pub pass_threshold: f64,
    pub borderline_threshold: f64,
    pub knowledge_bands: Vec<KnowledgeBand>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rating_scale: RatingScale::default(),
            score_range: ScoreRange::default(),
            pass_threshold: 3.0,
            borderline_threshold: 2.0,
            knowledge_bands: vec![
                KnowledgeBand {
                    min_score: 0.0,
                    level: "beginner".into(),
                },
                KnowledgeBand {
                    min_score: 2.0,
                    level: "intermediate".into(),
                },
                KnowledgeBand {
                    min_score: 3.5,
                    level: "advanced".into(),
                },
                KnowledgeBand {
                    min_score: 4.5,
                    level: "expert".into(),
                },
            ],
        }
    }
}

impl ScoringConfig {
    pub fn rating_value(&self, rating: Rating) -> f64 {
        match rating {
            Rating::Poor => self.rating_scale.poor,
            Rating::Fair => self.rating_scale.fair,
            Rating::Good => self.rating_scale.good,
            Rating::Excellent => self.rating_scale.excellent,
        }
    }

    pub fn classify_pass(&self, average_score: f64) -> crate::model::PassStatus {
        use crate::model::PassStatus;
        if average_score + EPSILON >= self.pass_threshold {
            PassStatus::Pass
        } else if average_score + EPSILON >= self.borderline_threshold {
            PassStatus::Borderline
        } else {
            PassStatus::Fail
        }
    }

    /// Highest band whose floor the average reaches. Bands are
    /// validated ascending, so a reverse scan finds it.
    pub fn knowledge_level(&self, average_score: f64) -> &str {
        self.knowledge_bands
            .iter()
            .rev()
            .find(|b| average_score + EPSILON >= b.min_score)
            .or_else(|| self.knowledge_bands.first())
            .map(|b| b.level.as_str())
            .unwrap_or("unclassified")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knowledge_bands.is_empty() {
            return Err(ConfigError("knowledge_bands must not be empty".into()));
        }
        for w in self.knowledge_bands.windows(2) {
            if w[1].min_score <= w[0].min_score {
                return Err(ConfigError(format!(
                    "knowledge_bands must be strictly ascending ('{}' at {} after '{}' at {})",
                    w[1].level, w[1].min_score, w[0].level, w[0].min_score
                )));
            }
        }
        if self.borderline_threshold > self.pass_threshold {
            return Err(ConfigError(format!(
                "borderline_threshold {} exceeds pass_threshold {}",
                self.borderline_threshold, self.pass_threshold
            )));
        }
        if self.score_range.min >= self.score_range.max {
            return Err(ConfigError(format!(
                "score_range min {} must be below max {}",
                self.score_range.min, self.score_range.max
            )));
        }
        let s = &self.rating_scale;
        if !(s.poor < s.fair && s.fair < s.good && s.good < s.excellent) {
            return Err(ConfigError(
                "rating_scale must be monotonic: poor < fair < good < excellent".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let cfg: PipelineConfig = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    cfg.scoring.validate()?;
    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, include_str!("../../../pipeline.yaml"))
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
