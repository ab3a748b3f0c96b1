use async_trait::async_trait;
use chrono::Utc;
use intervet_core::config::{ScorerSettings, ScoringConfig};
use intervet_core::engine::runner::{RunPolicy, Runner};
use intervet_core::model::{Answer, Interview, LlmResponse, PassStatus, Question, TokenUsage};
use intervet_core::providers::llm::fake::FakeScorerClient;
use intervet_core::providers::llm::null::NullClient;
use intervet_core::providers::llm::LlmClient;
use intervet_core::scorer::ScorerService;
use intervet_core::storage::scorer_cache::ScorerCache;
use intervet_core::storage::Store;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::time::Duration;

fn seed_interview(store: &Store, interview_id: &str, questions: &[(&str, &str)]) {
    store
        .insert_interview(&Interview {
            id: interview_id.into(),
            candidate_id: "cand-1".into(),
            application_id: Some(format!("app-{}", interview_id)),
            job_id: Some("job-1".into()),
            status: "completed".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    for (i, (q_text, a_text)) in questions.iter().enumerate() {
        let q_id = format!("{}-q{}", interview_id, i + 1);
        let a_id = format!("{}-a{}", interview_id, i + 1);
        store
            .insert_question(&Question {
                id: q_id.clone(),
                interview_id: interview_id.into(),
                question_text: q_text.to_string(),
                expected_answer_format: None,
                created_at: Utc::now(),
            })
            .unwrap();
        store
            .insert_answer(&Answer {
                id: a_id,
                question_id: q_id,
                interview_id: interview_id.into(),
                answer_text: a_text.to_string(),
                answered_at: Some(Utc::now()),
            })
            .unwrap();
    }
}

fn build_runner(store: &Store, client: Arc<dyn LlmClient>) -> Runner {
    let settings = ScorerSettings {
        provider: "fake".into(),
        max_attempts: 2,
        backoff_ms: 1,
        timeout_seconds: 5,
        ..ScorerSettings::default()
    };
    let scoring = ScoringConfig::default();
    let scorer = ScorerService::new(
        settings,
        scoring.score_range.clone(),
        ScorerCache::new(store.clone()),
        client,
        false,
    );
    Runner::new(
        store.clone(),
        scorer,
        scoring,
        RunPolicy {
            parallel: 4,
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        },
    )
}

/// Fails every scoring request whose prompt mentions a marker string;
/// answers everything else like the fake scorer.
struct ErraticClient {
    inner: FakeScorerClient,
    poison: String,
    // Reported provider; verdict cache keys include it.
    provider: &'static str,
}

#[async_trait]
impl LlmClient for ErraticClient {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        if prompt.contains(&self.poison) {
            anyhow::bail!("oracle unavailable");
        }
        self.inner.complete(system, prompt).await
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }
}

struct GarbageClient;

#[async_trait]
impl LlmClient for GarbageClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<LlmResponse> {
        Ok(LlmResponse {
            text: "I would rather chat about the weather.".into(),
            provider: "garbage".into(),
            model: "garbage".into(),
            cached: false,
            usage: TokenUsage::default(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "garbage"
    }
}

#[tokio::test]
async fn full_pipeline_scores_and_aggregates() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(
        &store,
        "int-1",
        &[("q one", "a one"), ("q two", "a two"), ("q three", "a three")],
    );

    let runner = build_runner(&store, Arc::new(FakeScorerClient::new("fake-model", 4.0)));
    let report = runner.evaluate_interview("int-1").await?;

    assert_eq!(report.scored, 3);
    assert!(report.failures.is_empty());
    assert_eq!(report.result.rollup.evaluated_count, 3);
    assert_eq!(report.result.rollup.total_questions, 3);
    assert!((report.result.rollup.average_score - 4.0).abs() < 1e-9);
    assert_eq!(report.result.rollup.pass_status, PassStatus::Pass);
    assert_eq!(report.result.rollup.knowledge_level, "advanced");
    assert!(report.result.recommendations.is_some());

    let stored = store.get_result_by_interview("int-1")?.unwrap();
    assert_eq!(stored.rollup.evaluated_count, 3);
    Ok(())
}

#[tokio::test]
async fn rerun_is_idempotent_and_preserves_created_at() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(&store, "int-1", &[("q one", "a one"), ("q two", "a two")]);

    let runner = build_runner(&store, Arc::new(FakeScorerClient::new("fake-model", 3.2)));
    let first = runner.evaluate_interview("int-1").await?;
    let second = runner.evaluate_interview("int-1").await?;

    // Nothing left to score the second time; the rollup is identical.
    assert_eq!(second.scored, 0);
    assert_eq!(first.result.rollup, second.result.rollup);
    assert_eq!(first.result.created_at, second.result.created_at);
    Ok(())
}

#[tokio::test]
async fn scorer_failure_leaves_evaluation_absent() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(
        &store,
        "int-1",
        &[("q one", "a one"), ("q two POISONED", "a two"), ("q three", "a three")],
    );

    let client = ErraticClient {
        inner: FakeScorerClient::new("fake-model", 4.5),
        poison: "POISONED".into(),
        provider: "erratic",
    };
    let runner = build_runner(&store, Arc::new(client));
    let report = runner.evaluate_interview("int-1").await?;

    assert_eq!(report.scored, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].answer_id, "int-1-a2");

    // Partial evaluation is an explicit, persisted state.
    assert_eq!(report.result.rollup.evaluated_count, 2);
    assert_eq!(report.result.rollup.total_questions, 3);
    assert!((report.result.rollup.average_score - 4.5).abs() < 1e-9);

    // Terminal failure is on record for the unscored answer, and the
    // answer stays pending for a later retry.
    let (attempts, last_error) = store.get_answer_failure("int-1-a2")?.unwrap();
    assert_eq!(attempts, 2);
    assert!(last_error.contains("oracle unavailable"));
    assert_eq!(store.pending_answers("int-1")?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn interview_with_no_evaluations_fails_fast() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(&store, "int-1", &[("q one POISONED", "a one")]);

    let client = ErraticClient {
        inner: FakeScorerClient::new("fake-model", 4.0),
        poison: "POISONED".into(),
        provider: "erratic",
    };
    let runner = build_runner(&store, Arc::new(client));
    let err = runner.evaluate_interview("int-1").await.unwrap_err();
    assert!(err.to_string().contains("no evaluations to aggregate"));
    assert!(store.get_result_by_interview("int-1")?.is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_oracle_reply_writes_no_evaluation() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(&store, "int-1", &[("q one", "a one")]);

    let runner = build_runner(&store, Arc::new(GarbageClient));
    let err = runner.score_answer("int-1-a1").await.unwrap_err();
    assert!(err.to_string().contains("JSON"));
    assert!(!store.has_evaluation("int-1-a1")?);
    Ok(())
}

#[tokio::test]
async fn none_provider_aggregates_without_scoring() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(&store, "int-1", &[("q one", "a one"), ("q two", "a two")]);

    let runner = build_runner(&store, Arc::new(FakeScorerClient::new("fake-model", 4.0)));
    let first = runner.evaluate_interview("int-1").await?;
    assert!(first.result.recommendations.is_some());

    // A late answer arrives; the oracle-less runner must leave it alone.
    store.insert_question(&Question {
        id: "int-1-q3".into(),
        interview_id: "int-1".into(),
        question_text: "q three".into(),
        expected_answer_format: None,
        created_at: Utc::now(),
    })?;
    store.insert_answer(&Answer {
        id: "int-1-a3".into(),
        question_id: "int-1-q3".into(),
        interview_id: "int-1".into(),
        answer_text: "a three".into(),
        answered_at: Some(Utc::now()),
    })?;

    let offline = build_runner(&store, Arc::new(NullClient));
    let result = offline.aggregate_by_id("int-1").await?;
    assert_eq!(result.rollup.evaluated_count, 2);
    assert_eq!(result.rollup.total_questions, 3);
    assert_eq!(store.pending_answers("int-1")?.len(), 1);
    // The narrative from the scoring run survives the rerun.
    assert_eq!(result.recommendations, first.result.recommendations);
    Ok(())
}

#[tokio::test]
async fn second_run_hits_the_verdict_cache() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("intervet.db"))?;
    store.init_schema()?;
    seed_interview(&store, "int-1", &[("q one", "a one")]);

    let runner = build_runner(&store, Arc::new(FakeScorerClient::new("fake-model", 3.0)));
    runner.evaluate_interview("int-1").await?;

    // Same question/answer on a fresh interview: the verdict comes from
    // the cache even when the live oracle would now refuse.
    seed_interview(&store, "int-2", &[("q one", "a one")]);
    let offline = ErraticClient {
        inner: FakeScorerClient::new("fake-model", 3.0),
        poison: "Question:".into(), // every scoring prompt
        provider: "fake",           // same cache namespace as the first run
    };
    let runner2 = build_runner(&store, Arc::new(offline));
    let report = runner2.evaluate_interview("int-2").await?;
    assert_eq!(report.scored, 1);
    assert_eq!(report.result.rollup.evaluated_count, 1);
    Ok(())
}
