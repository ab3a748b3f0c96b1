use crate::aggregate::aggregate;
use crate::config::{ScorerSettings, ScoringConfig};
use crate::model::{Answer, Evaluation, Interview, InterviewResult, NarrativeInput, Question};
use crate::scorer::ScorerService;
use crate::storage::Store;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout, Duration};

#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub parallel: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            parallel: 4,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RunPolicy {
    pub fn from_settings(s: &ScorerSettings) -> Self {
        Self {
            parallel: 4,
            timeout: Duration::from_secs(s.timeout_seconds),
            max_attempts: s.max_attempts.max(1),
            backoff: Duration::from_millis(s.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoringFailure {
    pub answer_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub interview_id: String,
    pub scored: u32,
    pub failures: Vec<ScoringFailure>,
    pub result: InterviewResult,
}

/// Drives one interview through the pipeline: concurrent per-answer
/// scoring, then a single aggregation once every scoring has settled.
#[derive(Clone)]
pub struct Runner {
    pub store: Store,
    pub scorer: ScorerService,
    pub scoring: ScoringConfig,
    pub policy: RunPolicy,
    // Aggregation is serialized per interview id; racing "last answer
    // done" signals must not interleave their result writes.
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Runner {
    pub fn new(store: Store, scorer: ScorerService, scoring: ScoringConfig, policy: RunPolicy) -> Self {
        Self {
            store,
            scorer,
            scoring,
            policy,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn evaluate_interview(&self, interview_id: &str) -> anyhow::Result<RunReport> {
        let interview = self
            .store
            .get_interview(interview_id)?
            .ok_or_else(|| anyhow::anyhow!("interview {} not found", interview_id))?;

        let pending = self.store.pending_answers(interview_id)?;
        tracing::info!(
            interview_id,
            pending = pending.len(),
            "scoring pending answers"
        );

        let sem = Arc::new(Semaphore::new(self.policy.parallel.max(1)));
        let mut handles = Vec::new();
        for (question, answer) in pending {
            let permit = sem.clone().acquire_owned().await?;
            let this = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let answer_id = answer.id.clone();
                this.score_with_retry(&question, &answer)
                    .await
                    .map(|_| answer_id.clone())
                    .map_err(|e| (answer_id, format!("{:#}", e)))
            }));
        }

        let mut scored = 0u32;
        let mut failures = Vec::new();
        for h in handles {
            match h.await {
                Ok(Ok(_)) => scored += 1,
                Ok(Err((answer_id, error))) => failures.push(ScoringFailure { answer_id, error }),
                Err(e) => failures.push(ScoringFailure {
                    answer_id: "unknown".into(),
                    error: format!("join error: {}", e),
                }),
            }
        }

        // Barrier: every outstanding scoring for this interview has
        // settled; aggregate exactly once.
        let result = self.aggregate_interview(&interview).await?;

        Ok(RunReport {
            interview_id: interview_id.to_string(),
            scored,
            failures,
            result,
        })
    }

    /// Single-answer entry point. Refuses to re-score an answer that
    /// already has an evaluation; the audit trail is append-only.
    pub async fn score_answer(&self, answer_id: &str) -> anyhow::Result<Evaluation> {
        let (question, answer) = self
            .store
            .get_answer_with_question(answer_id)?
            .ok_or_else(|| anyhow::anyhow!("answer {} not found", answer_id))?;
        if self.store.has_evaluation(answer_id)? {
            anyhow::bail!("answer {} is already evaluated", answer_id);
        }
        self.score_with_retry(&question, &answer).await
    }

    async fn score_with_retry(
        &self,
        question: &Question,
        answer: &Answer,
    ) -> anyhow::Result<Evaluation> {
        let mut last_err = None;
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                sleep(self.policy.backoff * 2u32.pow(attempt - 1)).await;
            }
            let fut = self.scorer.score_answer(question, answer);
            match timeout(self.policy.timeout, fut).await {
                Ok(Ok(evaluation)) => {
                    self.store.insert_evaluation(&evaluation)?;
                    self.store.clear_answer_failure(&answer.id)?;
                    return Ok(evaluation);
                }
                Ok(Err(e)) => {
                    tracing::warn!(answer_id = %answer.id, attempt, error = %e, "scoring attempt failed");
                    last_err = Some(e);
                }
                Err(_) => {
                    tracing::warn!(answer_id = %answer.id, attempt, "scoring attempt timed out");
                    last_err = Some(anyhow::anyhow!(
                        "oracle call timed out after {:?}",
                        self.policy.timeout
                    ));
                }
            }
        }
        // Terminal: record the failure, leave the evaluation absent.
        // Aggregation proceeds counting only present evaluations.
        let err = last_err.unwrap_or_else(|| anyhow::anyhow!("no scoring attempts made"));
        self.store
            .record_answer_failure(&answer.id, self.policy.max_attempts, &format!("{:#}", err))?;
        Err(err)
    }

    /// Aggregate-only entry point: rolls up whatever evaluations are
    /// already on record without touching the oracle for scoring.
    pub async fn aggregate_by_id(&self, interview_id: &str) -> anyhow::Result<InterviewResult> {
        let interview = self
            .store
            .get_interview(interview_id)?
            .ok_or_else(|| anyhow::anyhow!("interview {} not found", interview_id))?;
        self.aggregate_interview(&interview).await
    }

    pub async fn aggregate_interview(
        &self,
        interview: &Interview,
    ) -> anyhow::Result<InterviewResult> {
        let lock = self.interview_lock(&interview.id);
        let result = {
            let _guard = lock.lock().await;
            self.aggregate_locked(interview).await
        };
        self.release_interview_lock(&interview.id, &lock);
        result
    }

    async fn aggregate_locked(&self, interview: &Interview) -> anyhow::Result<InterviewResult> {
        let evaluations = self.store.get_evaluations(&interview.id)?;
        let total_questions = self.store.count_questions(&interview.id)?;
        let rollup = aggregate(&interview.id, &evaluations, total_questions, &self.scoring)?;

        let existing = self.store.get_result_by_interview(&interview.id)?;
        let recommendations = match self
            .scorer
            .recommend(&NarrativeInput::from_rollup(&rollup))
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(interview_id = %interview.id, error = %e, "recommendation generation failed");
                // Keep whatever narrative an earlier run produced.
                existing.as_ref().and_then(|r| r.recommendations.clone())
            }
        };

        let now = Utc::now();
        let created_at = existing.map(|r| r.created_at).unwrap_or(now);
        let result = InterviewResult {
            interview_id: interview.id.clone(),
            candidate_id: interview.candidate_id.clone(),
            application_id: interview.application_id.clone(),
            job_id: interview.job_id.clone(),
            rollup,
            recommendations,
            created_at,
            updated_at: now,
        };
        self.store.upsert_result(&result)?;
        tracing::info!(
            interview_id = %interview.id,
            evaluated = result.rollup.evaluated_count,
            total = result.rollup.total_questions,
            pass_status = result.rollup.pass_status.as_str(),
            "interview result stored"
        );
        Ok(result)
    }

    fn interview_lock(&self, interview_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(interview_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the map entry once no other aggregation holds it, so the
    /// map does not grow with every interview ever touched.
    fn release_interview_lock(&self, interview_id: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap();
        // Two references left means map entry + our caller: no waiter.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(interview_id);
        }
    }
}
