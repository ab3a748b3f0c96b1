use crate::model::{
    Answer, CriterionAverages, CriterionJudgment, Evaluation, Interview, InterviewResult,
    PassStatus, Question, Rating, ResultRollup, TokenUsage,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        // Cascade deletes depend on this pragma; sqlite defaults it off.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn insert_interview(&self, iv: &Interview) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO interviews(id, candidate_id, application_id, job_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                iv.id,
                iv.candidate_id,
                iv.application_id,
                iv.job_id,
                iv.status,
                iv.created_at.to_rfc3339(),
                iv.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_interview(&self, id: &str) -> anyhow::Result<Option<Interview>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, candidate_id, application_id, job_id, status, created_at, updated_at
             FROM interviews WHERE id=?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Interview {
                id: row.get(0)?,
                candidate_id: row.get(1)?,
                application_id: row.get(2)?,
                job_id: row.get(3)?,
                status: row.get(4)?,
                created_at: parse_ts(&row.get::<_, String>(5)?)?,
                updated_at: parse_ts(&row.get::<_, String>(6)?)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn delete_interview(&self, id: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM interviews WHERE id=?1", params![id])?;
        Ok(())
    }

    pub fn insert_question(&self, q: &Question) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO questions(id, interview_id, question_text, expected_answer_format, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                q.id,
                q.interview_id,
                q.question_text,
                q.expected_answer_format,
                q.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn count_questions(&self, interview_id: &str) -> anyhow::Result<u32> {
        let conn = self.conn.lock().unwrap();
        let n: u32 = conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE interview_id=?1",
            params![interview_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn insert_answer(&self, a: &Answer) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO answers(id, question_id, interview_id, answer_text, answered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                a.id,
                a.question_id,
                a.interview_id,
                a.answer_text,
                a.answered_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn get_answer_with_question(
        &self,
        answer_id: &str,
    ) -> anyhow::Result<Option<(Question, Answer)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT q.id, q.interview_id, q.question_text, q.expected_answer_format, q.created_at,
                    a.id, a.question_id, a.interview_id, a.answer_text, a.answered_at
             FROM answers a JOIN questions q ON q.id = a.question_id
             WHERE a.id=?1",
        )?;
        let mut rows = stmt.query(params![answer_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(question_answer_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Answers for one interview that do not have an evaluation yet.
    /// Answers with a recorded terminal failure stay pending, so a
    /// later run retries them.
    pub fn pending_answers(&self, interview_id: &str) -> anyhow::Result<Vec<(Question, Answer)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT q.id, q.interview_id, q.question_text, q.expected_answer_format, q.created_at,
                    a.id, a.question_id, a.interview_id, a.answer_text, a.answered_at
             FROM answers a JOIN questions q ON q.id = a.question_id
             WHERE a.interview_id=?1
               AND a.id NOT IN (SELECT answer_id FROM evaluations)
             ORDER BY a.id",
        )?;
        let mut rows = stmt.query(params![interview_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(question_answer_from_row(row)?);
        }
        Ok(out)
    }

    /// Append-only: an answer is evaluated at most once, enforced by
    /// the unique key on answer_id.
    pub fn insert_evaluation(&self, ev: &Evaluation) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO evaluations(
                answer_id, interview_id, question_text, answer_text,
                factual_accuracy, factual_accuracy_explanation,
                completeness, completeness_explanation,
                relevance, relevance_explanation,
                coherence, coherence_explanation,
                score, input_tokens, output_tokens, final_evaluation, evaluated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                ev.answer_id,
                ev.interview_id,
                ev.question_text,
                ev.answer_text,
                ev.factual_accuracy.rating.as_str(),
                ev.factual_accuracy.explanation,
                ev.completeness.rating.as_str(),
                ev.completeness.explanation,
                ev.relevance.rating.as_str(),
                ev.relevance.explanation,
                ev.coherence.rating.as_str(),
                ev.coherence.explanation,
                ev.score,
                ev.usage.input_tokens,
                ev.usage.output_tokens,
                ev.final_evaluation,
                ev.evaluated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_evaluations(&self, interview_id: &str) -> anyhow::Result<Vec<Evaluation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT answer_id, interview_id, question_text, answer_text,
                    factual_accuracy, factual_accuracy_explanation,
                    completeness, completeness_explanation,
                    relevance, relevance_explanation,
                    coherence, coherence_explanation,
                    score, input_tokens, output_tokens, final_evaluation, evaluated_at
             FROM evaluations WHERE interview_id=?1 ORDER BY answer_id",
        )?;
        let mut rows = stmt.query(params![interview_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let judgment = |r: usize, e: usize| -> anyhow::Result<CriterionJudgment> {
                Ok(CriterionJudgment {
                    rating: Rating::parse(&row.get::<_, String>(r)?)?,
                    explanation: row.get(e)?,
                })
            };
            out.push(Evaluation {
                answer_id: row.get(0)?,
                interview_id: row.get(1)?,
                question_text: row.get(2)?,
                answer_text: row.get(3)?,
                factual_accuracy: judgment(4, 5)?,
                completeness: judgment(6, 7)?,
                relevance: judgment(8, 9)?,
                coherence: judgment(10, 11)?,
                score: row.get(12)?,
                usage: TokenUsage {
                    input_tokens: row.get(13)?,
                    output_tokens: row.get(14)?,
                },
                final_evaluation: row.get(15)?,
                evaluated_at: parse_ts(&row.get::<_, String>(16)?)?,
            });
        }
        Ok(out)
    }

    pub fn has_evaluation(&self, answer_id: &str) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n: u32 = conn.query_row(
            "SELECT COUNT(*) FROM evaluations WHERE answer_id=?1",
            params![answer_id],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Exactly one result per interview. Re-aggregation overwrites the
    /// existing row and refreshes updated_at; created_at survives.
    pub fn upsert_result(&self, r: &InterviewResult) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO interview_results(
                interview_id, candidate_id, application_id, job_id,
                evaluated_count, total_questions,
                average_factual_accuracy, average_completeness, average_relevance, average_coherence,
                average_score, pass_status, summary_result, knowledge_level, recommendations,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(interview_id) DO UPDATE SET
                candidate_id=excluded.candidate_id,
                application_id=excluded.application_id,
                job_id=excluded.job_id,
                evaluated_count=excluded.evaluated_count,
                total_questions=excluded.total_questions,
                average_factual_accuracy=excluded.average_factual_accuracy,
                average_completeness=excluded.average_completeness,
                average_relevance=excluded.average_relevance,
                average_coherence=excluded.average_coherence,
                average_score=excluded.average_score,
                pass_status=excluded.pass_status,
                summary_result=excluded.summary_result,
                knowledge_level=excluded.knowledge_level,
                recommendations=excluded.recommendations,
                updated_at=excluded.updated_at",
            params![
                r.interview_id,
                r.candidate_id,
                r.application_id,
                r.job_id,
                r.rollup.evaluated_count,
                r.rollup.total_questions,
                r.rollup.averages.factual_accuracy,
                r.rollup.averages.completeness,
                r.rollup.averages.relevance,
                r.rollup.averages.coherence,
                r.rollup.average_score,
                r.rollup.pass_status.as_str(),
                r.rollup.summary_result,
                r.rollup.knowledge_level,
                r.recommendations,
                r.created_at.to_rfc3339(),
                r.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_result_by_interview(
        &self,
        interview_id: &str,
    ) -> anyhow::Result<Option<InterviewResult>> {
        self.get_result("interview_id=?1", interview_id)
    }

    pub fn get_result_by_application(
        &self,
        application_id: &str,
    ) -> anyhow::Result<Option<InterviewResult>> {
        self.get_result("application_id=?1", application_id)
    }

    fn get_result(&self, filter: &str, key: &str) -> anyhow::Result<Option<InterviewResult>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT interview_id, candidate_id, application_id, job_id,
                    evaluated_count, total_questions,
                    average_factual_accuracy, average_completeness, average_relevance, average_coherence,
                    average_score, pass_status, summary_result, knowledge_level, recommendations,
                    created_at, updated_at
             FROM interview_results WHERE {}",
            filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(InterviewResult {
                interview_id: row.get(0)?,
                candidate_id: row.get(1)?,
                application_id: row.get(2)?,
                job_id: row.get(3)?,
                rollup: ResultRollup {
                    evaluated_count: row.get(4)?,
                    total_questions: row.get(5)?,
                    averages: CriterionAverages {
                        factual_accuracy: row.get(6)?,
                        completeness: row.get(7)?,
                        relevance: row.get(8)?,
                        coherence: row.get(9)?,
                    },
                    average_score: row.get(10)?,
                    pass_status: PassStatus::parse(&row.get::<_, String>(11)?)?,
                    summary_result: row.get(12)?,
                    knowledge_level: row.get(13)?,
                },
                recommendations: row.get(14)?,
                created_at: parse_ts(&row.get::<_, String>(15)?)?,
                updated_at: parse_ts(&row.get::<_, String>(16)?)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn record_answer_failure(
        &self,
        answer_id: &str,
        attempts: u32,
        last_error: &str,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO answer_failures(answer_id, attempts, last_error, failed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(answer_id) DO UPDATE SET
                attempts=excluded.attempts,
                last_error=excluded.last_error,
                failed_at=excluded.failed_at",
            params![answer_id, attempts, last_error, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn clear_answer_failure(&self, answer_id: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM answer_failures WHERE answer_id=?1",
            params![answer_id],
        )?;
        Ok(())
    }

    pub fn get_answer_failure(&self, answer_id: &str) -> anyhow::Result<Option<(u32, String)>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT attempts, last_error FROM answer_failures WHERE answer_id=?1",
                params![answer_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }
}

fn question_answer_from_row(row: &rusqlite::Row<'_>) -> anyhow::Result<(Question, Answer)> {
    let question = Question {
        id: row.get(0)?,
        interview_id: row.get(1)?,
        question_text: row.get(2)?,
        expected_answer_format: row.get(3)?,
        created_at: parse_ts(&row.get::<_, String>(4)?)?,
    };
    let answer = Answer {
        id: row.get(5)?,
        question_id: row.get(6)?,
        interview_id: row.get(7)?,
        answer_text: row.get(8)?,
        answered_at: row
            .get::<_, Option<String>>(9)?
            .map(|s| parse_ts(&s))
            .transpose()?,
    };
    Ok((question, answer))
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
