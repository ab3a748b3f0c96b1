use crate::config::ScoringConfig;
use crate::errors::AggregateError;
use crate::model::{CriterionAverages, Evaluation, PassStatus, ResultRollup};

/// Reduce all evaluations of one interview into a single rollup.
///
/// Pure function of its inputs: no clock, no I/O, no rounding. The
/// evaluations are re-ordered by answer id before summation so the same
/// set always reduces in the same order, which keeps reruns
/// bit-identical even when callers collect evaluations concurrently.
///
/// `total_questions` may exceed the number of evaluations present;
/// partial aggregation is a valid, explicit state. Zero evaluations is
/// not: averaging nothing is `InsufficientData`, never a zero score.
pub fn aggregate(
    interview_id: &str,
    evaluations: &[Evaluation],
    total_questions: u32,
    scoring: &ScoringConfig,
) -> Result<ResultRollup, AggregateError> {
    if evaluations.is_empty() {
        return Err(AggregateError::InsufficientData {
            interview_id: interview_id.to_string(),
        });
    }
    let evaluated_count = evaluations.len() as u32;
    if evaluated_count > total_questions {
        return Err(AggregateError::CountMismatch {
            interview_id: interview_id.to_string(),
            evaluated: evaluated_count,
            total_questions,
        });
    }

    let mut ordered: Vec<&Evaluation> = evaluations.iter().collect();
    ordered.sort_by(|a, b| a.answer_id.cmp(&b.answer_id));

    let n = ordered.len() as f64;
    let mut fa = 0.0;
    let mut comp = 0.0;
    let mut rel = 0.0;
    let mut coh = 0.0;
    let mut score = 0.0;
    for ev in &ordered {
        fa += scoring.rating_value(ev.factual_accuracy.rating);
        comp += scoring.rating_value(ev.completeness.rating);
        rel += scoring.rating_value(ev.relevance.rating);
        coh += scoring.rating_value(ev.coherence.rating);
        score += ev.score;
    }

    let averages = CriterionAverages {
        factual_accuracy: fa / n,
        completeness: comp / n,
        relevance: rel / n,
        coherence: coh / n,
    };
    let average_score = score / n;
    let pass_status = scoring.classify_pass(average_score);
    let knowledge_level = scoring.knowledge_level(average_score).to_string();
    let summary_result = summarize(pass_status, &knowledge_level, average_score, evaluated_count, total_questions);

    Ok(ResultRollup {
        evaluated_count,
        total_questions,
        averages,
        average_score,
        pass_status,
        knowledge_level,
        summary_result,
    })
}

/// Deterministic one-line summary. Narrative recommendations come from
/// the oracle; this line must be reproducible from the numbers alone.
fn summarize(
    pass_status: PassStatus,
    knowledge_level: &str,
    average_score: f64,
    evaluated_count: u32,
    total_questions: u32,
) -> String {
    let coverage = if evaluated_count < total_questions {
        format!(" ({}/{} answers evaluated)", evaluated_count, total_questions)
    } else {
        String::new()
    };
    match pass_status {
        PassStatus::Pass => format!(
            "Candidate passed at {} level with average score {:.2}{}",
            knowledge_level, average_score, coverage
        ),
        PassStatus::Borderline => format!(
            "Candidate is borderline at {} level with average score {:.2}{}",
            knowledge_level, average_score, coverage
        ),
        PassStatus::Fail => format!(
            "Candidate failed at {} level with average score {:.2}{}",
            knowledge_level, average_score, coverage
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AggregateError;
    use crate::model::{CriterionJudgment, Rating, TokenUsage};
    use chrono::Utc;

    fn eval(answer_id: &str, rating: Rating, score: f64) -> Evaluation {
        let judgment = |r: Rating| CriterionJudgment {
            rating: r,
            explanation: "because".into(),
        };
        Evaluation {
            answer_id: answer_id.into(),
            interview_id: "int-1".into(),
            question_text: "q".into(),
            answer_text: "a".into(),
            factual_accuracy: judgment(rating),
            completeness: judgment(rating),
            relevance: judgment(rating),
            coherence: judgment(rating),
            score,
            usage: TokenUsage::default(),
            final_evaluation: "fine".into(),
            evaluated_at: Utc::now(),
        }
    }

    fn unit_scale_scoring() -> ScoringConfig {
        // 0..1 score range, pass at 0.6, quartile-ish bands.
        let mut s = ScoringConfig::default();
        s.score_range.min = 0.0;
        s.score_range.max = 1.0;
        s.pass_threshold = 0.6;
        s.borderline_threshold = 0.4;
        s.knowledge_bands = vec![
            crate::config::KnowledgeBand {
                min_score: 0.0,
                level: "novice".into(),
            },
            crate::config::KnowledgeBand {
                min_score: 0.25,
                level: "intermediate".into(),
            },
            crate::config::KnowledgeBand {
                min_score: 0.5,
                level: "advanced".into(),
            },
            crate::config::KnowledgeBand {
                min_score: 0.75,
                level: "expert".into(),
            },
        ];
        s
    }

    #[test]
    fn empty_set_is_insufficient_data() {
        let err = aggregate("int-1", &[], 3, &ScoringConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AggregateError::InsufficientData {
                interview_id: "int-1".into()
            }
        );
    }

    #[test]
    fn evaluated_count_cannot_exceed_total_questions() {
        let evs = vec![eval("a1", Rating::Good, 3.0), eval("a2", Rating::Good, 3.0)];
        let err = aggregate("int-1", &evs, 1, &ScoringConfig::default()).unwrap_err();
        assert!(matches!(err, AggregateError::CountMismatch { .. }));
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let scoring = unit_scale_scoring();
        let evs = vec![
            eval("a1", Rating::Excellent, 0.9),
            eval("a2", Rating::Good, 0.6),
            eval("a3", Rating::Fair, 0.3),
        ];
        let r = aggregate("int-1", &evs, 3, &scoring).unwrap();
        assert_eq!(r.evaluated_count, 3);
        assert!((r.average_score - 0.6).abs() < 1e-9);
        assert_eq!(r.pass_status, PassStatus::Pass);
        assert_eq!(r.knowledge_level, "advanced");
    }

    #[test]
    fn partial_evaluation_is_a_valid_state() {
        let scoring = unit_scale_scoring();
        let evs = vec![
            eval("a1", Rating::Excellent, 1.0),
            eval("a2", Rating::Excellent, 0.8),
        ];
        let r = aggregate("int-1", &evs, 5, &scoring).unwrap();
        assert_eq!(r.evaluated_count, 2);
        assert_eq!(r.total_questions, 5);
        assert!((r.average_score - 0.9).abs() < 1e-9);
        assert!(r.summary_result.contains("2/5"));
    }

    #[test]
    fn rerun_is_bit_identical_regardless_of_input_order() {
        let scoring = unit_scale_scoring();
        let mut evs = vec![
            eval("a3", Rating::Fair, 0.31),
            eval("a1", Rating::Excellent, 0.93),
            eval("a2", Rating::Good, 0.62),
        ];
        let first = aggregate("int-1", &evs, 3, &scoring).unwrap();
        evs.reverse();
        let second = aggregate("int-1", &evs, 3, &scoring).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn criterion_averages_use_configured_ordinals() {
        let scoring = ScoringConfig::default();
        let evs = vec![
            eval("a1", Rating::Poor, 1.0),
            eval("a2", Rating::Excellent, 5.0),
        ];
        let r = aggregate("int-1", &evs, 2, &scoring).unwrap();
        // Poor=1.0, Excellent=4.0 on the default scale.
        assert!((r.averages.factual_accuracy - 2.5).abs() < 1e-9);
        assert!((r.averages.coherence - 2.5).abs() < 1e-9);
        assert!((r.average_score - 3.0).abs() < 1e-9);
    }
}
