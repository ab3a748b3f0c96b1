use crate::engine::runner::RunReport;
use crate::model::InterviewResult;

pub fn print_report(report: &RunReport) {
    for f in &report.failures {
        eprintln!("SCORER FAILED [{}]: {}", f.answer_id, f.error);
    }
    eprintln!(
        "Scoring: scored={} failed={} interview={}",
        report.scored,
        report.failures.len(),
        report.interview_id
    );
    print_result(&report.result);
}

pub fn print_result(result: &InterviewResult) {
    let r = &result.rollup;
    eprintln!(
        "Result: {} ({}) avg={:.2} [accuracy={:.2} completeness={:.2} relevance={:.2} coherence={:.2}] evaluated={}/{}",
        r.pass_status.as_str(),
        r.knowledge_level,
        r.average_score,
        r.averages.factual_accuracy,
        r.averages.completeness,
        r.averages.relevance,
        r.averages.coherence,
        r.evaluated_count,
        r.total_questions
    );
    eprintln!("Summary: {}", r.summary_result);
    if let Some(rec) = &result.recommendations {
        eprintln!("Recommendations: {}", rec);
    }
}
