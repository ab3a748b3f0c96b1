use assert_cmd::Command;
use chrono::Utc;
use intervet_core::model::{Answer, Interview, Question};
use intervet_core::storage::Store;
use predicates::prelude::*;
use tempfile::tempdir;

fn seed(db: &std::path::Path) {
    let store = Store::open(db).unwrap();
    store.init_schema().unwrap();
    store
        .insert_interview(&Interview {
            id: "int-1".into(),
            candidate_id: "cand-1".into(),
            application_id: Some("app-1".into()),
            job_id: Some("job-1".into()),
            status: "completed".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    store
        .insert_question(&Question {
            id: "q1".into(),
            interview_id: "int-1".into(),
            question_text: "What is a borrow checker?".into(),
            expected_answer_format: None,
            created_at: Utc::now(),
        })
        .unwrap();
    store
        .insert_answer(&Answer {
            id: "a1".into(),
            question_id: "q1".into(),
            interview_id: "int-1".into(),
            answer_text: "It enforces aliasing rules at compile time.".into(),
            answered_at: Some(Utc::now()),
        })
        .unwrap();
}

#[test]
fn init_writes_sample_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.yaml");

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["init", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("created"));

    let raw = std::fs::read_to_string(&config).unwrap();
    assert!(raw.contains("knowledge_bands"));
}

#[test]
fn evaluate_then_fetch_result() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.yaml");
    let db = dir.path().join("intervet.db");
    seed(&db);

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["init", "--config"])
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["evaluate", "--interview", "int-1", "--scorer", "fake"])
        .args(["--config"])
        .arg(&config)
        .args(["--db"])
        .arg(&db)
        .assert()
        .success()
        .stderr(predicate::str::contains("Result:"));

    let output = Command::cargo_bin("intervet")
        .unwrap()
        .args(["result", "--interview", "int-1", "--format", "json", "--db"])
        .arg(&db)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(v["rollup"]["evaluated_count"], 1);
    assert_eq!(v["interview_id"], "int-1");

    // Same result, looked up through the application key.
    Command::cargo_bin("intervet")
        .unwrap()
        .args(["result", "--application", "app-1", "--db"])
        .arg(&db)
        .assert()
        .success();
}

#[test]
fn none_scorer_aggregates_existing_evaluations() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.yaml");
    let db = dir.path().join("intervet.db");
    seed(&db);

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["init", "--config"])
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["evaluate", "--interview", "int-1", "--scorer", "fake"])
        .args(["--config"])
        .arg(&config)
        .args(["--db"])
        .arg(&db)
        .assert()
        .success();

    // Aggregate-only rerun: no oracle, same rollup.
    Command::cargo_bin("intervet")
        .unwrap()
        .args(["evaluate", "--interview", "int-1", "--scorer", "none"])
        .args(["--config"])
        .arg(&config)
        .args(["--db"])
        .arg(&db)
        .assert()
        .success()
        .stderr(predicate::str::contains("Result:"));
}

#[test]
fn missing_interview_is_a_pipeline_failure() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.yaml");
    let db = dir.path().join("intervet.db");
    seed(&db);

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["init", "--config"])
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["evaluate", "--interview", "nope", "--scorer", "fake"])
        .args(["--config"])
        .arg(&config)
        .args(["--db"])
        .arg(&db)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn unknown_provider_is_a_config_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pipeline.yaml");
    let db = dir.path().join("intervet.db");
    seed(&db);

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["init", "--config"])
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["evaluate", "--interview", "int-1", "--scorer", "bogus"])
        .args(["--config"])
        .arg(&config)
        .args(["--db"])
        .arg(&db)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown scorer provider"));
}

#[test]
fn missing_result_exits_nonzero() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("intervet.db");
    seed(&db);

    Command::cargo_bin("intervet")
        .unwrap()
        .args(["result", "--interview", "nope", "--db"])
        .arg(&db)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no result found"));
}
