pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS interviews (
  id TEXT PRIMARY KEY,
  candidate_id TEXT NOT NULL,
  application_id TEXT,
  job_id TEXT,
  status TEXT NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
  id TEXT PRIMARY KEY,
  interview_id TEXT NOT NULL REFERENCES interviews(id) ON DELETE CASCADE,
  question_text TEXT NOT NULL,
  expected_answer_format TEXT,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_questions_interview ON questions(interview_id);

CREATE TABLE IF NOT EXISTS answers (
  id TEXT PRIMARY KEY,
  question_id TEXT NOT NULL UNIQUE REFERENCES questions(id) ON DELETE CASCADE,
  interview_id TEXT NOT NULL REFERENCES interviews(id) ON DELETE CASCADE,
  answer_text TEXT NOT NULL,
  answered_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_answers_interview ON answers(interview_id);

CREATE TABLE IF NOT EXISTS evaluations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  answer_id TEXT NOT NULL UNIQUE REFERENCES answers(id) ON DELETE CASCADE,
  interview_id TEXT NOT NULL REFERENCES interviews(id) ON DELETE CASCADE,
  question_text TEXT NOT NULL,
  answer_text TEXT NOT NULL,
  factual_accuracy TEXT NOT NULL,
  factual_accuracy_explanation TEXT NOT NULL,
  completeness TEXT NOT NULL,
  completeness_explanation TEXT NOT NULL,
  relevance TEXT NOT NULL,
  relevance_explanation TEXT NOT NULL,
  coherence TEXT NOT NULL,
  coherence_explanation TEXT NOT NULL,
  score REAL NOT NULL,
  input_tokens INTEGER NOT NULL DEFAULT 0,
  output_tokens INTEGER NOT NULL DEFAULT 0,
  final_evaluation TEXT NOT NULL,
  evaluated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_evaluations_interview ON evaluations(interview_id);

CREATE TABLE IF NOT EXISTS interview_results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  interview_id TEXT NOT NULL UNIQUE REFERENCES interviews(id) ON DELETE CASCADE,
  candidate_id TEXT NOT NULL,
  application_id TEXT UNIQUE,
  job_id TEXT,
  evaluated_count INTEGER NOT NULL,
  total_questions INTEGER NOT NULL,
  average_factual_accuracy REAL NOT NULL,
  average_completeness REAL NOT NULL,
  average_relevance REAL NOT NULL,
  average_coherence REAL NOT NULL,
  average_score REAL NOT NULL,
  pass_status TEXT NOT NULL,
  summary_result TEXT NOT NULL,
  knowledge_level TEXT NOT NULL,
  recommendations TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS answer_failures (
  answer_id TEXT PRIMARY KEY REFERENCES answers(id) ON DELETE CASCADE,
  attempts INTEGER NOT NULL,
  last_error TEXT NOT NULL,
  failed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scorer_cache (
  key TEXT PRIMARY KEY,
  provider TEXT NOT NULL,
  model TEXT NOT NULL,
  created_at TEXT NOT NULL,
  payload_json TEXT NOT NULL
);
"#;
