use super::args::{Cli, Command, EvaluateArgs, InitArgs, ResultArgs, ScoreArgs};
use intervet_core::config::PipelineConfig;
use intervet_core::engine::runner::{RunPolicy, Runner};
use intervet_core::errors::ConfigError;
use intervet_core::providers::llm::fake::FakeScorerClient;
use intervet_core::providers::llm::null::NullClient;
use intervet_core::providers::llm::openai::OpenAiClient;
use intervet_core::providers::llm::LlmClient;
use intervet_core::scorer::ScorerService;
use intervet_core::storage::scorer_cache::ScorerCache;
use intervet_core::storage::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const PIPELINE_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => cmd_init(args).await,
        Command::Evaluate(args) => cmd_evaluate(args).await,
        Command::Score(args) => cmd_score(args).await,
        Command::Result(args) => cmd_result(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

async fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if !args.config.exists() {
        if let Some(parent) = args.config.parent() {
            std::fs::create_dir_all(parent)?;
        }
        intervet_core::config::write_sample_config(&args.config)?;
        eprintln!("created {}", args.config.display());
    } else {
        eprintln!("note: {} already exists", args.config.display());
    }
    Ok(exit_codes::OK)
}

async fn cmd_evaluate(args: EvaluateArgs) -> anyhow::Result<i32> {
    let runner = build_runner(&args.db, &args.config, args.scorer.as_deref(), args.refresh)?;
    if runner.scorer.provider_name() == "none" {
        // Aggregate-only: roll up the evaluations already on record.
        let result = runner.aggregate_by_id(&args.interview).await?;
        intervet_core::report::console::print_result(&result);
        return Ok(exit_codes::OK);
    }
    let report = runner.evaluate_interview(&args.interview).await?;
    intervet_core::report::console::print_report(&report);
    if report.failures.is_empty() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::PIPELINE_FAILED)
    }
}

async fn cmd_score(args: ScoreArgs) -> anyhow::Result<i32> {
    let runner = build_runner(&args.db, &args.config, args.scorer.as_deref(), args.refresh)?;
    let evaluation = runner.score_answer(&args.answer).await?;
    eprintln!(
        "Scored [{}]: {} (accuracy={} completeness={} relevance={} coherence={})",
        evaluation.answer_id,
        evaluation.score,
        evaluation.factual_accuracy.rating.as_str(),
        evaluation.completeness.rating.as_str(),
        evaluation.relevance.rating.as_str(),
        evaluation.coherence.rating.as_str(),
    );
    Ok(exit_codes::OK)
}

async fn cmd_result(args: ResultArgs) -> anyhow::Result<i32> {
    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let result = match (&args.interview, &args.application) {
        (Some(id), _) => store.get_result_by_interview(id)?,
        (None, Some(id)) => store.get_result_by_application(id)?,
        (None, None) => anyhow::bail!("pass --interview or --application"),
    };

    match result {
        Some(r) => {
            if args.format == "json" {
                println!("{}", serde_json::to_string_pretty(&r)?);
            } else {
                intervet_core::report::console::print_result(&r);
            }
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("no result found");
            Ok(exit_codes::PIPELINE_FAILED)
        }
    }
}

fn build_runner(
    db_path: &Path,
    config_path: &PathBuf,
    scorer_override: Option<&str>,
    refresh: bool,
) -> anyhow::Result<Runner> {
    ensure_parent_dir(db_path)?;
    let mut cfg: PipelineConfig =
        intervet_core::config::load_config(config_path).map_err(anyhow::Error::new)?;
    if let Some(provider) = scorer_override {
        cfg.scorer.provider = provider.to_string();
    }

    let store = Store::open(db_path)?;
    store.init_schema()?;
    let cache = ScorerCache::new(store.clone());
    let client = build_client(&cfg)?;
    let scorer = ScorerService::new(
        cfg.scorer.clone(),
        cfg.scoring.score_range.clone(),
        cache,
        client,
        refresh,
    );
    let policy = RunPolicy::from_settings(&cfg.scorer);
    Ok(Runner::new(store, scorer, cfg.scoring, policy))
}

fn build_client(cfg: &PipelineConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    match cfg.scorer.provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| ConfigError("OPENAI_API_KEY is not set".into()))?;
            Ok(Arc::new(OpenAiClient::new(
                cfg.scorer.model.clone(),
                api_key,
                cfg.scorer.temperature,
                cfg.scorer.max_tokens,
            )))
        }
        "fake" => {
            let mid = (cfg.scoring.score_range.min + cfg.scoring.score_range.max) / 2.0;
            Ok(Arc::new(FakeScorerClient::new(&cfg.scorer.model, mid)))
        }
        "none" => Ok(Arc::new(NullClient)),
        other => Err(ConfigError(format!(
            "unknown scorer provider '{}' (expected openai|fake|none)",
            other
        ))
        .into()),
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
