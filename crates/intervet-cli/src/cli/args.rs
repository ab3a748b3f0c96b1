use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "intervet",
    version,
    about = "Interview evaluation pipeline: score candidate answers, roll them up into a result"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score every unevaluated answer of an interview, then aggregate
    Evaluate(EvaluateArgs),
    /// Score a single answer
    Score(ScoreArgs),
    /// Fetch a stored interview result
    Result(ResultArgs),
    Init(InitArgs),
    Version,
}

#[derive(Parser, Clone)]
pub struct EvaluateArgs {
    /// Interview to evaluate
    #[arg(long)]
    pub interview: String,

    #[arg(long, default_value = "pipeline.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".intervet/intervet.db")]
    pub db: PathBuf,

    /// scorer provider override: openai|fake|none
    #[arg(long)]
    pub scorer: Option<String>,

    /// bypass the verdict cache and call the oracle live
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Parser, Clone)]
pub struct ScoreArgs {
    /// Answer to score
    #[arg(long)]
    pub answer: String,

    #[arg(long, default_value = "pipeline.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".intervet/intervet.db")]
    pub db: PathBuf,

    #[arg(long)]
    pub scorer: Option<String>,

    #[arg(long)]
    pub refresh: bool,
}

#[derive(Parser, Clone)]
pub struct ResultArgs {
    /// Look up by interview id
    #[arg(long, conflicts_with = "application")]
    pub interview: Option<String>,

    /// Look up by application id
    #[arg(long)]
    pub application: Option<String>,

    #[arg(long, default_value = ".intervet/intervet.db")]
    pub db: PathBuf,

    /// Output format: text | json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Parser, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "pipeline.yaml")]
    pub config: PathBuf,
}
