use clap::Parser;
use intervet_core::errors::ConfigError;

mod cli;

use cli::args::Cli;
use cli::commands::dispatch;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            if e.downcast_ref::<ConfigError>().is_some() {
                cli::commands::exit_codes::CONFIG_ERROR
            } else {
                cli::commands::exit_codes::PIPELINE_FAILED
            }
        }
    };
    std::process::exit(code);
}
