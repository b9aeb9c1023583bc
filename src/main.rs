use clap::Parser;
use gha_run_archive::infrastructures::adapters::primary::cli::{Cli, env_file_arg};
use gha_run_archive::infrastructures::telemetry;
use tracing::{Instrument, info, info_span};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Env files only fill unset variables, so an explicit --env-file wins over ./.env
    if let Some(path) = env_file_arg(std::env::args_os()) {
        dotenvy::from_path(path).ok();
    }
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    // Also covers a file named by GITHUB_WORKFLOW_RUNS_ENV_FILE
    dotenvy::from_path(&cli.env_file).ok();

    let provider = telemetry::init()?;

    let span = info_span!("gha_run_archive", command = ?cli.command);
    let result = async move {
        info!("Application starting");
        cli.run().await
    }
    .instrument(span)
    .await;

    telemetry::shutdown(provider);
    result
}
