use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use dao_test_harness::chain;
use dao_test_harness::cli::Args;
use dao_test_harness::client::GethRunner;
use dao_test_harness::config::Config;
use dao_test_harness::scenario::TestContext;
use dao_test_harness::state::ScenarioState;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "dao_test_harness=debug"
    } else {
        "dao_test_harness=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Err(e) = run(args).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_args(args).context("Invalid configuration")?;
    info!("solc: {}", config.solc.display());
    info!("geth: {}", config.geth.display());
    info!("Work directory: {}", config.work_dir.display());

    let state = if config.clean_chain {
        chain::clean_blockchain(&config.data_dir())?;
        let mut state = ScenarioState::default();
        state.forget_deployment(&config.save_file())?;
        state
    } else {
        ScenarioState::load(&config.save_file())?
    };

    let runner = GethRunner::new(
        config.geth.clone(),
        config.data_dir(),
        config.genesis_file(),
        config.client_log(),
    );
    let target = config.scenario;
    let mut context = TestContext::new(config, runner, state, StdRng::from_entropy())?;
    context.run_scenario(target).await?;

    info!(
        "✅ All scenarios passed: {}",
        context
            .executed()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
