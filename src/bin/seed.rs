use std::env;
use std::process::ExitCode;

use dotenvy::dotenv;
use tenantgate::{app, seeds};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,seed=info", env!("CARGO_PKG_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match app::config::Config::from_env() {
        Ok(config) => config,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let state = match app::AppState::from_config(&config).await {
        Ok(state) => state,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().collect();
    let force = if args.iter().any(|a| a == "--force-all") {
        seeds::Force::All
    } else {
        args.iter()
            .position(|a| a == "--force")
            .and_then(|i| args.get(i + 1))
            .and_then(|s| s.parse::<i64>().ok())
            .map_or(seeds::Force::None, seeds::Force::Version)
    };

    match seeds::run_selected(&state.db, &seeds::all_seeds(), force).await {
        Ok(()) => {
            tracing::info!(app = app::APP_NAME, "seeding finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "seeding failed");
            ExitCode::FAILURE
        }
    }
}
