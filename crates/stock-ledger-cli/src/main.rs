use stock_ledger_cli::run_cli;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_ledger_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run_cli().await {
        error!("CLI error: {}", e);

        // Exit with appropriate code based on error type
        let exit_code = match e {
            stock_ledger_cli::CliError::MissingToken => 1,
            stock_ledger_cli::CliError::Api(_) => 2,
            stock_ledger_cli::CliError::DeliveryFailed { .. } => 3,
            stock_ledger_cli::CliError::InvalidArgument { .. } => 4,
            stock_ledger_cli::CliError::Http(_) => 5,
        };

        std::process::exit(exit_code);
    }
}
