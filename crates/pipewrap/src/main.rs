#![forbid(unsafe_code)]

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pipewrap::cli::Cli;
use pipewrap::{commands, exit};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(parse_error) => {
            // clap renders its own usage/help output.
            let _ = parse_error.print();
            let code = if parse_error.use_stderr() {
                exit::codes::USAGE
            } else {
                exit::codes::SUCCESS
            };
            std::process::exit(code);
        }
    };

    match commands::run(cli).await {
        Ok(_stats) => std::process::exit(exit::codes::SUCCESS),
        Err(app_error) => {
            error!(%app_error, "session failed");
            std::process::exit(exit::exit_code(&app_error));
        }
    }
}
