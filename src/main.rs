mod cli;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("herald=debug,tower_http=debug")),
        )
        .init();

    match cli::run() {
        cli::RunOutcome::Serve(config, addr) => {
            tracing::info!("listening on http://{addr}");
            herald::serve(addr, config).await;
        }
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    }
}
