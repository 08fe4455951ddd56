use clap::Parser;
use memeify::config::{AppConfig, setup_logging};
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = memeify::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let config = match AppConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid upstream URL {:?}: {}", cli.upstream_url, err);
            return;
        }
    };

    if let Err(err) = memeify::web::setup_server(&cli.listen_address, cli.port, &config).await {
        error!("Application error: {}", err);
    }
}
