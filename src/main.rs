use campaign_director::config::setup_logging;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = campaign_director::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        std::process::exit(2);
    }

    if let Err(err) = campaign_director::commands::run(&cli).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}
