use clap::Parser;
use pageset::app::{self, cli::Cli};
use pageset::telemetry::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&cli.logging.to_config()) {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }

    if let Err(err) = app::run(cli).await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
