use clap::Parser;
use device_savings_api::commands::{Commands, handle_command};
use device_savings_api::Config;
use tracing::error;

#[derive(Parser)]
#[command(name = "device-savings-api")]
#[command(about = "Carbon and fuel savings API over per-device records")]
struct Cli {
    #[arg(short, long, help = "Path to configuration file")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.level))
        .init();

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Err(e) = handle_command(command, &config).await {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
