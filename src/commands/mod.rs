pub mod chunks;
pub mod data;

use crate::Config;
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Print the calendar-aligned chunks covering a range, one JSON object per line
    Chunks(chunks::ChunksArgs),
    /// Load the configured CSV files and report what they contain
    CheckData,
}

pub async fn handle_command(
    command: Commands,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve => {
            info!("Starting device savings API");
            let server = crate::Server::new(config.clone()).await?;
            server.run().await?;
            Ok(())
        }
        Commands::Chunks(args) => chunks::handle_chunks_command(args),
        Commands::CheckData => data::handle_check_data_command(config).await,
    }
}
