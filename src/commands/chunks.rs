use crate::segmentation::{Resolution, segment};
use crate::utils::timestamp::parse_flexible_timestamp;
use chrono::{DateTime, Utc};
use clap::Args;

#[derive(Debug, Args)]
pub struct ChunksArgs {
    #[arg(long, value_parser = parse_timestamp_arg, help = "Range start (RFC3339, date-time or YYYY-MM-DD)")]
    pub start: DateTime<Utc>,
    #[arg(long, value_parser = parse_timestamp_arg, help = "Range end (RFC3339, date-time or YYYY-MM-DD)")]
    pub end: DateTime<Utc>,
    #[arg(short, long, default_value = "month", help = "day, week or month")]
    pub resolution: Resolution,
}

fn parse_timestamp_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_flexible_timestamp(raw).ok_or_else(|| format!("'{}' is not a valid date", raw))
}

/// One serialized chunk per line
pub fn render_chunks(args: &ChunksArgs) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let chunks = segment(args.start, args.end, args.resolution)?;
    chunks
        .iter()
        .map(|chunk| serde_json::to_string(chunk).map_err(Into::into))
        .collect()
}

pub fn handle_chunks_command(args: ChunksArgs) -> Result<(), Box<dyn std::error::Error>> {
    for line in render_chunks(&args)? {
        println!("{}", line);
    }
    Ok(())
}
