use crate::Config;
use crate::data::{CsvDataProvider, DataProvider};
use crate::savings::sum_records;
use tracing::info;

pub async fn handle_check_data_command(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        devices = %config.data.devices_path,
        savings = %config.data.savings_path,
        "Checking data files..."
    );

    let provider = CsvDataProvider::from_config(&config.data);
    provider.load().await?;

    let devices = provider.get_devices().await?.unwrap_or_default();
    let savings = provider.get_device_savings().await?.unwrap_or_default();
    let total = sum_records(savings.iter());

    println!("devices: {}", devices.len());
    println!("records: {}", savings.len());
    println!("total carbon saved: {}", total.total_carbon);
    println!("total diesel saved: {}", total.total_diesel);

    Ok(())
}
