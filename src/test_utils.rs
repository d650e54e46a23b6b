use crate::{
    clock::FixedClock,
    config::Config,
    data::{DataProvider, Device, DeviceSavingRecord, MemoryDataProvider},
    server::Server,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// "Now" for test servers
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
}

fn device(id: i64, name: &str, timezone: &str) -> Device {
    Device {
        id,
        name: name.to_string(),
        timezone: timezone.to_string(),
    }
}

/// Build a saving record from an RFC3339 timestamp
pub fn record(device_id: i64, timestamp: &str, carbon: f64, fuel: f64) -> DeviceSavingRecord {
    DeviceSavingRecord {
        device_id,
        timestamp: timestamp.parse().unwrap(),
        device_timestamp: None,
        carbon_saved: carbon,
        fuel_saved: fuel,
    }
}

pub fn mock_devices() -> Vec<Device> {
    vec![
        device(1, "advenio", "Pacific/Chuuk"),
        device(2, "approbo", "America/Mexico_City"),
        device(3, "ventito", "America/North_Dakota/Beulah"),
        device(4, "ulterius", "Africa/Cairo"),
    ]
}

/// Totals: device 1 = 11/12, 2 = 13/14, 3 = 15/16, 4 = 17/18
pub fn mock_savings() -> Vec<DeviceSavingRecord> {
    vec![
        record(1, "2023-01-01T00:00:00Z", 1.0, 2.0),
        record(1, "2023-02-01T00:00:00Z", 10.0, 10.0),
        record(2, "2023-01-01T00:00:00Z", 3.0, 4.0),
        record(2, "2023-02-01T00:00:00Z", 10.0, 10.0),
        record(3, "2023-01-01T00:00:00Z", 5.0, 6.0),
        record(3, "2023-02-01T00:00:00Z", 10.0, 10.0),
        record(4, "2023-01-01T00:00:00Z", 7.0, 8.0),
        record(4, "2023-02-01T00:00:00Z", 10.0, 10.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataState {
    Loaded,
    DevicesOnly,
    Unloaded,
}

/// Test server builder over an in-memory provider and a fixed clock
pub struct TestServerBuilder {
    config: Config,
    devices: Vec<Device>,
    savings: Vec<DeviceSavingRecord>,
    state: DataState,
    failing: bool,
    now: DateTime<Utc>,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.logging.log_request = false;

        Self {
            config,
            devices: mock_devices(),
            savings: mock_savings(),
            state: DataState::Loaded,
            failing: false,
            now: test_now(),
        }
    }

    /// Set a custom configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the savings records served by the provider
    pub fn with_records(mut self, savings: Vec<DeviceSavingRecord>) -> Self {
        self.savings = savings;
        self
    }

    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Nothing loaded yet
    pub fn unloaded(mut self) -> Self {
        self.state = DataState::Unloaded;
        self
    }

    /// Devices loaded, savings still pending
    pub fn devices_only(mut self) -> Self {
        self.state = DataState::DevicesOnly;
        self
    }

    /// Savings reads return a provider error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn build_provider(&self) -> Arc<MemoryDataProvider> {
        let provider = match self.state {
            DataState::Loaded => MemoryDataProvider::new(self.devices.clone(), self.savings.clone()),
            DataState::DevicesOnly => MemoryDataProvider::with_devices_only(self.devices.clone()),
            DataState::Unloaded => MemoryDataProvider::unloaded(),
        };
        provider.fail_savings(self.failing);
        Arc::new(provider)
    }

    pub async fn build(self) -> Server {
        let provider: Arc<dyn DataProvider> = self.build_provider();
        Server::with_components(self.config, provider, Arc::new(FixedClock(self.now))).await
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
