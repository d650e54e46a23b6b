use super::{
    DataError, DataProvider, DataResult, Device, DeviceSavingRecord, DeviceSnapshot,
    SavingsSnapshot,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory store, used by tests and tooling.
///
/// Either collection may be left unset to simulate a store that has not
/// finished loading, and [`MemoryDataProvider::fail_savings`] makes savings
/// reads return an error.
pub struct MemoryDataProvider {
    devices: RwLock<Option<DeviceSnapshot>>,
    savings: RwLock<Option<SavingsSnapshot>>,
    fail_savings: AtomicBool,
    generation: AtomicU64,
}

impl MemoryDataProvider {
    /// Provider with nothing loaded yet
    pub fn unloaded() -> Self {
        Self {
            devices: RwLock::new(None),
            savings: RwLock::new(None),
            fail_savings: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn new(devices: Vec<Device>, savings: Vec<DeviceSavingRecord>) -> Self {
        Self {
            devices: RwLock::new(Some(Arc::new(devices))),
            savings: RwLock::new(Some(Arc::new(savings))),
            fail_savings: AtomicBool::new(false),
            generation: AtomicU64::new(1),
        }
    }

    /// Devices loaded, savings still pending
    pub fn with_devices_only(devices: Vec<Device>) -> Self {
        Self {
            devices: RwLock::new(Some(Arc::new(devices))),
            ..Self::unloaded()
        }
    }

    /// Replace the whole data set, as a reload would
    pub async fn replace(&self, devices: Vec<Device>, savings: Vec<DeviceSavingRecord>) {
        *self.devices.write().await = Some(Arc::new(devices));
        *self.savings.write().await = Some(Arc::new(savings));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Make subsequent savings reads fail
    pub fn fail_savings(&self, fail: bool) {
        self.fail_savings.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryDataProvider {
    fn default() -> Self {
        Self::unloaded()
    }
}

#[async_trait]
impl DataProvider for MemoryDataProvider {
    async fn get_devices(&self) -> DataResult<Option<DeviceSnapshot>> {
        Ok(self.devices.read().await.clone())
    }

    async fn get_device_savings(&self) -> DataResult<Option<SavingsSnapshot>> {
        if self.fail_savings.load(Ordering::SeqCst) {
            return Err(DataError::Provider(
                "Unable to retrieve savings data.".to_string(),
            ));
        }
        Ok(self.savings.read().await.clone())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: i64) -> Device {
        Device {
            id,
            name: format!("device-{id}"),
            timezone: "UTC".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unloaded_returns_none() {
        let provider = MemoryDataProvider::unloaded();
        assert!(provider.get_devices().await.unwrap().is_none());
        assert!(provider.get_device_savings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_devices_only() {
        let provider = MemoryDataProvider::with_devices_only(vec![device(1)]);
        assert_eq!(provider.get_devices().await.unwrap().unwrap().len(), 1);
        assert!(provider.get_device_savings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_savings_toggle() {
        let provider = MemoryDataProvider::new(vec![device(1)], vec![]);

        provider.fail_savings(true);
        assert!(provider.get_device_savings().await.is_err());

        provider.fail_savings(false);
        assert!(provider.get_device_savings().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replace_bumps_generation() {
        let provider = MemoryDataProvider::new(vec![], vec![]);
        let before = provider.generation();

        provider.replace(vec![device(1), device(2)], vec![]).await;

        assert_eq!(provider.generation(), before + 1);
        assert_eq!(provider.get_devices().await.unwrap().unwrap().len(), 2);
    }
}
