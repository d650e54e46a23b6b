use super::{SavingsConfig, SavingsError, SavingsResult, SavingsTotal, filter_records, sum_records};
use crate::cache::{CacheStats, TtlCache};
use crate::data::{DataProvider, Device, DeviceId, DeviceSavingRecord, SavingsSnapshot};
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Device totals as attached to a device listing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSavings {
    pub carbon: f64,
    pub diesel: f64,
}

impl From<SavingsTotal> for DeviceSavings {
    fn from(total: SavingsTotal) -> Self {
        Self {
            carbon: total.total_carbon,
            diesel: total.total_diesel,
        }
    }
}

/// A device, optionally extended with its whole-history totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceWithSavings {
    #[serde(flatten)]
    pub device: Device,
    #[serde(flatten)]
    pub savings: Option<DeviceSavings>,
}

/// Result of a range-scoped savings query
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSavings {
    /// Whole-history total, independent of the range
    pub total: SavingsTotal,
    /// The device's records inside the range
    pub records: Vec<DeviceSavingRecord>,
}

#[derive(Debug, Clone, Copy)]
struct CachedTotal {
    generation: u64,
    total: SavingsTotal,
}

/// Aggregates savings records served by an injected [`DataProvider`]
pub struct SavingsService {
    provider: Arc<dyn DataProvider>,
    cache: Option<TtlCache<DeviceId, CachedTotal>>,
}

impl SavingsService {
    pub fn new(provider: Arc<dyn DataProvider>, config: &SavingsConfig) -> Self {
        let cache = (config.cache_ttl_seconds > 0)
            .then(|| TtlCache::new(Duration::from_secs(config.cache_ttl_seconds)));
        Self { provider, cache }
    }

    /// Service that recomputes every total on demand
    pub fn without_cache(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            cache: None,
        }
    }

    pub fn provider(&self) -> &Arc<dyn DataProvider> {
        &self.provider
    }

    /// Whole-history carbon and fuel totals for one device.
    ///
    /// A device without records totals to zero. Fails with
    /// [`SavingsError::DataUnavailable`] while the store is loading and with
    /// [`SavingsError::Aggregation`] when the store errors.
    pub async fn get_savings_total(&self, device_id: DeviceId) -> SavingsResult<SavingsTotal> {
        let generation = self.provider.generation();
        if let Some(total) = self.cached_total(device_id, generation) {
            debug!(device_id, "Savings total served from cache");
            return Ok(total);
        }

        let records = self.snapshot().await?;
        let total = sum_records(records.iter().filter(|r| r.device_id == device_id));
        self.store_total(device_id, generation, total);

        Ok(total)
    }

    /// Whole-history total plus the device's records within `[start, end]`,
    /// both taken from the same snapshot of the store.
    pub async fn get_savings_in_range(
        &self,
        device_id: DeviceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SavingsResult<RangeSavings> {
        let generation = self.provider.generation();
        let records = self.snapshot().await?;

        let total = sum_records(records.iter().filter(|r| r.device_id == device_id));
        self.store_total(device_id, generation, total);

        Ok(RangeSavings {
            total,
            records: filter_records(&records, device_id, start, end),
        })
    }

    /// All devices, each optionally extended with its totals.
    ///
    /// Fails with [`SavingsError::DataUnavailable`] when no devices are
    /// loaded. With `include_savings`, totals are resolved concurrently and
    /// the first failure aborts the whole listing.
    pub async fn list_devices(&self, include_savings: bool) -> SavingsResult<Vec<DeviceWithSavings>> {
        let devices = self
            .provider
            .get_devices()
            .await
            .map_err(|e| SavingsError::Aggregation(e.to_string()))?
            .filter(|devices| !devices.is_empty())
            .ok_or(SavingsError::DataUnavailable)?;

        if !include_savings {
            return Ok(devices
                .iter()
                .cloned()
                .map(|device| DeviceWithSavings {
                    device,
                    savings: None,
                })
                .collect());
        }

        self.devices_with_savings(&devices).await
    }

    /// Resolve every device's total concurrently; all-or-nothing.
    pub async fn devices_with_savings(
        &self,
        devices: &[Device],
    ) -> SavingsResult<Vec<DeviceWithSavings>> {
        try_join_all(devices.iter().map(|device| async move {
            let total = self.get_savings_total(device.id).await.map_err(|e| {
                SavingsError::Aggregation(format!("device {}: {}", device.id, e))
            })?;
            Ok::<_, SavingsError>(DeviceWithSavings {
                device: device.clone(),
                savings: Some(total.into()),
            })
        }))
        .await
    }

    /// Drop every cached total
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Periodically sweep expired totals; `None` when caching is disabled
    pub fn start_cache_cleanup(&self, interval: Duration) -> Option<JoinHandle<()>> {
        self.cache
            .as_ref()
            .map(|cache| cache.start_cleanup_task(interval))
    }

    async fn snapshot(&self) -> SavingsResult<SavingsSnapshot> {
        self.provider
            .get_device_savings()
            .await
            .map_err(|e| SavingsError::Aggregation(e.to_string()))?
            .ok_or(SavingsError::DataUnavailable)
    }

    fn cached_total(&self, device_id: DeviceId, generation: u64) -> Option<SavingsTotal> {
        self.cache
            .as_ref()?
            .get_if(&device_id, |cached| cached.generation == generation)
            .map(|cached| cached.total)
    }

    fn store_total(&self, device_id: DeviceId, generation: u64, total: SavingsTotal) {
        if let Some(cache) = &self.cache {
            cache.insert(device_id, CachedTotal { generation, total });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryDataProvider;

    fn device(id: i64, name: &str, timezone: &str) -> Device {
        Device {
            id,
            name: name.to_string(),
            timezone: timezone.to_string(),
        }
    }

    fn record(device_id: i64, timestamp: &str, carbon: f64, fuel: f64) -> DeviceSavingRecord {
        DeviceSavingRecord {
            device_id,
            timestamp: timestamp.parse().unwrap(),
            device_timestamp: None,
            carbon_saved: carbon,
            fuel_saved: fuel,
        }
    }

    fn mock_devices() -> Vec<Device> {
        vec![
            device(1, "advenio", "Pacific/Chuuk"),
            device(2, "approbo", "America/Mexico_City"),
            device(3, "ventito", "America/North_Dakota/Beulah"),
            device(4, "ulterius", "Africa/Cairo"),
        ]
    }

    fn mock_savings() -> Vec<DeviceSavingRecord> {
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

    fn loaded_provider() -> Arc<MemoryDataProvider> {
        Arc::new(MemoryDataProvider::new(mock_devices(), mock_savings()))
    }

    #[tokio::test]
    async fn test_total_sums_device_records() {
        let service = SavingsService::without_cache(loaded_provider());

        let total = service.get_savings_total(1).await.unwrap();
        assert_eq!(
            total,
            SavingsTotal {
                total_carbon: 11.0,
                total_diesel: 12.0
            }
        );
    }

    #[tokio::test]
    async fn test_total_without_records_is_zero() {
        let service = SavingsService::without_cache(loaded_provider());

        let total = service.get_savings_total(42).await.unwrap();
        assert_eq!(total, SavingsTotal::default());
    }

    #[tokio::test]
    async fn test_total_unloaded_is_data_unavailable() {
        let service = SavingsService::without_cache(Arc::new(MemoryDataProvider::unloaded()));

        let err = service.get_savings_total(1).await.unwrap_err();
        assert_eq!(err, SavingsError::DataUnavailable);
    }

    #[tokio::test]
    async fn test_total_provider_error_is_aggregation_failure() {
        let provider = loaded_provider();
        provider.fail_savings(true);
        let service = SavingsService::without_cache(provider);

        let err = service.get_savings_total(1).await.unwrap_err();
        assert!(matches!(err, SavingsError::Aggregation(_)));
    }

    #[tokio::test]
    async fn test_cached_total_survives_provider_failure() {
        let provider = loaded_provider();
        let service = SavingsService::new(provider.clone(), &SavingsConfig::default());

        service.get_savings_total(1).await.unwrap();
        provider.fail_savings(true);

        let total = service.get_savings_total(1).await.unwrap();
        assert_eq!(total.total_carbon, 11.0);
        assert_eq!(service.cache_stats().unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_invalidate_cache_forces_recompute() {
        let provider = loaded_provider();
        let service = SavingsService::new(provider.clone(), &SavingsConfig::default());

        service.get_savings_total(1).await.unwrap();
        service.invalidate_cache();
        provider.fail_savings(true);

        assert!(service.get_savings_total(1).await.is_err());
    }

    #[tokio::test]
    async fn test_reload_discards_stale_totals() {
        let provider = loaded_provider();
        let service = SavingsService::new(provider.clone(), &SavingsConfig::default());

        assert_eq!(service.get_savings_total(1).await.unwrap().total_carbon, 11.0);

        provider
            .replace(mock_devices(), vec![record(1, "2023-03-01T00:00:00Z", 2.5, 1.0)])
            .await;

        let total = service.get_savings_total(1).await.unwrap();
        assert_eq!(total.total_carbon, 2.5);
        assert_eq!(total.total_diesel, 1.0);
    }

    #[tokio::test]
    async fn test_stale_generation_counts_as_miss() {
        let provider = loaded_provider();
        let service = SavingsService::new(provider.clone(), &SavingsConfig::default());

        service.get_savings_total(1).await.unwrap();
        provider
            .replace(mock_devices(), vec![record(1, "2023-03-01T00:00:00Z", 2.5, 1.0)])
            .await;
        service.get_savings_total(1).await.unwrap();

        let stats = service.cache_stats().unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);

        service.get_savings_total(1).await.unwrap();
        assert_eq!(service.cache_stats().unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_with_zero_ttl() {
        let config = SavingsConfig {
            cache_ttl_seconds: 0,
            ..SavingsConfig::default()
        };
        let service = SavingsService::new(loaded_provider(), &config);

        service.get_savings_total(1).await.unwrap();
        assert!(service.cache_stats().is_none());
        assert!(service.start_cache_cleanup(Duration::from_secs(1)).is_none());
    }

    #[tokio::test]
    async fn test_range_filters_records_but_not_total() {
        let service = SavingsService::without_cache(loaded_provider());

        let result = service
            .get_savings_in_range(
                1,
                "2023-01-15T00:00:00Z".parse().unwrap(),
                "2023-02-01T00:00:00Z".parse().unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(result.total.total_carbon, 11.0);
        assert_eq!(result.total.total_diesel, 12.0);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].carbon_saved, 10.0);
    }

    #[tokio::test]
    async fn test_list_devices_without_savings() {
        let service = SavingsService::without_cache(loaded_provider());

        let devices = service.list_devices(false).await.unwrap();

        assert_eq!(devices.len(), 4);
        assert!(devices.iter().all(|d| d.savings.is_none()));
        assert_eq!(devices[0].device, mock_devices()[0]);
    }

    #[tokio::test]
    async fn test_list_devices_with_savings() {
        let service = SavingsService::without_cache(loaded_provider());

        let devices = service.list_devices(true).await.unwrap();

        let totals: Vec<(i64, f64, f64)> = devices
            .iter()
            .map(|d| {
                let savings = d.savings.unwrap();
                (d.device.id, savings.carbon, savings.diesel)
            })
            .collect();
        assert_eq!(
            totals,
            vec![(1, 11.0, 12.0), (2, 13.0, 14.0), (3, 15.0, 16.0), (4, 17.0, 18.0)]
        );
    }

    #[tokio::test]
    async fn test_list_devices_unloaded_is_data_unavailable() {
        let service = SavingsService::without_cache(Arc::new(MemoryDataProvider::unloaded()));
        assert_eq!(
            service.list_devices(false).await.unwrap_err(),
            SavingsError::DataUnavailable
        );

        let empty = SavingsService::without_cache(Arc::new(MemoryDataProvider::new(vec![], vec![])));
        assert_eq!(
            empty.list_devices(true).await.unwrap_err(),
            SavingsError::DataUnavailable
        );
    }

    #[tokio::test]
    async fn test_list_devices_fails_fast_on_savings_error() {
        let provider = loaded_provider();
        provider.fail_savings(true);
        let service = SavingsService::without_cache(provider);

        let err = service.list_devices(true).await.unwrap_err();
        assert!(matches!(err, SavingsError::Aggregation(_)));
    }

    #[tokio::test]
    async fn test_list_devices_with_pending_savings_is_aggregation_failure() {
        let provider = Arc::new(MemoryDataProvider::with_devices_only(mock_devices()));
        let service = SavingsService::without_cache(provider);

        let err = service.list_devices(true).await.unwrap_err();
        assert!(matches!(err, SavingsError::Aggregation(_)));

        // without savings the listing still works
        assert_eq!(service.list_devices(false).await.unwrap().len(), 4);
    }

    #[test]
    fn test_device_with_savings_serialization() {
        let plain = DeviceWithSavings {
            device: device(1, "advenio", "Pacific/Chuuk"),
            savings: None,
        };
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            serde_json::json!({"id": 1, "name": "advenio", "timezone": "Pacific/Chuuk"})
        );

        let extended = DeviceWithSavings {
            savings: Some(DeviceSavings {
                carbon: 11.0,
                diesel: 12.0,
            }),
            ..plain
        };
        assert_eq!(
            serde_json::to_value(&extended).unwrap(),
            serde_json::json!({
                "id": 1,
                "name": "advenio",
                "timezone": "Pacific/Chuuk",
                "carbon": 11.0,
                "diesel": 12.0
            })
        );
    }
}
