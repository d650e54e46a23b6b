use crate::data::DataProvider;
use crate::savings::SavingsService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
    pub duration_ms: Option<u64>,
}

impl HealthCheckResult {
    pub fn healthy_with_details(details: serde_json::Value) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: None,
            details: Some(details),
            duration_ms: None,
        }
    }

    pub fn degraded(message: String) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: Some(message),
            details: None,
            duration_ms: None,
        }
    }

    pub fn unhealthy(message: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message),
            details: None,
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// The name of this health check component
    fn name(&self) -> &str;

    /// Perform the health check
    async fn check(&self) -> HealthCheckResult;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallHealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub checks: HashMap<String, HealthCheckResult>,
}

pub struct HealthService {
    checkers: RwLock<HashMap<String, Arc<dyn HealthChecker>>>,
}

impl HealthService {
    pub fn new() -> Self {
        Self {
            checkers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a health checker for a specific component
    pub async fn register(&self, checker: Arc<dyn HealthChecker>) {
        let name = checker.name().to_string();
        self.checkers.write().await.insert(name, checker);
    }

    /// Run all health checks (`"all"`), a single named one, or none
    pub async fn check_health(&self, filter: Option<&str>) -> OverallHealthResponse {
        let checkers = self.checkers.read().await;
        let mut results = HashMap::new();

        let checks_to_run: Vec<_> = match filter {
            Some("all") => checkers.iter().collect(),
            Some(specific) => checkers
                .iter()
                .filter(|(name, _)| name.as_str() == specific)
                .collect(),
            None => vec![],
        };

        for (name, checker) in checks_to_run {
            let start = Instant::now();
            let result = checker.check().await;
            results.insert(
                name.clone(),
                result.with_duration(start.elapsed().as_millis() as u64),
            );
        }

        // worst status wins
        let status = results
            .values()
            .map(|r| r.status)
            .fold(HealthStatus::Healthy, |acc, status| match (acc, status) {
                (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => {
                    HealthStatus::Unhealthy
                }
                (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
                _ => HealthStatus::Healthy,
            });

        OverallHealthResponse {
            status,
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks: results,
        }
    }

    pub async fn get_registered_checkers(&self) -> Vec<String> {
        self.checkers.read().await.keys().cloned().collect()
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports whether the data provider has finished loading
pub struct DataProviderHealthChecker {
    provider: Arc<dyn DataProvider>,
}

impl DataProviderHealthChecker {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl HealthChecker for DataProviderHealthChecker {
    fn name(&self) -> &str {
        "data"
    }

    async fn check(&self) -> HealthCheckResult {
        let devices = self.provider.get_devices().await;
        let savings = self.provider.get_device_savings().await;

        match (devices, savings) {
            (Ok(Some(devices)), Ok(Some(savings))) => HealthCheckResult::healthy_with_details(json!({
                "devices": devices.len(),
                "records": savings.len(),
                "generation": self.provider.generation(),
            })),
            (Err(e), _) | (_, Err(e)) => HealthCheckResult::unhealthy(e.to_string()),
            _ => HealthCheckResult::degraded("Data has not been loaded yet".to_string()),
        }
    }
}

/// Exposes savings cache counters
pub struct SavingsCacheHealthChecker {
    savings: Arc<SavingsService>,
}

impl SavingsCacheHealthChecker {
    pub fn new(savings: Arc<SavingsService>) -> Self {
        Self { savings }
    }
}

#[async_trait]
impl HealthChecker for SavingsCacheHealthChecker {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> HealthCheckResult {
        match self.savings.cache_stats() {
            Some(stats) => HealthCheckResult::healthy_with_details(json!({
                "enabled": true,
                "entries": stats.entries,
                "hits": stats.hits,
                "misses": stats.misses,
            })),
            None => HealthCheckResult::healthy_with_details(json!({ "enabled": false })),
        }
    }
}
