use super::{
    DataError, DataProvider, DataResult, Device, DeviceSavingRecord, DeviceSnapshot,
    SavingsSnapshot,
};
use crate::config::DataConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Size and modification time of a CSV file at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn read(path: &Path) -> DataResult<Self> {
        let metadata = std::fs::metadata(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

#[derive(Clone)]
struct LoadedData {
    devices: DeviceSnapshot,
    savings: SavingsSnapshot,
    stamps: (FileStamp, FileStamp),
}

/// CSV-backed store.
///
/// Starts empty; [`CsvDataProvider::load`] reads both files and swaps the
/// snapshot in atomically. Until the first load completes every read returns
/// `Ok(None)`. [`CsvDataProvider::start_reload_task`] keeps retrying a failed
/// load and picks up files that change on disk.
///
/// # Expected CSV structure
/// ```csv
/// id,name,timezone
/// 1,advenio,Pacific/Chuuk
/// ```
/// ```csv
/// device_id,timestamp,device_timestamp,carbon_saved,fuel_saved
/// 1,2023-01-01T00:00:00Z,2023-01-01T10:00:00,1.5,2.0
/// ```
pub struct CsvDataProvider {
    devices_path: PathBuf,
    savings_path: PathBuf,
    state: RwLock<Option<LoadedData>>,
    generation: AtomicU64,
}

impl CsvDataProvider {
    pub fn new(devices_path: impl Into<PathBuf>, savings_path: impl Into<PathBuf>) -> Self {
        Self {
            devices_path: devices_path.into(),
            savings_path: savings_path.into(),
            state: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(&config.devices_path, &config.savings_path)
    }

    /// Read both files and publish them as the current snapshot.
    ///
    /// A failed load leaves any previously loaded snapshot in place.
    pub async fn load(&self) -> DataResult<()> {
        let devices_path = self.devices_path.clone();
        let savings_path = self.savings_path.clone();

        let (devices, savings, stamps) = tokio::task::spawn_blocking(move || {
            let stamps = (FileStamp::read(&devices_path)?, FileStamp::read(&savings_path)?);
            let devices: Vec<Device> = read_csv(&devices_path)?;
            let savings: Vec<DeviceSavingRecord> = read_csv(&savings_path)?;
            Ok::<_, DataError>((devices, savings, stamps))
        })
        .await
        .map_err(|e| DataError::Provider(format!("CSV load task failed: {}", e)))??;

        info!(
            devices = devices.len(),
            records = savings.len(),
            "Loaded device savings data"
        );

        let mut state = self.state.write().await;
        *state = Some(LoadedData {
            devices: Arc::new(devices),
            savings: Arc::new(savings),
            stamps,
        });
        self.generation.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    /// Load when nothing is loaded yet or either file changed since the last
    /// successful load. Returns whether a new snapshot was published.
    pub async fn load_if_changed(&self) -> DataResult<bool> {
        let devices_path = self.devices_path.clone();
        let savings_path = self.savings_path.clone();

        let current = tokio::task::spawn_blocking(move || {
            Ok::<_, DataError>((FileStamp::read(&devices_path)?, FileStamp::read(&savings_path)?))
        })
        .await
        .map_err(|e| DataError::Provider(format!("CSV stat task failed: {}", e)))??;

        if let Some(loaded) = self.state.read().await.as_ref() {
            if loaded.stamps == current {
                return Ok(false);
            }
        }

        self.load().await?;
        Ok(true)
    }

    /// Load now, then re-check the files every `interval`.
    ///
    /// Failures are logged and retried on the next tick. A zero interval
    /// makes a single attempt.
    pub fn start_reload_task(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.load_if_changed().await {
                    Ok(true) => debug!("Device savings snapshot refreshed"),
                    Ok(false) => debug!("Device savings files unchanged"),
                    Err(e) => warn!("Failed to load device savings data: {}", e),
                }

                if interval.is_zero() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        })
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_some()
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> DataResult<Vec<T>> {
    let path_str = path.display().to_string();
    debug!(path = %path_str, "Reading CSV file");

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(source) => DataError::Io {
                path: path_str.clone(),
                source,
            },
            other => DataError::Csv {
                path: path_str.clone(),
                message: format!("{:?}", other),
            },
        })?;

    reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|e| DataError::Csv {
                path: path_str.clone(),
                // header is line 1
                message: format!("line {}: {}", index + 2, e),
            })
        })
        .collect()
}

#[async_trait]
impl DataProvider for CsvDataProvider {
    async fn get_devices(&self) -> DataResult<Option<DeviceSnapshot>> {
        Ok(self.state.read().await.as_ref().map(|s| s.devices.clone()))
    }

    async fn get_device_savings(&self) -> DataResult<Option<SavingsSnapshot>> {
        Ok(self.state.read().await.as_ref().map(|s| s.savings.clone()))
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
