//! Device and savings record store
//!
//! The store is an injected dependency: the server and the savings service hold
//! an `Arc<dyn DataProvider>` rather than reaching for a process-wide instance.
//! A provider distinguishes "not loaded yet" (`Ok(None)`) from a failure
//! (`Err`), and hands out shared snapshots so that concurrent readers each see
//! one consistent record set.

pub mod csv_store;
pub mod entities;
pub mod memory;

pub use csv_store::CsvDataProvider;
pub use entities::{Device, DeviceId, DeviceSavingRecord};
pub use memory::MemoryDataProvider;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Data provider error types
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },
    #[error("Data provider error: {0}")]
    Provider(String),
}

pub type DataResult<T> = Result<T, DataError>;

pub type DeviceSnapshot = Arc<Vec<Device>>;
pub type SavingsSnapshot = Arc<Vec<DeviceSavingRecord>>;

/// Source of devices and raw saving records
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// All known devices, or `None` while the store is still loading
    async fn get_devices(&self) -> DataResult<Option<DeviceSnapshot>>;

    /// The full saving record set, or `None` while the store is still loading
    async fn get_device_savings(&self) -> DataResult<Option<SavingsSnapshot>>;

    /// Bumped on every successful (re)load, so derived caches can tell when
    /// their inputs changed
    fn generation(&self) -> u64;
}
