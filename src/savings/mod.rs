//! Savings aggregation
//!
//! Sums raw per-device saving records into totals. The [`SavingsService`]
//! resolves whole-history totals (cached per device), range-filtered record
//! lists and device listings; the free functions in [`series`] are the
//! building blocks it uses and are exposed for composing per-chunk output with
//! the segmentation module.

pub mod config;
pub mod series;
pub mod service;

pub use config::SavingsConfig;
pub use series::{ChunkTotal, bucket_by_chunks, filter_records, sum_records};
pub use service::{DeviceSavings, DeviceWithSavings, RangeSavings, SavingsService};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Savings aggregation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SavingsError {
    /// The record store has not finished loading; retry later
    #[error("Savings data has not been loaded yet")]
    DataUnavailable,
    /// The record store failed while serving the request
    #[error("Failed to aggregate savings: {0}")]
    Aggregation(String),
}

pub type SavingsResult<T> = Result<T, SavingsError>;

/// Carbon and fuel totals over a set of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsTotal {
    pub total_carbon: f64,
    pub total_diesel: f64,
}
