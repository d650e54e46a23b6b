use crate::utils::timestamp::{
    deserialize_flexible_timestamp, deserialize_optional_flexible_timestamp,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DeviceId = i64;

/// Device as listed in the devices export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// IANA zone name, carried for display only
    pub timezone: String,
}

/// One carbon/fuel offset measurement attributed to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSavingRecord {
    pub device_id: DeviceId,
    /// UTC instant used for all range filtering and bucketing
    #[serde(deserialize_with = "deserialize_flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_timestamp")]
    pub device_timestamp: Option<DateTime<Utc>>,
    pub carbon_saved: f64,
    #[serde(alias = "fueld_saved")]
    pub fuel_saved: f64,
}
