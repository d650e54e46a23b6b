use crate::{
    data::{DeviceId, DeviceSavingRecord},
    error::AppError,
    savings::{ChunkTotal, SavingsTotal, bucket_by_chunks},
    segmentation::{Resolution, SegmentError, segment_with_limit},
    server::Server,
    utils::timestamp::parse_flexible_timestamp,
};
use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::get,
};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Create per-device savings routes
pub fn create_savings_routes() -> Router<Server> {
    Router::new()
        .route("/savings/{device_id}", get(get_device_savings))
        .route("/savings/{device_id}/series", get(get_device_savings_series))
}

/// Query parameters shared by the savings endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub resolution: Option<String>,
}

/// A fully defaulted query window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavingsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resolution: Resolution,
}

impl SavingsQuery {
    /// Apply defaults: the window ends at `now` and starts `window_days` before
    /// it; an absent or unrecognized resolution means monthly chunks.
    pub fn resolve(&self, now: DateTime<Utc>, window_days: u32) -> Result<SavingsWindow, AppError> {
        let end = match &self.end_date {
            Some(raw) => parse_date_param("endDate", raw)?,
            None => now,
        };
        let start = match &self.start_date {
            Some(raw) => parse_date_param("startDate", raw)?,
            None => now
                .checked_sub_signed(Duration::days(window_days as i64))
                .ok_or_else(|| {
                    AppError::BadRequest(format!("window of {} days is too long", window_days))
                })?,
        };

        if start > end {
            return Err(SegmentError::InvalidRange { start, end }.into());
        }

        Ok(SavingsWindow {
            start,
            end,
            resolution: Resolution::from_query(self.resolution.as_deref()),
        })
    }
}

/// Dates outside years 1..=9999 are rejected; calendar units are only
/// well-defined inside that span.
fn parse_date_param(name: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    let parsed = parse_flexible_timestamp(raw)
        .ok_or_else(|| AppError::BadRequest(format!("{} '{}' is not a valid date", name, raw)))?;

    if !(1..=9999).contains(&parsed.year()) {
        return Err(AppError::BadRequest(format!(
            "{} '{}' is outside years 1 to 9999",
            name, raw
        )));
    }
    Ok(parsed)
}

/// Response for the savings endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsResponse {
    #[serde(flatten)]
    pub total: SavingsTotal,
    pub savings_data: Vec<DeviceSavingRecord>,
}

/// Response for the per-chunk series endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsSeriesResponse {
    pub resolution: Resolution,
    #[serde(flatten)]
    pub total: SavingsTotal,
    pub chunks: Vec<ChunkTotal>,
}

/// Whole-history totals plus the device's raw records inside the window
async fn get_device_savings(
    State(server): State<Server>,
    Path(device_id): Path<DeviceId>,
    Query(params): Query<SavingsQuery>,
) -> Result<Json<SavingsResponse>, AppError> {
    let window = params.resolve(server.clock.now(), server.config.savings.default_window_days)?;

    let result = server
        .savings
        .get_savings_in_range(device_id, window.start, window.end)
        .await?;

    Ok(Json(SavingsResponse {
        total: result.total,
        savings_data: result.records,
    }))
}

/// Whole-history totals plus per-chunk totals over the window
async fn get_device_savings_series(
    State(server): State<Server>,
    Path(device_id): Path<DeviceId>,
    Query(params): Query<SavingsQuery>,
) -> Result<Json<SavingsSeriesResponse>, AppError> {
    let window = params.resolve(server.clock.now(), server.config.savings.default_window_days)?;
    let chunks = segment_with_limit(
        window.start,
        window.end,
        window.resolution,
        server.config.savings.max_chunks,
    )?;

    let result = server
        .savings
        .get_savings_in_range(device_id, window.start, window.end)
        .await?;

    debug!(
        device_id,
        resolution = %window.resolution,
        chunks = chunks.len(),
        records = result.records.len(),
        "Built savings series"
    );

    Ok(Json(SavingsSeriesResponse {
        resolution: window.resolution,
        total: result.total,
        chunks: bucket_by_chunks(&result.records, &chunks),
    }))
}
