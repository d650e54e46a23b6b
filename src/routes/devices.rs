use crate::{error::AppError, savings::DeviceWithSavings, server::Server};
use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use serde::Deserialize;

/// Create device listing routes
pub fn create_device_routes() -> Router<Server> {
    Router::new().route("/devices", get(list_devices))
}

/// Query parameters for the device listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicesQuery {
    #[serde(default)]
    pub include_savings: bool,
}

/// List all devices, optionally with their whole-history totals.
///
/// 503 while device data is still loading; 500 if any device's savings
/// cannot be resolved.
async fn list_devices(
    State(server): State<Server>,
    Query(params): Query<DevicesQuery>,
) -> Result<Json<Vec<DeviceWithSavings>>, AppError> {
    let devices = server.savings.list_devices(params.include_savings).await?;
    Ok(Json(devices))
}
