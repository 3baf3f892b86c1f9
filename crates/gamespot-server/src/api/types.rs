//! Wire types. Request fields are optional so missing values surface as
//! validation errors rather than body rejections.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gamespot_relay::{ControllerStatus, RelayResponse};

use crate::booking::PowerOutcome;

#[derive(Debug, Default, Deserialize)]
pub struct BookRequest {
    pub console: Option<String>,
    /// Number or numeric string.
    pub minutes: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub console: Option<String>,
    pub minutes: Option<Value>,
    pub method: Option<String>,
    /// Base64 image, with or without a `data:image/...` prefix.
    pub photo_data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PowerRequest {
    pub console: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsoleRequest {
    pub console: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// `TEST_MODE` or `LIVE`.
    pub mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub success: bool,
    pub console: String,
    pub end_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResponse {
    pub success: bool,
    pub payment_id: i64,
    pub console: String,
    pub end_time: i64,
    pub photo_saved: bool,
    pub power_on: PowerOutcome,
    pub test_mode: bool,
}

/// Explicit power control. The relay result's fields are inlined.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerResponse {
    pub success: bool,
    /// True when this console's action was simulated.
    pub test_mode: bool,
    #[serde(flatten)]
    pub relay: RelayResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetAllResponse {
    pub success: bool,
    pub reset: u64,
    pub test_mode: bool,
    pub power_off: Vec<PowerOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub console: String,
    pub test_mode: bool,
    pub power_off: PowerOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllersResponse {
    pub timestamp: String,
    pub test_mode: bool,
    pub controllers: Vec<ControllerStatus>,
}
