//! Route handlers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use gamespot_core::time::rfc3339_now;

use super::AppState;
use super::error::ApiResult;
use super::types::{
    BookRequest, BookResponse, ConsoleRequest, ControllersResponse, HealthResponse, PayRequest,
    PayResponse, PowerRequest, PowerResponse, ResetAllResponse, ResetResponse,
};
use crate::booking::{ConsoleStatus, PaymentRequest, validate};
use crate::storage::{ColumnInfo, PaymentRecord};

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: rfc3339_now(),
        mode: if state.engine.test_mode() {
            "TEST_MODE"
        } else {
            "LIVE"
        },
    })
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<Vec<ConsoleStatus>>> {
    Ok(Json(state.engine.status().await?))
}

/// `POST /api/book`
pub async fn book(
    State(state): State<AppState>,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> ApiResult<Json<BookResponse>> {
    let Json(req) = body?;
    let console = validate::console_name(req.console.as_deref())?;
    let minutes = validate::minutes(req.minutes.as_ref())?;

    let booking = state.engine.book(console, minutes).await?;
    Ok(Json(BookResponse {
        success: true,
        console: booking.console,
        end_time: booking.end_time,
    }))
}

/// `POST /api/pay`
pub async fn pay(
    State(state): State<AppState>,
    body: Result<Json<PayRequest>, JsonRejection>,
) -> ApiResult<Json<PayResponse>> {
    let Json(req) = body?;
    let console = validate::console_name(req.console.as_deref())?;
    let minutes = validate::minutes(req.minutes.as_ref())?;
    let method = validate::method(req.method.as_deref())?;

    let payment = state
        .engine
        .pay(PaymentRequest {
            console,
            minutes,
            method,
            photo: req.photo_data.as_deref(),
        })
        .await?;
    Ok(Json(PayResponse {
        success: true,
        payment_id: payment.payment_id,
        console: payment.console,
        end_time: payment.end_time,
        photo_saved: payment.photo_saved,
        power_on: payment.power_on,
        test_mode: state.engine.test_mode(),
    }))
}

/// `POST /api/power-control`
pub async fn power_control(
    State(state): State<AppState>,
    body: Result<Json<PowerRequest>, JsonRejection>,
) -> ApiResult<Json<PowerResponse>> {
    let Json(req) = body?;
    let console = validate::console_name(req.console.as_deref())?;
    let action = validate::action(req.action.as_deref())?;

    let relay = state.engine.power(console, action).await?;
    Ok(Json(PowerResponse {
        success: true,
        test_mode: relay.simulated,
        relay,
    }))
}

/// `GET /api/payments`
pub async fn payments(State(state): State<AppState>) -> ApiResult<Json<Vec<PaymentRecord>>> {
    Ok(Json(state.engine.payments().await?))
}

/// `POST /api/reset`
pub async fn reset_all(State(state): State<AppState>) -> ApiResult<Json<ResetAllResponse>> {
    let result = state.engine.reset_all().await?;
    Ok(Json(ResetAllResponse {
        success: true,
        reset: result.reset,
        test_mode: state.engine.test_mode(),
        power_off: result.power_off,
    }))
}

/// `POST /api/reset-single`
pub async fn reset_single(
    State(state): State<AppState>,
    body: Result<Json<ConsoleRequest>, JsonRejection>,
) -> ApiResult<Json<ResetResponse>> {
    let Json(req) = body?;
    let console = validate::console_name(req.console.as_deref())?;

    let reset = state.engine.reset(console).await?;
    Ok(Json(ResetResponse {
        success: true,
        console: reset.console,
        test_mode: state.engine.test_mode(),
        power_off: reset.power_off,
    }))
}

/// `GET /api/esp32-status`
pub async fn controllers(State(state): State<AppState>) -> Json<ControllersResponse> {
    let controllers = state.engine.controllers().await;
    Json(ControllersResponse {
        timestamp: rfc3339_now(),
        test_mode: state.engine.test_mode(),
        controllers,
    })
}

/// `GET /api/debug/tables`
pub async fn debug_tables(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, Vec<ColumnInfo>>>> {
    Ok(Json(state.engine.table_info().await?))
}
