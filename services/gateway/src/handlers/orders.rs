use crate::error::ApiError;
use crate::models::{CancelOrderResponse, CreateOrderResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use types::errors::EngineError;
use types::ids::OrderId;
use types::order::Order;
use types::requests::CreateOrderRequest;

pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    req.validate()?;

    tracing::info!(
        symbol = %req.symbol,
        side = ?req.side,
        order_type = ?req.order_type,
        quantity = %req.quantity,
        "processing order"
    );

    // Placement blocks on the symbol lock and the store; keep it off the
    // async workers.
    let engine = state.engine.clone();
    let (order, trades) = tokio::task::spawn_blocking(move || engine.place_order(&req))
        .await
        .map_err(|err| EngineError::Fatal(format!("placement task failed: {err}")))??;

    tracing::info!(order_id = %order.id, status = ?order.status, trades = trades.len(), "order processed");

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id,
            status: order.status,
            trades,
            message: "order processed successfully".to_string(),
        }),
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, ApiError> {
    let order = state.engine.get_order(OrderId::new(id))?;
    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
    let engine = state.engine.clone();
    let order = tokio::task::spawn_blocking(move || engine.cancel_order(OrderId::new(id)))
        .await
        .map_err(|err| EngineError::Fatal(format!("cancel task failed: {err}")))??;

    tracing::info!(order_id = %order.id, "order canceled");

    Ok(Json(CancelOrderResponse {
        order_id: order.id,
        status: order.status,
        message: "order canceled successfully".to_string(),
    }))
}
