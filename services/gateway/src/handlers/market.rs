use crate::error::ApiError;
use crate::models::{OrderBookLevel, OrderBookQuery, OrderBookResponse, TradeResponse, TradesQuery};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

const DEFAULT_TRADE_LIMIT: usize = 100;
const DEFAULT_BOOK_DEPTH: usize = 10;

pub async fn get_trades(
    State(state): State<AppState>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<TradeResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_TRADE_LIMIT);
    let trades = state.engine.get_trades(&query.symbol, limit)?;
    Ok(Json(TradeResponse { trades }))
}

pub async fn get_order_book(
    State(state): State<AppState>,
    Query(query): Query<OrderBookQuery>,
) -> Result<Json<OrderBookResponse>, ApiError> {
    let depth = query.depth.unwrap_or(DEFAULT_BOOK_DEPTH);
    let (bids, asks) = state.engine.top_of_book(&query.symbol, depth)?;

    let to_levels = |levels: Vec<(types::numeric::Price, types::numeric::Quantity)>| {
        levels
            .into_iter()
            .map(|(price, quantity)| OrderBookLevel { price, quantity })
            .collect()
    };

    Ok(Json(OrderBookResponse {
        symbol: query.symbol,
        bids: to_levels(bids),
        asks: to_levels(asks),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
