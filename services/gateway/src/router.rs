use crate::handlers::{market, orders};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(orders::create_order))
        .route(
            "/orders/:id",
            get(orders::get_order).delete(orders::cancel_order),
        )
        .route("/trades", get(market::get_trades))
        .route("/orderbook", get(market::get_order_book))
        .route("/health", get(market::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
