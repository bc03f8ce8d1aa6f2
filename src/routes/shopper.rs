use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Shopper Router Module
///
/// Front-office pages and actions that redirect to `/mall/user/toLogin.html`
/// until the session carries the `user` key.
pub fn shopper_routes() -> Router<AppState> {
    Router::new()
        // GET /order/toList.html: the shopper's own orders.
        .route("/order/toList.html", get(handlers::order_list_page))
        .route("/order/list.do", get(handlers::list_orders))
        .route("/order/getDetail.do", get(handlers::order_detail))
        // POST /order/submit.do: checkout of the session cart.
        .route("/order/submit.do", post(handlers::submit_order))
        // Simulated payment and delivery confirmation.
        .route("/order/pay.do", get(handlers::pay_order))
        .route("/order/receive.do", get(handlers::receive_order))
}
