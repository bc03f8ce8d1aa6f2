use std::path::Path;

use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

/// Admin Router Module
///
/// Back-office pages and data endpoints, relative to `/mall/admin`. Apart from
/// the login/logout entry points, the category listing and the product images,
/// everything here redirects to `/mall/admin/toLogin.html` until the session
/// carries the `login_user` key.
pub fn admin_routes(static_dir: &Path) -> Router<AppState> {
    Router::new()
        // Entry points on the allow-list.
        .route("/toLogin.html", get(handlers::admin_login_page))
        .route("/login.do", post(handlers::admin_login))
        .route("/logout.do", get(handlers::admin_logout))
        // Gated pages.
        .route("/toIndex.html", get(handlers::admin_index_page))
        .route("/product/toList.html", get(handlers::admin_product_list_page))
        .route("/product/toAdd.html", get(handlers::admin_product_add_page))
        .route("/product/toEdit.html", get(handlers::admin_product_edit_page))
        .route("/user/toList.html", get(handlers::admin_user_list_page))
        .route("/user/toEdit.html", get(handlers::admin_user_edit_page))
        .route("/order/toList.html", get(handlers::admin_order_list_page))
        .route(
            "/classification/toList.html",
            get(handlers::admin_classification_list_page),
        )
        .route(
            "/classification/toAdd.html",
            get(handlers::admin_classification_add_page),
        )
        .route(
            "/classification/toEdit.html",
            get(handlers::admin_classification_edit_page),
        )
        // Shoppers.
        .route("/user/list.do", get(handlers::list_users))
        .route("/user/getTotal.do", get(handlers::count_users))
        .route("/user/update.do", post(handlers::update_user))
        .route("/user/del.do", get(handlers::delete_user))
        // Catalog.
        .route("/product/list.do", get(handlers::admin_list_products))
        .route("/product/getTotal.do", get(handlers::count_products))
        .route("/product/add.do", post(handlers::add_product))
        .route("/product/update.do", post(handlers::update_product))
        .route("/product/del.do", get(handlers::delete_product))
        // Categories. list.do matches the public "classification/list.do" rule.
        .route(
            "/classification/list.do",
            get(handlers::admin_list_classifications),
        )
        .route(
            "/classification/getTotal.do",
            get(handlers::count_classifications),
        )
        .route("/classification/add.do", post(handlers::add_classification))
        .route(
            "/classification/update.do",
            post(handlers::update_classification),
        )
        .route("/classification/del.do", get(handlers::delete_classification))
        // Orders.
        .route("/order/list.do", get(handlers::admin_list_orders))
        .route("/order/getTotal.do", get(handlers::count_orders))
        .route("/order/getDetail.do", get(handlers::admin_order_detail))
        .route("/order/send.do", get(handlers::ship_order))
        // GET /product/img/{file}: product pictures, allow-listed for the storefront.
        .nest_service("/product/img", ServeDir::new(static_dir.join("img")))
}
