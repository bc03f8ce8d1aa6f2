use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints the gatekeeper lets through without a login. Paths are relative to
/// the `/mall` context path.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET / and /index.html: storefront home.
        .route("/", get(handlers::index_page))
        .route("/index.html", get(handlers::index_page))
        // Shopper account pages and actions.
        .route("/user/toLogin.html", get(handlers::user_login_page))
        .route("/user/toRegister.html", get(handlers::user_register_page))
        .route("/user/error.html", get(handlers::error_page))
        .route("/user/login.do", post(handlers::user_login))
        .route("/user/register.do", post(handlers::user_register))
        .route("/user/logout.do", get(handlers::user_logout))
        // GET /user/checkUsername.do?username=
        // Ajax check from the registration form.
        .route("/user/checkUsername.do", get(handlers::check_username))
        // Catalog browsing.
        .route("/classification/list.do", get(handlers::list_classifications))
        .route("/product/hot.do", get(handlers::hot_products))
        .route("/product/new.do", get(handlers::new_products))
        .route("/product/get.do", get(handlers::get_product))
        .route("/product/get.html", get(handlers::product_page))
        .route("/product/category.html", get(handlers::category_page))
        .route("/product/category.do", get(handlers::category_products))
        .route("/product/categorySec.do", get(handlers::sub_category_products))
        .route("/product/getCategorySec.do", get(handlers::sub_categories))
        // The cart lives under /product/ and is therefore public; the cart is
        // kept in the session, so it fills up before login too.
        .route("/product/toCart.html", get(handlers::cart_page))
        .route("/product/addCart.do", get(handlers::add_to_cart))
        .route("/product/delCart.do", get(handlers::remove_from_cart))
        .route("/product/listCart.do", get(handlers::list_cart))
}
