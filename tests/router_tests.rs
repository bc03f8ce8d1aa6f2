use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, Response, StatusCode,
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
};
use async_trait::async_trait;
use mall_gate::{
    AppConfig, AppState, MemoryRepository, RepositoryState, create_router,
    models::{Classification, Order, OrderItem, Product, ResultBean, User},
    repository::seed_demo_catalog,
    session_layer,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::util::ServiceExt;
use tower_sessions::{
    SessionManagerLayer, SessionStore,
    session::{Id, Record},
    session_store,
};

// --- Harness ---

async fn seeded_state() -> AppState {
    let config = AppConfig::default();
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    repo.create_admin("admin", "admin-pass").await.unwrap();
    seed_demo_catalog(repo.as_ref()).await;
    AppState::new(repo, config).unwrap()
}

async fn spawn_app() -> Router {
    let state = seeded_state().await;
    let sessions = session_layer(&state.config);
    create_router(state, sessions)
}

/// A session backend that is down: every read and write fails.
#[derive(Clone, Debug)]
struct UnreachableStore;

#[async_trait]
impl SessionStore for UnreachableStore {
    async fn save(&self, _record: &Record) -> session_store::Result<()> {
        Err(session_store::Error::Backend("store unreachable".to_string()))
    }

    async fn load(&self, _id: &Id) -> session_store::Result<Option<Record>> {
        Err(session_store::Error::Backend("store unreachable".to_string()))
    }

    async fn delete(&self, _id: &Id) -> session_store::Result<()> {
        Err(session_store::Error::Backend("store unreachable".to_string()))
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

/// `name=value` part of the session cookie set by the response.
fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("response should set the session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// GETs `uri` and returns the data of the successful `ResultBean` it answers with.
async fn get_data<T: DeserializeOwned>(app: &Router, uri: &str, cookie: Option<&str>) -> T {
    bean_data(send(app, get(uri, cookie)).await).await
}

/// Reads a successful `ResultBean` body and returns its data.
async fn bean_data<T: DeserializeOwned>(response: Response<Body>) -> T {
    assert_eq!(response.status(), StatusCode::OK);
    let bean: ResultBean<T> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(bean.state, ResultBean::<()>::SUCCESS);
    bean.data.unwrap()
}

fn assert_fixed_headers(response: &Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, GET, OPTIONS, DELETE");
    assert_eq!(headers["access-control-max-age"], "3600");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Origin, X-Requested-With, Content-Type, Accept, X-Custom-Header"
    );
    assert_eq!(headers["x-powered-by"], "axum");
}

async fn register_shopper(app: &Router, username: &str) {
    let form = format!("username={username}&password=pw-{username}&name=Test&email=t%40t.com");
    let response = send(app, post_form("/mall/user/register.do", &form, None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/user/toLogin.html"));
}

/// Logs in within the session behind `cookie` (or a fresh one) and returns the
/// rotated session cookie.
async fn login_shopper(app: &Router, username: &str, cookie: Option<&str>) -> String {
    let form = format!("username={username}&password=pw-{username}");
    let response = send(app, post_form("/mall/user/login.do", &form, cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/index.html"));
    session_cookie(&response)
}

async fn register_and_login_shopper(app: &Router, username: &str) -> String {
    register_shopper(app, username).await;
    login_shopper(app, username, None).await
}

async fn login_admin(app: &Router) -> String {
    let response = send(
        app,
        post_form("/mall/admin/login.do", "username=admin&password=admin-pass", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/toIndex.html"));
    session_cookie(&response)
}

// --- Gate outcomes over HTTP ---

#[tokio::test]
async fn test_admin_page_redirects_without_login() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/admin/product/toList.html", None)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/toLogin.html"));
    assert_fixed_headers(&response);
    assert!(!body_string(response).await.contains("admin/product/list"));
}

#[tokio::test]
async fn test_public_login_page_renders_without_session() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/user/toLogin.html", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_fixed_headers(&response);
    assert!(body_string(response).await.contains("data-view=\"mall/user/login\""));
}

#[tokio::test]
async fn test_order_page_redirects_to_shopper_login() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/order/toList.html", None)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/user/toLogin.html"));
    assert_fixed_headers(&response);
}

#[tokio::test]
async fn test_preflight_returns_empty_json() {
    let app = spawn_app().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/mall/admin/user/list.do")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json; charset=utf-8");
    assert!(response.headers().get(LOCATION).is_none());
    assert_fixed_headers(&response);
    assert_eq!(body_string(response).await, "{}");
}

#[tokio::test]
async fn test_static_asset_bypasses_gate() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/static/app.js", None)).await;

    // No such file on disk; the point is that it reached the file service.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(LOCATION).is_none());
    assert_fixed_headers(&response);
}

#[tokio::test]
async fn test_unknown_actionable_path_is_gated_before_fallback() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/nowhere.html", None)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/user/toLogin.html"));
}

#[tokio::test]
async fn test_handler_responses_carry_fixed_headers() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/product/hot.do", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_fixed_headers(&response);
    let bean: ResultBean<Vec<Product>> =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(bean.state, ResultBean::<()>::SUCCESS);
    assert_eq!(bean.data.unwrap().len(), 1);
}

// --- Login flows ---

#[tokio::test]
async fn test_shopper_login_opens_orders_until_logout() {
    let app = spawn_app().await;
    let cookie = register_and_login_shopper(&app, "alice").await;

    let response = send(&app, get("/mall/order/toList.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("mall/order/list"));

    let response = send(&app, get("/mall/user/logout.do", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/index.html"));

    let response = send(&app, get("/mall/order/toList.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/user/toLogin.html"));
}

#[tokio::test]
async fn test_shopper_session_does_not_open_back_office() {
    let app = spawn_app().await;
    let cookie = register_and_login_shopper(&app, "bob").await;

    let response = send(&app, get("/mall/admin/toIndex.html", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/toLogin.html"));
}

#[tokio::test]
async fn test_admin_login_opens_back_office() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = send(&app, get("/mall/admin/product/toList.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_fixed_headers(&response);
    assert!(body_string(response).await.contains("admin/product/list"));

    register_and_login_shopper(&app, "carol").await;
    let response = send(&app, get("/mall/admin/user/list.do", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bean: ResultBean<Vec<User>> = serde_json::from_str(&body_string(response).await).unwrap();
    let users = bean.data.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "carol");
}

#[tokio::test]
async fn test_admin_logout_closes_back_office() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = send(&app, get("/mall/admin/logout.do", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/toLogin.html"));

    let response = send(&app, get("/mall/admin/toIndex.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/toLogin.html"));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = spawn_app().await;

    let response = send(
        &app,
        post_form("/mall/admin/login.do", "username=admin&password=nope", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let bean: ResultBean<()> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(bean.state, ResultBean::<()>::FAIL);
}

// --- Registration helpers ---

#[tokio::test]
async fn test_check_username_reports_taken_names() {
    let app = spawn_app().await;
    register_and_login_shopper(&app, "dave").await;

    let response = send(&app, get("/mall/user/checkUsername.do?username=dave", None)).await;
    let bean: ResultBean<bool> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(bean.data, Some(false));

    let response = send(&app, get("/mall/user/checkUsername.do?username=erin", None)).await;
    let bean: ResultBean<bool> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(bean.data, Some(true));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;
    register_and_login_shopper(&app, "frank").await;

    let response = send(
        &app,
        post_form("/mall/user/register.do", "username=frank&password=x", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/product/get.do?id=404", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_fixed_headers(&response);
}

#[tokio::test]
async fn test_session_store_failure_redirects_guarded_paths() {
    let state = seeded_state().await;
    let app = create_router(state, SessionManagerLayer::new(UnreachableStore));
    // A well-formed session id makes the session layer consult the store.
    let cookie = format!("id={}", Id::default());

    let response = send(&app, get("/mall/order/toList.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/user/toLogin.html"));
    assert_fixed_headers(&response);

    let response = send(&app, get("/mall/admin/toIndex.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/toLogin.html"));
    assert_fixed_headers(&response);

    // Public paths never touch the store.
    let response = send(&app, get("/mall/product/hot.do", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Cart and checkout ---

#[tokio::test]
async fn test_cart_is_public_but_checkout_is_gated() {
    let app = spawn_app().await;

    let response = send(&app, get("/mall/product/addCart.do?productId=1", None)).await;
    assert!(response.headers().get(LOCATION).is_none());
    assert_fixed_headers(&response);
    let cookie = session_cookie(&response);
    assert!(bean_data::<bool>(response).await);

    let response = send(
        &app,
        post_form("/mall/order/submit.do", "name=Anon&addr=Nowhere", Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/user/toLogin.html"));
}

#[tokio::test]
async fn test_anonymous_cart_survives_login() {
    let app = spawn_app().await;
    register_shopper(&app, "gina").await;

    let response = send(&app, get("/mall/product/addCart.do?productId=2", None)).await;
    let anonymous = session_cookie(&response);

    let cookie = login_shopper(&app, "gina", Some(&anonymous)).await;
    assert_ne!(cookie, anonymous);

    let lines: Vec<OrderItem> = get_data(&app, "/mall/product/listCart.do", Some(&cookie)).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, 2);
}

#[tokio::test]
async fn test_adding_unknown_product_is_not_found() {
    let app = spawn_app().await;
    let response = send(&app, get("/mall/product/addCart.do?productId=99", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_lifecycle_from_cart_to_receipt() {
    let app = spawn_app().await;
    let cookie = register_and_login_shopper(&app, "hank").await;

    for product_id in [1, 1, 2] {
        let uri = format!("/mall/product/addCart.do?productId={product_id}");
        assert!(get_data::<bool>(&app, &uri, Some(&cookie)).await);
    }
    let removed: bool = get_data(&app, "/mall/product/delCart.do?productId=2", Some(&cookie)).await;
    assert!(removed);
    send(&app, get("/mall/product/addCart.do?productId=2", Some(&cookie))).await;

    let lines: Vec<OrderItem> = get_data(&app, "/mall/product/listCart.do", Some(&cookie)).await;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].count, 2);

    let response = send(
        &app,
        post_form(
            "/mall/order/submit.do",
            "name=Hank&phone=555&addr=1+Main+St",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/order/toList.html"));

    let orders: Vec<Order> = get_data(&app, "/mall/order/list.do", Some(&cookie)).await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.total, 90.5);
    assert_eq!(order.addr, "1 Main St");
    assert_eq!(order.state, Order::STATE_UNPAID);

    let cart: Vec<OrderItem> = get_data(&app, "/mall/product/listCart.do", Some(&cookie)).await;
    assert!(cart.is_empty());

    let detail_uri = format!("/mall/order/getDetail.do?orderId={}", order.id);
    let items: Vec<OrderItem> = get_data(&app, &detail_uri, Some(&cookie)).await;
    assert_eq!(items.len(), 2);

    // Receipt before shipment is out of order.
    let receive_uri = format!("/mall/order/receive.do?orderId={}", order.id);
    let response = send(&app, get(&receive_uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let pay_uri = format!("/mall/order/pay.do?orderId={}", order.id);
    assert!(get_data::<bool>(&app, &pay_uri, Some(&cookie)).await);
    let response = send(&app, get(&pay_uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let admin = login_admin(&app).await;
    let send_uri = format!("/mall/admin/order/send.do?id={}", order.id);
    assert!(get_data::<bool>(&app, &send_uri, Some(&admin)).await);

    assert!(get_data::<bool>(&app, &receive_uri, Some(&cookie)).await);
    let orders: Vec<Order> = get_data(&app, "/mall/admin/order/list.do", Some(&admin)).await;
    assert_eq!(orders[0].state, Order::STATE_COMPLETE);
}

#[tokio::test]
async fn test_empty_cart_checkout_is_rejected() {
    let app = spawn_app().await;
    let cookie = register_and_login_shopper(&app, "iris").await;

    let response = send(
        &app,
        post_form("/mall/order/submit.do", "name=Iris&addr=Here", Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shoppers_cannot_read_each_others_orders() {
    let app = spawn_app().await;
    let owner = register_and_login_shopper(&app, "jane").await;
    send(&app, get("/mall/product/addCart.do?productId=1", Some(&owner))).await;
    send(
        &app,
        post_form("/mall/order/submit.do", "name=Jane&addr=Here", Some(&owner)),
    )
    .await;

    let other = register_and_login_shopper(&app, "karl").await;
    let response = send(&app, get("/mall/order/getDetail.do?orderId=1", Some(&other))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, get("/mall/order/pay.do?orderId=1", Some(&other))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Back-office management ---

#[tokio::test]
async fn test_back_office_writes_require_admin_login() {
    let app = spawn_app().await;
    let shopper = register_and_login_shopper(&app, "lena").await;

    for cookie in [None, Some(shopper.as_str())] {
        let response = send(
            &app,
            post_form(
                "/mall/admin/product/add.do",
                "title=X&marketPrice=1&shopPrice=1&csid=2",
                cookie,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), Some("/mall/admin/toLogin.html"));
    }
}

#[tokio::test]
async fn test_admin_manages_categories_and_products() {
    let app = spawn_app().await;
    let admin = login_admin(&app).await;

    // Category 1 is the seeded top-level "Clothing".
    let added: bool = bean_data(
        send(
            &app,
            post_form(
                "/mall/admin/classification/add.do",
                "cname=Shoes&parentId=1&type=2",
                Some(&admin),
            ),
        )
        .await,
    )
    .await;
    assert!(added);
    let subs: Vec<Classification> =
        get_data(&app, "/mall/admin/classification/list.do?type=2", Some(&admin)).await;
    let shoes = subs.iter().find(|c| c.cname == "Shoes").unwrap().clone();
    assert_eq!(shoes.parent_id, 1);

    let response = send(
        &app,
        post_form(
            "/mall/admin/classification/add.do",
            "cname=Orphan&parentId=42&type=2",
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let form = format!(
        "title=Sneaker&marketPrice=80&shopPrice=60&isHot=1&desc=Fast&csid={}",
        shoes.id
    );
    let response = send(&app, post_form("/mall/admin/product/add.do", &form, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/mall/admin/product/toEdit.html?id=3"));

    let total: usize = get_data(&app, "/mall/admin/product/getTotal.do", Some(&admin)).await;
    assert_eq!(total, 3);
    let by_category: Vec<Product> = get_data(&app, "/mall/product/category.do?cid=1", None).await;
    assert_eq!(by_category.len(), 2);

    let form = format!("id=3&title=Sneaker+v2&marketPrice=80&shopPrice=55&csid={}", shoes.id);
    let response = send(
        &app,
        post_form("/mall/admin/product/update.do", &form, Some(&admin)),
    )
    .await;
    assert_eq!(location(&response), Some("/mall/admin/product/toList.html"));
    let product: Product = get_data(&app, "/mall/product/get.do?id=3", None).await;
    assert_eq!(product.title, "Sneaker v2");
    assert_eq!(product.is_hot, 0);

    assert!(get_data::<bool>(&app, "/mall/admin/product/del.do?id=3", Some(&admin)).await);
    let response = send(&app, get("/mall/admin/product/del.do?id=3", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let del_uri = format!("/mall/admin/classification/del.do?id={}", shoes.id);
    assert!(get_data::<bool>(&app, &del_uri, Some(&admin)).await);
    let count: usize =
        get_data(&app, "/mall/admin/classification/getTotal.do?type=2", Some(&admin)).await;
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_admin_edits_and_deletes_shoppers() {
    let app = spawn_app().await;
    register_shopper(&app, "mona").await;
    let admin = login_admin(&app).await;

    let users: Vec<User> =
        get_data(&app, "/mall/admin/user/list.do?pageindex=0", Some(&admin)).await;
    let mona = &users[0];

    let form = format!("id={}&username=mona&name=Mona+Lisa&phone=123", mona.id);
    let response = send(&app, post_form("/mall/admin/user/update.do", &form, Some(&admin))).await;
    assert!(bean_data::<bool>(response).await);
    // The blank password left the old one in place.
    login_shopper(&app, "mona", None).await;

    let del_uri = format!("/mall/admin/user/del.do?id={}", mona.id);
    assert!(get_data::<bool>(&app, &del_uri, Some(&admin)).await);
    let total: usize = get_data(&app, "/mall/admin/user/getTotal.do", Some(&admin)).await;
    assert_eq!(total, 0);
}

