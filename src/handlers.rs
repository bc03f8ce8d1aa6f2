use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Response},
};
use tower_sessions::Session;

use crate::{
    AppState,
    error::Error,
    found,
    models::{
        AdminClassificationQuery, AdminPageQuery, CartQuery, CategoryQuery, CheckoutForm,
        Classification, ClassificationForm, ClassificationQuery, IdQuery, LoginForm,
        NewProductQuery, Order, OrderItem, OrderQuery, Page, ParentQuery, Product, ProductForm,
        ProductQuery, RegisterForm, ResultBean, SubCategoryQuery, User, UserIdQuery,
        UserUpdateForm, UsernameQuery,
    },
    session::{SessionAdmin, SessionCart, SessionIdentity, SessionShopper},
};

/// Landing page after a shopper logs in or out.
pub const HOME_PAGE: &str = "/mall/index.html";

/// Landing page after an administrator logs in.
pub const ADMIN_HOME_PAGE: &str = "/mall/admin/toIndex.html";

/// Where a shopper lands after checking out.
pub const ORDER_LIST_PAGE: &str = "/mall/order/toList.html";

/// Where the back-office lands after saving a product.
pub const ADMIN_PRODUCT_LIST_PAGE: &str = "/mall/admin/product/toList.html";

// --- Page Views ---

/// page
///
/// Minimal HTML shell standing in for a rendered template. The view name is
/// exposed so clients and tests can tell pages apart.
pub fn page(view: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{view}</title></head>\
         <body data-view=\"{view}\"></body></html>"
    ))
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, page("404"))
}

pub async fn index_page() -> Html<String> {
    page("mall/index")
}

pub async fn user_login_page() -> Html<String> {
    page("mall/user/login")
}

pub async fn user_register_page() -> Html<String> {
    page("mall/user/register")
}

pub async fn error_page() -> Html<String> {
    page("error")
}

pub async fn order_list_page() -> Html<String> {
    page("mall/order/list")
}

pub async fn cart_page() -> Html<String> {
    page("mall/product/cart")
}

pub async fn admin_login_page() -> Html<String> {
    page("admin/login")
}

pub async fn admin_index_page() -> Html<String> {
    page("admin/index")
}

pub async fn admin_product_list_page() -> Html<String> {
    page("admin/product/list")
}

pub async fn admin_user_list_page() -> Html<String> {
    page("admin/user/list")
}

pub async fn admin_order_list_page() -> Html<String> {
    page("admin/order/list")
}

/// Top-level and sub-category pages share a route and differ by `type`.
fn category_view(kind: i32, action: &str) -> Result<Html<String>, Error> {
    match kind {
        1 => Ok(page(&format!("admin/category/{action}"))),
        2 => Ok(page(&format!("admin/categorysec/{action}"))),
        _ => Err(Error::BadRequest("category type must be 1 or 2")),
    }
}

pub async fn admin_classification_list_page(
    Query(query): Query<ClassificationQuery>,
) -> Result<Html<String>, Error> {
    category_view(query.kind, "list")
}

pub async fn admin_classification_add_page(
    Query(query): Query<ClassificationQuery>,
) -> Result<Html<String>, Error> {
    category_view(query.kind, "add")
}

pub async fn admin_classification_edit_page(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Html<String>, Error> {
    let classification = state
        .repo
        .get_classification(query.id)
        .await
        .ok_or(Error::NotFound)?;
    category_view(classification.kind, "edit")
}

pub async fn admin_product_add_page() -> Html<String> {
    page("admin/product/add")
}

pub async fn admin_product_edit_page(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Html<String>, Error> {
    state.repo.get_product(query.id).await.ok_or(Error::NotFound)?;
    Ok(page("admin/product/edit"))
}

pub async fn admin_user_edit_page(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Html<String>, Error> {
    state.repo.get_user(query.id).await.ok_or(Error::NotFound)?;
    Ok(page("admin/user/edit"))
}

pub async fn product_page(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Html<String>, Error> {
    state.repo.get_product(query.id).await.ok_or(Error::NotFound)?;
    Ok(page("mall/product/info"))
}

pub async fn category_page(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> Result<Html<String>, Error> {
    state
        .repo
        .get_classification(query.cid)
        .await
        .ok_or(Error::NotFound)?;
    Ok(page("mall/product/category"))
}

// --- Shopper Account ---

/// user_login
///
/// [Public Route] Checks the credentials, stores the shopper under the `user`
/// session key and sends the browser to the home page.
pub async fn user_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, Error> {
    let user = state
        .repo
        .check_user_login(&form.username, &form.password)
        .await?
        .ok_or(Error::LoginFailed)?;

    SessionShopper::insert(&session, SessionIdentity::from(&user)).await?;
    tracing::info!(username = %user.username, "shopper logged in");

    Ok(found(HOME_PAGE))
}

/// user_register
///
/// [Public Route] Creates the shopper account and sends the browser to the login page.
pub async fn user_register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, Error> {
    let user = state.repo.create_user(form).await?;
    tracing::info!(username = %user.username, "shopper registered");

    Ok(found(&state.config.gatekeeper.user_login_path))
}

/// user_logout
///
/// [Public Route] Drops the `user` session key. Idempotent.
pub async fn user_logout(session: Session) -> Result<Response, Error> {
    if let Some(identity) = SessionShopper::remove(&session).await? {
        tracing::info!(username = %identity.username, "shopper logged out");
    }
    Ok(found(HOME_PAGE))
}

/// check_username
///
/// [Public Route] Registration-form helper: `data` is `true` when the name is still free.
#[utoipa::path(
    get,
    path = "/mall/user/checkUsername.do",
    params(UsernameQuery),
    responses((status = 200, description = "Whether the username is available"))
)]
pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Json<ResultBean<bool>> {
    let available = state
        .repo
        .find_user_by_username(&query.username)
        .await
        .is_none();
    Json(ResultBean::ok(available))
}

// --- Catalog ---

/// list_classifications
///
/// [Public Route] Categories of the requested level.
#[utoipa::path(
    get,
    path = "/mall/classification/list.do",
    params(ClassificationQuery),
    responses((status = 200, description = "Categories", body = [Classification]))
)]
pub async fn list_classifications(
    State(state): State<AppState>,
    Query(query): Query<ClassificationQuery>,
) -> Json<ResultBean<Vec<Classification>>> {
    Json(ResultBean::ok(
        state.repo.list_classifications(query.kind).await,
    ))
}

/// hot_products
///
/// [Public Route] Products promoted on the home page.
#[utoipa::path(
    get,
    path = "/mall/product/hot.do",
    responses((status = 200, description = "Hot products", body = [Product]))
)]
pub async fn hot_products(State(state): State<AppState>) -> Json<ResultBean<Vec<Product>>> {
    Json(ResultBean::ok(state.repo.hot_products().await))
}

/// get_product
///
/// [Public Route] A single product by id.
#[utoipa::path(
    get,
    path = "/mall/product/get.do",
    params(ProductQuery),
    responses(
        (status = 200, description = "Found", body = Product),
        (status = 404, description = "No such product")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ResultBean<Product>>, Error> {
    let product = state.repo.get_product(query.id).await.ok_or(Error::NotFound)?;
    Ok(Json(ResultBean::ok(product)))
}

/// new_products
///
/// [Public Route] Newest products first, one storefront page at a time.
#[utoipa::path(
    get,
    path = "/mall/product/new.do",
    params(NewProductQuery),
    responses((status = 200, description = "Newest products", body = [Product]))
)]
pub async fn new_products(
    State(state): State<AppState>,
    Query(query): Query<NewProductQuery>,
) -> Json<ResultBean<Vec<Product>>> {
    let page = Page::new(query.page_no, query.page_size);
    Json(ResultBean::ok(state.repo.new_products(page).await))
}

/// category_products
///
/// [Public Route] Products listed under any sub-category of a top-level category.
#[utoipa::path(
    get,
    path = "/mall/product/category.do",
    params(CategoryQuery),
    responses((status = 200, description = "Products of the category", body = [Product]))
)]
pub async fn category_products(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Json<ResultBean<Vec<Product>>> {
    let page = Page::new(query.page_no, query.page_size);
    Json(ResultBean::ok(
        state.repo.products_by_category(query.cid, page).await,
    ))
}

pub async fn sub_category_products(
    State(state): State<AppState>,
    Query(query): Query<SubCategoryQuery>,
) -> Json<ResultBean<Vec<Product>>> {
    let page = Page::new(query.page_no, query.page_size);
    Json(ResultBean::ok(
        state.repo.products_by_sub_category(query.cs_id, page).await,
    ))
}

/// sub_categories
///
/// [Public Route] The sub-categories of one top-level category, for menus.
pub async fn sub_categories(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> Json<ResultBean<Vec<Classification>>> {
    Json(ResultBean::ok(state.repo.sub_classifications(query.cid).await))
}

// --- Cart ---
//
// Cart endpoints sit under /mall/product/ and are on the allow-list, so they work
// without a login. Checkout is what requires one.

/// add_to_cart
///
/// [Public Route] Puts one unit of an existing product into the session cart.
#[utoipa::path(
    get,
    path = "/mall/product/addCart.do",
    params(CartQuery),
    responses(
        (status = 200, description = "Added"),
        (status = 404, description = "No such product")
    )
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CartQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    state
        .repo
        .get_product(query.product_id)
        .await
        .ok_or(Error::NotFound)?;
    SessionCart::add(&session, query.product_id).await?;
    Ok(Json(ResultBean::ok(true)))
}

/// remove_from_cart
///
/// [Public Route] Takes one unit out of the cart; `data` says whether there was one.
pub async fn remove_from_cart(
    session: Session,
    Query(query): Query<CartQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    let removed = SessionCart::remove_one(&session, query.product_id).await?;
    Ok(Json(ResultBean::ok(removed)))
}

/// list_cart
///
/// [Public Route] The cart as priced lines.
#[utoipa::path(
    get,
    path = "/mall/product/listCart.do",
    responses((status = 200, description = "Cart lines", body = [OrderItem]))
)]
pub async fn list_cart(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ResultBean<Vec<OrderItem>>>, Error> {
    let ids = SessionCart::product_ids(&session).await?;
    Ok(Json(ResultBean::ok(state.repo.price_cart(&ids).await)))
}

// --- Orders ---

async fn current_shopper(session: &Session) -> Result<SessionIdentity, Error> {
    SessionShopper::get(session).await?.ok_or(Error::NotLoggedIn)
}

/// A shopper only ever sees their own orders; anyone else's id is "not found".
async fn owned_order(state: &AppState, session: &Session, order_id: i32) -> Result<Order, Error> {
    let shopper = current_shopper(session).await?;
    state
        .repo
        .get_order(order_id)
        .await
        .filter(|order| order.user_id == shopper.id)
        .ok_or(Error::NotFound)
}

/// submit_order
///
/// [Shopper Route] Turns the cart into an unpaid order, empties the cart and
/// opens the order list.
pub async fn submit_order(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, Error> {
    let shopper = current_shopper(&session).await?;
    let ids = SessionCart::product_ids(&session).await?;
    let lines = state.repo.price_cart(&ids).await;

    let order = state.repo.create_order(shopper.id, form, lines).await?;
    SessionCart::clear(&session).await?;
    tracing::info!(
        username = %shopper.username,
        order_id = order.id,
        total = order.total,
        "order submitted"
    );

    Ok(found(ORDER_LIST_PAGE))
}

/// list_orders
///
/// [Shopper Route] The logged-in shopper's orders.
#[utoipa::path(
    get,
    path = "/mall/order/list.do",
    responses((status = 200, description = "The shopper's orders", body = [Order]))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ResultBean<Vec<Order>>>, Error> {
    let shopper = current_shopper(&session).await?;
    Ok(Json(ResultBean::ok(state.repo.user_orders(shopper.id).await)))
}

/// order_detail
///
/// [Shopper Route] Lines of one of the shopper's orders.
#[utoipa::path(
    get,
    path = "/mall/order/getDetail.do",
    params(OrderQuery),
    responses(
        (status = 200, description = "Order lines", body = [OrderItem]),
        (status = 404, description = "No such order for this shopper")
    )
)]
pub async fn order_detail(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ResultBean<Vec<OrderItem>>>, Error> {
    let order = owned_order(&state, &session, query.order_id).await?;
    Ok(Json(ResultBean::ok(state.repo.order_items(order.id).await)))
}

/// pay_order
///
/// [Shopper Route] Simulated payment: an unpaid order now awaits shipment.
pub async fn pay_order(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    let order = owned_order(&state, &session, query.order_id).await?;
    state
        .repo
        .advance_order(order.id, Order::STATE_UNPAID, Order::STATE_AWAITING_SHIPMENT)
        .await?;
    Ok(Json(ResultBean::ok(true)))
}

/// receive_order
///
/// [Shopper Route] Confirms delivery of a shipped order.
pub async fn receive_order(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    let order = owned_order(&state, &session, query.order_id).await?;
    state
        .repo
        .advance_order(order.id, Order::STATE_SHIPPED, Order::STATE_COMPLETE)
        .await?;
    Ok(Json(ResultBean::ok(true)))
}

// --- Back-office ---

/// admin_login
///
/// [Public Route] Checks administrator credentials, stores the admin under the
/// `login_user` session key and opens the dashboard.
pub async fn admin_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, Error> {
    let admin = state
        .repo
        .check_admin_login(&form.username, &form.password)
        .await?
        .ok_or(Error::LoginFailed)?;

    SessionAdmin::insert(&session, SessionIdentity::from(&admin)).await?;
    tracing::info!(username = %admin.username, "administrator logged in");

    Ok(found(ADMIN_HOME_PAGE))
}

/// admin_logout
///
/// [Public Route] Drops the `login_user` session key and returns to the admin login page.
pub async fn admin_logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, Error> {
    if let Some(identity) = SessionAdmin::remove(&session).await? {
        tracing::info!(username = %identity.username, "administrator logged out");
    }
    Ok(found(&state.config.gatekeeper.admin_login_path))
}

// --- Back-office: Shoppers ---

/// list_users
///
/// [Admin Route] One page of registered shoppers.
#[utoipa::path(
    get,
    path = "/mall/admin/user/list.do",
    params(AdminPageQuery),
    responses((status = 200, description = "Registered shoppers", body = [User]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminPageQuery>,
) -> Json<ResultBean<Vec<User>>> {
    Json(ResultBean::ok(state.repo.list_users(Page::from(&query)).await))
}

pub async fn count_users(State(state): State<AppState>) -> Json<ResultBean<usize>> {
    Json(ResultBean::ok(state.repo.count_users().await))
}

/// update_user
///
/// [Admin Route] Overwrites a shopper's profile. A blank password is left unchanged.
pub async fn update_user(
    State(state): State<AppState>,
    Form(form): Form<UserUpdateForm>,
) -> Result<Json<ResultBean<bool>>, Error> {
    let user = state.repo.update_user(form).await?;
    tracing::info!(user_id = %user.id, "shopper profile updated");
    Ok(Json(ResultBean::ok(true)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    state.repo.delete_user(query.id).await?;
    tracing::info!(user_id = %query.id, "shopper deleted");
    Ok(Json(ResultBean::ok(true)))
}

// --- Back-office: Products ---

/// admin_list_products
///
/// [Admin Route] One page of the catalog.
#[utoipa::path(
    get,
    path = "/mall/admin/product/list.do",
    params(AdminPageQuery),
    responses((status = 200, description = "Catalog page", body = [Product]))
)]
pub async fn admin_list_products(
    State(state): State<AppState>,
    Query(query): Query<AdminPageQuery>,
) -> Json<ResultBean<Vec<Product>>> {
    Json(ResultBean::ok(state.repo.list_products(Page::from(&query)).await))
}

pub async fn count_products(State(state): State<AppState>) -> Json<ResultBean<usize>> {
    Json(ResultBean::ok(state.repo.count_products().await))
}

/// Products must be listed under an existing sub-category.
async fn check_sub_category(state: &AppState, csid: i32) -> Result<(), Error> {
    match state.repo.get_classification(csid).await {
        Some(c) if c.kind == 2 => Ok(()),
        _ => Err(Error::BadRequest("csid must name a sub-category")),
    }
}

/// add_product
///
/// [Admin Route] Creates a product and opens its edit page.
pub async fn add_product(
    State(state): State<AppState>,
    Form(form): Form<ProductForm>,
) -> Result<Response, Error> {
    check_sub_category(&state, form.csid).await?;
    let product = state.repo.add_product(form.into()).await;
    tracing::info!(product_id = product.id, title = %product.title, "product added");

    Ok(found(&format!(
        "/mall/admin/product/toEdit.html?id={}",
        product.id
    )))
}

/// update_product
///
/// [Admin Route] Replaces a product's fields and returns to the product list.
pub async fn update_product(
    State(state): State<AppState>,
    Form(form): Form<ProductForm>,
) -> Result<Response, Error> {
    let id = form.id.ok_or(Error::BadRequest("id is required"))?;
    check_sub_category(&state, form.csid).await?;
    state.repo.update_product(id, form.into()).await?;
    tracing::info!(product_id = id, "product updated");

    Ok(found(ADMIN_PRODUCT_LIST_PAGE))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    state.repo.delete_product(query.id).await?;
    tracing::info!(product_id = query.id, "product deleted");
    Ok(Json(ResultBean::ok(true)))
}

// --- Back-office: Categories ---

/// Top-level categories hang off 0; sub-categories need an existing top-level parent.
async fn check_category_form(state: &AppState, form: &ClassificationForm) -> Result<(), Error> {
    match form.kind {
        1 => Ok(()),
        2 => match state.repo.get_classification(form.parent_id).await {
            Some(parent) if parent.kind == 1 => Ok(()),
            _ => Err(Error::BadRequest("parentId must name a top-level category")),
        },
        _ => Err(Error::BadRequest("category type must be 1 or 2")),
    }
}

pub async fn add_classification(
    State(state): State<AppState>,
    Form(form): Form<ClassificationForm>,
) -> Result<Json<ResultBean<bool>>, Error> {
    check_category_form(&state, &form).await?;
    let parent_id = if form.kind == 1 { 0 } else { form.parent_id };
    let classification = state
        .repo
        .add_classification(&form.cname, parent_id, form.kind)
        .await;
    tracing::info!(
        classification_id = classification.id,
        cname = %classification.cname,
        "category added"
    );
    Ok(Json(ResultBean::ok(true)))
}

pub async fn update_classification(
    State(state): State<AppState>,
    Form(form): Form<ClassificationForm>,
) -> Result<Json<ResultBean<bool>>, Error> {
    let id = form.id.ok_or(Error::BadRequest("id is required"))?;
    check_category_form(&state, &form).await?;
    state
        .repo
        .update_classification(Classification {
            id,
            parent_id: if form.kind == 1 { 0 } else { form.parent_id },
            cname: form.cname,
            kind: form.kind,
        })
        .await?;
    Ok(Json(ResultBean::ok(true)))
}

pub async fn delete_classification(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    state.repo.delete_classification(query.id).await?;
    tracing::info!(classification_id = query.id, "category deleted");
    Ok(Json(ResultBean::ok(true)))
}

/// admin_list_classifications
///
/// [Admin Route] Categories of one level, paged, or all of them when `pageindex` is -1.
pub async fn admin_list_classifications(
    State(state): State<AppState>,
    Query(query): Query<AdminClassificationQuery>,
) -> Json<ResultBean<Vec<Classification>>> {
    let list = match usize::try_from(query.pageindex) {
        Ok(index) => {
            state
                .repo
                .list_classifications_page(query.kind, Page::new(index, query.page_size))
                .await
        }
        Err(_) => state.repo.list_classifications(query.kind).await,
    };
    Json(ResultBean::ok(list))
}

pub async fn count_classifications(
    State(state): State<AppState>,
    Query(query): Query<ClassificationQuery>,
) -> Json<ResultBean<usize>> {
    Json(ResultBean::ok(
        state.repo.count_classifications(query.kind).await,
    ))
}

// --- Back-office: Orders ---

/// admin_list_orders
///
/// [Admin Route] One page of every shopper's orders.
#[utoipa::path(
    get,
    path = "/mall/admin/order/list.do",
    params(AdminPageQuery),
    responses((status = 200, description = "Orders page", body = [Order]))
)]
pub async fn admin_list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminPageQuery>,
) -> Json<ResultBean<Vec<Order>>> {
    Json(ResultBean::ok(state.repo.list_orders(Page::from(&query)).await))
}

pub async fn count_orders(State(state): State<AppState>) -> Json<ResultBean<usize>> {
    Json(ResultBean::ok(state.repo.count_orders().await))
}

pub async fn admin_order_detail(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ResultBean<Vec<OrderItem>>>, Error> {
    state
        .repo
        .get_order(query.order_id)
        .await
        .ok_or(Error::NotFound)?;
    Ok(Json(ResultBean::ok(
        state.repo.order_items(query.order_id).await,
    )))
}

/// ship_order
///
/// [Admin Route] Marks a paid order as shipped.
pub async fn ship_order(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<ResultBean<bool>>, Error> {
    state
        .repo
        .advance_order(query.id, Order::STATE_AWAITING_SHIPMENT, Order::STATE_SHIPPED)
        .await?;
    tracing::info!(order_id = query.id, "order shipped");
    Ok(Json(ResultBean::ok(true)))
}
