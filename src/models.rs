use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Core Records ---

/// User
///
/// A registered shopper. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    // Delivery address.
    pub addr: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: String,
}

/// AdminUser
///
/// A back-office account. Only the identity is ever exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
}

/// Classification
///
/// A product category. `kind` 1 is a top-level category, 2 a sub-category whose
/// `parent_id` points at its top-level parent (0 for none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Classification {
    pub id: i32,
    pub cname: String,
    pub parent_id: i32,
    #[serde(rename = "type")]
    pub kind: i32,
}

/// Product
///
/// A catalog entry. `csid` references the sub-category it is listed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub market_price: f64,
    pub shop_price: f64,
    // File name under /mall/admin/product/img/.
    pub image: String,
    pub desc: String,
    // 1 when the product is promoted on the home page.
    pub is_hot: i32,
    pub csid: i32,
    pub created_at: DateTime<Utc>,
}

/// NewProduct
///
/// Input for adding or replacing a catalog entry; ids and timestamps are assigned
/// by the repository.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub title: String,
    pub market_price: f64,
    pub shop_price: f64,
    pub image: String,
    pub desc: String,
    pub is_hot: bool,
    pub csid: i32,
}

/// Order
///
/// A submitted checkout. `state` walks [`Order::STATE_UNPAID`] through
/// [`Order::STATE_COMPLETE`]; each step is driven by one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i32,
    pub total: f64,
    pub order_time: DateTime<Utc>,
    // Recipient details captured at checkout.
    pub name: String,
    pub phone: String,
    pub addr: String,
    pub state: i32,
    pub user_id: Uuid,
}

impl Order {
    /// Submitted, waiting for the shopper to pay.
    pub const STATE_UNPAID: i32 = 1;
    /// Paid, waiting for the back-office to ship.
    pub const STATE_AWAITING_SHIPMENT: i32 = 2;
    /// Shipped, waiting for the shopper to confirm receipt.
    pub const STATE_SHIPPED: i32 = 3;
    pub const STATE_COMPLETE: i32 = 4;
}

/// OrderItem
///
/// One product line, either of the session cart (`id` and `order_id` are 0) or of
/// a submitted order. `product` is filled in when the line is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub count: u32,
    pub sub_total: f64,
    pub product: Option<Product>,
}

// --- JSON Envelope ---

/// ResultBean
///
/// Envelope returned by every `.do` JSON endpoint. `state` is [`ResultBean::SUCCESS`]
/// or [`ResultBean::FAIL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBean<T> {
    pub state: i32,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ResultBean<T> {
    pub const SUCCESS: i32 = 0;
    pub const FAIL: i32 = 1;

    pub fn ok(data: T) -> Self {
        Self {
            state: Self::SUCCESS,
            message: None,
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            state: Self::FAIL,
            message: Some(message.into()),
            data: None,
        }
    }
}

// --- Request Payloads ---

/// LoginForm
///
/// Form body of both the shopper and the admin `login.do`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// RegisterForm
///
/// Form body of `register.do`. Optional contact fields default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub addr: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClassificationQuery {
    /// 1 for top-level categories, 2 for sub-categories.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: i32,
}

fn default_kind() -> i32 {
    1
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductQuery {
    pub id: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CartQuery {
    #[serde(rename = "productId")]
    pub product_id: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderQuery {
    #[serde(rename = "orderId")]
    pub order_id: i32,
}

/// CheckoutForm
///
/// Recipient details posted to `order/submit.do`; the lines come from the cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub addr: String,
}

// --- Paging ---

/// Page
///
/// Zero-based page of `size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub size: usize,
}

impl Page {
    pub const DEFAULT_SIZE: usize = 15;

    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// The rows of `items` that fall on this page.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.index.saturating_mul(self.size))
            .take(self.size)
            .cloned()
            .collect()
    }
}

fn default_page_size() -> usize {
    Page::DEFAULT_SIZE
}

/// Storefront paging (`pageNo`, `pageSize`).
#[derive(Debug, Deserialize, IntoParams)]
pub struct NewProductQuery {
    #[serde(rename = "pageNo", default)]
    pub page_no: usize,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryQuery {
    /// Top-level category id.
    pub cid: i32,
    #[serde(rename = "pageNo", default)]
    pub page_no: usize,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubCategoryQuery {
    /// Sub-category id.
    #[serde(rename = "csId")]
    pub cs_id: i32,
    #[serde(rename = "pageNo", default)]
    pub page_no: usize,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ParentQuery {
    pub cid: i32,
}

/// Back-office paging (`pageindex`, `pageSize`).
#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminPageQuery {
    #[serde(default)]
    pub pageindex: usize,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
}

impl From<&AdminPageQuery> for Page {
    fn from(query: &AdminPageQuery) -> Self {
        Page::new(query.pageindex, query.page_size)
    }
}

/// Back-office category listing. A `pageindex` of -1 (the default) returns
/// every category of the level, for drop-downs.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminClassificationQuery {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: i32,
    #[serde(default = "all_pages")]
    pub pageindex: i64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
}

fn all_pages() -> i64 {
    -1
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct IdQuery {
    pub id: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserIdQuery {
    pub id: Uuid,
}

// --- Back-office Forms ---

/// ProductForm
///
/// Body of `admin/product/add.do` and `update.do`. `image` is a file name under
/// the product image directory; uploads are handled outside the mall.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub id: Option<i32>,
    pub title: String,
    #[serde(rename = "marketPrice")]
    pub market_price: f64,
    #[serde(rename = "shopPrice")]
    pub shop_price: f64,
    #[serde(rename = "isHot", default)]
    pub is_hot: i32,
    #[serde(default)]
    pub desc: String,
    pub csid: i32,
    #[serde(default)]
    pub image: String,
}

impl From<ProductForm> for NewProduct {
    fn from(form: ProductForm) -> Self {
        Self {
            title: form.title,
            market_price: form.market_price,
            shop_price: form.shop_price,
            image: form.image,
            desc: form.desc,
            is_hot: form.is_hot == 1,
            csid: form.csid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationForm {
    #[serde(default)]
    pub id: Option<i32>,
    pub cname: String,
    #[serde(rename = "parentId", default)]
    pub parent_id: i32,
    #[serde(rename = "type")]
    pub kind: i32,
}

/// UserUpdateForm
///
/// Body of `admin/user/update.do`. An empty `password` keeps the current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdateForm {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub addr: String,
}
