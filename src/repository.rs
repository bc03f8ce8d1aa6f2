use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::Error,
    models::{
        AdminUser, CheckoutForm, Classification, NewProduct, Order, OrderItem, Page, Product,
        RegisterForm, User, UserUpdateForm,
    },
};

/// Repository Trait
///
/// Abstract contract for everything the handlers persist or look up. Handlers only
/// ever see `Arc<dyn Repository>`, so storage can be swapped without touching them.
///
/// Login checks return `Ok(None)` for a wrong username or password and reserve
/// `Err` for failures of the hashing machinery itself.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Shoppers ---
    async fn create_user(&self, form: RegisterForm) -> Result<User, Error>;
    async fn find_user_by_username(&self, username: &str) -> Option<User>;
    async fn check_user_login(&self, username: &str, password: &str)
    -> Result<Option<User>, Error>;
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn list_users(&self, page: Page) -> Vec<User>;
    async fn count_users(&self) -> usize;
    async fn update_user(&self, form: UserUpdateForm) -> Result<User, Error>;
    async fn delete_user(&self, id: Uuid) -> Result<(), Error>;

    // --- Administrators ---
    async fn create_admin(&self, username: &str, password: &str) -> Result<AdminUser, Error>;
    async fn check_admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminUser>, Error>;

    // --- Categories ---
    async fn add_classification(&self, cname: &str, parent_id: i32, kind: i32) -> Classification;
    async fn get_classification(&self, id: i32) -> Option<Classification>;
    async fn list_classifications(&self, kind: i32) -> Vec<Classification>;
    async fn list_classifications_page(&self, kind: i32, page: Page) -> Vec<Classification>;
    async fn count_classifications(&self, kind: i32) -> usize;
    async fn sub_classifications(&self, parent_id: i32) -> Vec<Classification>;
    async fn update_classification(&self, classification: Classification)
    -> Result<Classification, Error>;
    async fn delete_classification(&self, id: i32) -> Result<(), Error>;

    // --- Products ---
    async fn add_product(&self, product: NewProduct) -> Product;
    async fn get_product(&self, id: i32) -> Option<Product>;
    async fn hot_products(&self) -> Vec<Product>;
    async fn new_products(&self, page: Page) -> Vec<Product>;
    async fn products_by_category(&self, cid: i32, page: Page) -> Vec<Product>;
    async fn products_by_sub_category(&self, csid: i32, page: Page) -> Vec<Product>;
    async fn list_products(&self, page: Page) -> Vec<Product>;
    async fn count_products(&self) -> usize;
    async fn update_product(&self, id: i32, product: NewProduct) -> Result<Product, Error>;
    async fn delete_product(&self, id: i32) -> Result<(), Error>;

    // --- Orders ---

    /// Collapses cart product ids into priced lines, one per product, in order of
    /// first appearance. Ids of products that no longer exist are dropped.
    async fn price_cart(&self, product_ids: &[i32]) -> Vec<OrderItem>;
    async fn create_order(
        &self,
        user_id: Uuid,
        checkout: CheckoutForm,
        lines: Vec<OrderItem>,
    ) -> Result<Order, Error>;
    async fn get_order(&self, id: i32) -> Option<Order>;
    async fn user_orders(&self, user_id: Uuid) -> Vec<Order>;
    async fn list_orders(&self, page: Page) -> Vec<Order>;
    async fn count_orders(&self) -> usize;
    async fn order_items(&self, order_id: i32) -> Vec<OrderItem>;

    /// Moves the order from state `from` to state `to`, failing with
    /// [`Error::OrderState`] when it is not currently in `from`.
    async fn advance_order(&self, id: i32, from: i32, to: i32) -> Result<Order, Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    admins: Vec<AdminUser>,
    classifications: Vec<Classification>,
    products: Vec<Product>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

impl Tables {
    fn product(&self, id: i32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

/// MemoryRepository
///
/// Process-local implementation backed by a single `RwLock`. Integer ids are
/// assigned sequentially from 1, mirroring auto-increment columns.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, form: RegisterForm) -> Result<User, Error> {
        let password_hash = hash_password(&form.password)?;
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.username == form.username) {
            return Err(Error::UsernameTaken(form.username));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: form.username,
            name: form.name,
            phone: form.phone,
            email: form.email,
            addr: form.addr,
            created_at: Utc::now(),
            password_hash,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables.users.iter().find(|u| u.username == username).cloned()
    }

    async fn check_user_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, Error> {
        let Some(user) = self.find_user_by_username(username).await else {
            return Ok(None);
        };
        Ok(verify_password(&user.password_hash, password)?.then_some(user))
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let tables = self.tables.read().await;
        tables.users.iter().find(|u| u.id == id).cloned()
    }

    async fn list_users(&self, page: Page) -> Vec<User> {
        page.slice(&self.tables.read().await.users)
    }

    async fn count_users(&self) -> usize {
        self.tables.read().await.users.len()
    }

    async fn update_user(&self, form: UserUpdateForm) -> Result<User, Error> {
        let password_hash = if form.password.is_empty() {
            None
        } else {
            Some(hash_password(&form.password)?)
        };
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.username == form.username && u.id != form.id)
        {
            return Err(Error::UsernameTaken(form.username));
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == form.id)
            .ok_or(Error::NotFound)?;
        user.username = form.username;
        user.name = form.name;
        user.phone = form.phone;
        user.email = form.email;
        user.addr = form.addr;
        if let Some(password_hash) = password_hash {
            user.password_hash = password_hash;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.users, |u| u.id == id)
    }

    async fn create_admin(&self, username: &str, password: &str) -> Result<AdminUser, Error> {
        let password_hash = hash_password(password)?;
        let mut tables = self.tables.write().await;

        if tables.admins.iter().any(|a| a.username == username) {
            return Err(Error::UsernameTaken(username.to_string()));
        }

        let admin = AdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn check_admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminUser>, Error> {
        let admin = {
            let tables = self.tables.read().await;
            tables.admins.iter().find(|a| a.username == username).cloned()
        };
        match admin {
            Some(admin) => Ok(verify_password(&admin.password_hash, password)?.then_some(admin)),
            None => Ok(None),
        }
    }

    async fn add_classification(&self, cname: &str, parent_id: i32, kind: i32) -> Classification {
        let mut tables = self.tables.write().await;
        let classification = Classification {
            id: next_id(tables.classifications.iter().map(|c| c.id)),
            cname: cname.to_string(),
            parent_id,
            kind,
        };
        tables.classifications.push(classification.clone());
        classification
    }

    async fn get_classification(&self, id: i32) -> Option<Classification> {
        let tables = self.tables.read().await;
        tables.classifications.iter().find(|c| c.id == id).cloned()
    }

    async fn list_classifications(&self, kind: i32) -> Vec<Classification> {
        let tables = self.tables.read().await;
        tables
            .classifications
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    async fn list_classifications_page(&self, kind: i32, page: Page) -> Vec<Classification> {
        page.slice(&self.list_classifications(kind).await)
    }

    async fn count_classifications(&self, kind: i32) -> usize {
        let tables = self.tables.read().await;
        tables.classifications.iter().filter(|c| c.kind == kind).count()
    }

    async fn sub_classifications(&self, parent_id: i32) -> Vec<Classification> {
        let tables = self.tables.read().await;
        tables
            .classifications
            .iter()
            .filter(|c| c.parent_id == parent_id && c.kind == 2)
            .cloned()
            .collect()
    }

    async fn update_classification(
        &self,
        classification: Classification,
    ) -> Result<Classification, Error> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .classifications
            .iter_mut()
            .find(|c| c.id == classification.id)
            .ok_or(Error::NotFound)?;
        *stored = classification.clone();
        Ok(classification)
    }

    async fn delete_classification(&self, id: i32) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.classifications, |c| c.id == id)
    }

    async fn add_product(&self, product: NewProduct) -> Product {
        let mut tables = self.tables.write().await;
        let id = next_id(tables.products.iter().map(|p| p.id));
        let product = product_row(id, product);
        tables.products.push(product.clone());
        product
    }

    async fn get_product(&self, id: i32) -> Option<Product> {
        self.tables.read().await.product(id).cloned()
    }

    async fn hot_products(&self) -> Vec<Product> {
        let tables = self.tables.read().await;
        tables
            .products
            .iter()
            .filter(|p| p.is_hot == 1)
            .cloned()
            .collect()
    }

    async fn new_products(&self, page: Page) -> Vec<Product> {
        let mut products = self.tables.read().await.products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        page.slice(&products)
    }

    async fn products_by_category(&self, cid: i32, page: Page) -> Vec<Product> {
        let tables = self.tables.read().await;
        let sub_ids: Vec<i32> = tables
            .classifications
            .iter()
            .filter(|c| c.parent_id == cid)
            .map(|c| c.id)
            .collect();
        let products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| sub_ids.contains(&p.csid))
            .cloned()
            .collect();
        page.slice(&products)
    }

    async fn products_by_sub_category(&self, csid: i32, page: Page) -> Vec<Product> {
        let tables = self.tables.read().await;
        let products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| p.csid == csid)
            .cloned()
            .collect();
        page.slice(&products)
    }

    async fn list_products(&self, page: Page) -> Vec<Product> {
        page.slice(&self.tables.read().await.products)
    }

    async fn count_products(&self) -> usize {
        self.tables.read().await.products.len()
    }

    async fn update_product(&self, id: i32, product: NewProduct) -> Result<Product, Error> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::NotFound)?;

        // An update without a new picture keeps the old one.
        let image = if product.image.is_empty() {
            std::mem::take(&mut stored.image)
        } else {
            product.image.clone()
        };
        *stored = Product {
            image,
            ..product_row(id, product)
        };
        Ok(stored.clone())
    }

    async fn delete_product(&self, id: i32) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.products, |p| p.id == id)
    }

    async fn price_cart(&self, product_ids: &[i32]) -> Vec<OrderItem> {
        let tables = self.tables.read().await;
        let mut lines: Vec<OrderItem> = Vec::new();

        for &product_id in product_ids {
            if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
                line.count += 1;
                line.sub_total += line.product.as_ref().map_or(0.0, |p| p.shop_price);
                continue;
            }
            let Some(product) = tables.product(product_id) else {
                continue;
            };
            lines.push(OrderItem {
                id: 0,
                order_id: 0,
                product_id,
                count: 1,
                sub_total: product.shop_price,
                product: Some(product.clone()),
            });
        }
        lines
    }

    async fn create_order(
        &self,
        user_id: Uuid,
        checkout: CheckoutForm,
        lines: Vec<OrderItem>,
    ) -> Result<Order, Error> {
        if lines.is_empty() {
            return Err(Error::BadRequest("the cart is empty"));
        }

        let mut tables = self.tables.write().await;
        let order = Order {
            id: next_id(tables.orders.iter().map(|o| o.id)),
            total: lines.iter().map(|l| l.sub_total).sum(),
            order_time: Utc::now(),
            name: checkout.name,
            phone: checkout.phone,
            addr: checkout.addr,
            state: Order::STATE_UNPAID,
            user_id,
        };

        let mut item_id = next_id(tables.order_items.iter().map(|i| i.id));
        for line in lines {
            tables.order_items.push(OrderItem {
                id: item_id,
                order_id: order.id,
                product: None,
                ..line
            });
            item_id += 1;
        }
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: i32) -> Option<Order> {
        let tables = self.tables.read().await;
        tables.orders.iter().find(|o| o.id == id).cloned()
    }

    async fn user_orders(&self, user_id: Uuid) -> Vec<Order> {
        let tables = self.tables.read().await;
        tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn list_orders(&self, page: Page) -> Vec<Order> {
        page.slice(&self.tables.read().await.orders)
    }

    async fn count_orders(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    async fn order_items(&self, order_id: i32) -> Vec<OrderItem> {
        let tables = self.tables.read().await;
        tables
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|item| OrderItem {
                product: tables.product(item.product_id).cloned(),
                ..item.clone()
            })
            .collect()
    }

    async fn advance_order(&self, id: i32, from: i32, to: i32) -> Result<Order, Error> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(Error::NotFound)?;
        if order.state != from {
            return Err(Error::OrderState {
                id,
                state: order.state,
            });
        }
        order.state = to;
        Ok(order.clone())
    }
}

fn product_row(id: i32, product: NewProduct) -> Product {
    Product {
        id,
        title: product.title,
        market_price: product.market_price,
        shop_price: product.shop_price,
        image: product.image,
        desc: product.desc,
        is_hot: i32::from(product.is_hot),
        csid: product.csid,
        created_at: Utc::now(),
    }
}

fn remove_where<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> Result<(), Error> {
    let before = rows.len();
    rows.retain(|row| !matches(row));
    if rows.len() == before {
        return Err(Error::NotFound);
    }
    Ok(())
}

fn next_id(ids: impl Iterator<Item = i32>) -> i32 {
    ids.max().unwrap_or(0) + 1
}

fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|detail| Error::PasswordHash(detail.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(expected_hash: &str, candidate: &str) -> Result<bool, Error> {
    let parsed =
        PasswordHash::new(expected_hash).map_err(|detail| Error::PasswordHash(detail.to_string()))?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(detail) => Err(Error::PasswordHash(detail.to_string())),
    }
}

/// seed_demo_catalog
///
/// Fills an empty catalog with a couple of categories and products so the
/// storefront has something to browse in local runs.
pub async fn seed_demo_catalog(repo: &dyn Repository) {
    let clothing = repo.add_classification("Clothing", 0, 1).await;
    let shirts = repo.add_classification("Shirts", clothing.id, 2).await;
    let books = repo.add_classification("Books", 0, 1).await;
    let novels = repo.add_classification("Novels", books.id, 2).await;

    repo.add_product(NewProduct {
        title: "Linen shirt".to_string(),
        market_price: 59.0,
        shop_price: 39.0,
        image: "linen-shirt.jpg".to_string(),
        desc: "Breathable summer shirt".to_string(),
        is_hot: true,
        csid: shirts.id,
    })
    .await;
    repo.add_product(NewProduct {
        title: "Paperback novel".to_string(),
        market_price: 18.0,
        shop_price: 12.5,
        image: "novel.jpg".to_string(),
        desc: "A long read".to_string(),
        is_hot: false,
        csid: novels.id,
    })
    .await;
}
