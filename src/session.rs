//! Session login state.
//!
//! Typed wrappers over the two session keys that the gatekeeper checks. A shopper
//! login writes `user`; an admin login writes `login_user`. Logout removes the key.
//! Expiry is left to the session store. The cart rides in the same session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::Error,
    models::{AdminUser, User},
};

/// Session key holding the logged-in shopper.
pub const SESSION_SHOPPER_KEY: &str = "user";

/// Session key holding the logged-in administrator.
pub const SESSION_ADMIN_KEY: &str = "login_user";

/// Session key holding the cart's product ids.
pub const SESSION_CART_KEY: &str = "shop_cart";

/// The identity stored under either login key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for SessionIdentity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

impl From<&AdminUser> for SessionIdentity {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id,
            username: admin.username.clone(),
        }
    }
}

/// Shopper login state under [`SESSION_SHOPPER_KEY`].
pub struct SessionShopper;

impl SessionShopper {
    /// Stores the shopper and rotates the session id.
    pub async fn insert(session: &Session, identity: SessionIdentity) -> Result<(), Error> {
        login(session, SESSION_SHOPPER_KEY, identity).await
    }

    pub async fn get(session: &Session) -> Result<Option<SessionIdentity>, Error> {
        Ok(session.get(SESSION_SHOPPER_KEY).await?)
    }

    pub async fn remove(session: &Session) -> Result<Option<SessionIdentity>, Error> {
        Ok(session.remove(SESSION_SHOPPER_KEY).await?)
    }
}

/// Administrator login state under [`SESSION_ADMIN_KEY`].
pub struct SessionAdmin;

impl SessionAdmin {
    /// Stores the administrator and rotates the session id.
    pub async fn insert(session: &Session, identity: SessionIdentity) -> Result<(), Error> {
        login(session, SESSION_ADMIN_KEY, identity).await
    }

    pub async fn get(session: &Session) -> Result<Option<SessionIdentity>, Error> {
        Ok(session.get(SESSION_ADMIN_KEY).await?)
    }

    pub async fn remove(session: &Session) -> Result<Option<SessionIdentity>, Error> {
        Ok(session.remove(SESSION_ADMIN_KEY).await?)
    }
}

/// Shopping cart under [`SESSION_CART_KEY`].
///
/// The cart belongs to the browser session rather than to a shopper, so it can be
/// filled before logging in and survives the id rotation of a login. It holds one
/// product id per unit; pricing happens when it is listed.
pub struct SessionCart;

impl SessionCart {
    pub async fn product_ids(session: &Session) -> Result<Vec<i32>, Error> {
        Ok(session.get(SESSION_CART_KEY).await?.unwrap_or_default())
    }

    pub async fn add(session: &Session, product_id: i32) -> Result<(), Error> {
        let mut ids = Self::product_ids(session).await?;
        ids.push(product_id);
        session.insert(SESSION_CART_KEY, ids).await?;
        Ok(())
    }

    /// Takes out one unit of the product. Returns whether the cart held it.
    pub async fn remove_one(session: &Session, product_id: i32) -> Result<bool, Error> {
        let mut ids = Self::product_ids(session).await?;
        let Some(position) = ids.iter().position(|&id| id == product_id) else {
            return Ok(false);
        };
        ids.remove(position);
        session.insert(SESSION_CART_KEY, ids).await?;
        Ok(true)
    }

    pub async fn clear(session: &Session) -> Result<(), Error> {
        session.remove::<Vec<i32>>(SESSION_CART_KEY).await?;
        Ok(())
    }
}

async fn login(session: &Session, key: &str, identity: SessionIdentity) -> Result<(), Error> {
    session.cycle_id().await?;
    session.insert(key, identity).await?;
    Ok(())
}
