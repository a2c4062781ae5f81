//! Declared routes and menus.

use crust_core::Identity;
use serde::{Deserialize, Serialize};

use crate::access::{CapabilityDescriptor, Visibility};

pub const PATH_INDEX: &str = "/";
pub const PATH_LOGIN: &str = "/login";
pub const PATH_LOGOUT: &str = "/user/profile/logout";
pub const PATH_PROFILE: &str = "/user/profile";
pub const PATH_ORDERS: &str = "/user/orders";
pub const PATH_SHOPPING_CART: &str = "/user/cart";
pub const PATH_ADMIN_ORDERS: &str = "/admin/orders-list";
pub const PATH_ADMIN_CATALOG: &str = "/admin/catalog";

/// Where unmatched routes are sent.
pub const PATH_REDIRECT: &str = PATH_INDEX;

/// The page a descriptor renders. Opaque to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Index,
    Login,
    Logout,
    Profile,
    Orders,
    ShoppingCart,
    AdminOrders,
    AdminCatalog,
}

/// The three descriptor sets, loaded once at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    /// Everything routable.
    pub routes: Vec<CapabilityDescriptor>,
    /// Top navigation.
    pub menu: Vec<CapabilityDescriptor>,
    /// Profile and sign-in entries.
    pub auth: Vec<CapabilityDescriptor>,
}

impl CapabilityTable {
    /// Parse a table from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid table.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let index = entry(PATH_INDEX, "Pizza", Page::Index, (true, true, false));
        let login = entry(PATH_LOGIN, "Sign in", Page::Login, (true, false, false));
        let logout = entry(PATH_LOGOUT, "Sign out", Page::Logout, (false, true, true));
        let profile = entry(PATH_PROFILE, "Profile", Page::Profile, (false, true, false));
        let orders = entry(PATH_ORDERS, "Orders", Page::Orders, (false, true, false));
        let cart = entry(PATH_SHOPPING_CART, "Cart", Page::ShoppingCart, (true, true, false));
        let admin_orders = entry(
            PATH_ADMIN_ORDERS,
            "Orders List",
            Page::AdminOrders,
            (false, false, true),
        );
        let admin_catalog = entry(
            PATH_ADMIN_CATALOG,
            "Catalog",
            Page::AdminCatalog,
            (false, false, true),
        );

        Self {
            routes: vec![
                index.clone(),
                login.clone(),
                logout.clone(),
                profile.clone(),
                orders.clone(),
                cart.clone(),
                admin_orders.clone(),
                admin_catalog.clone(),
            ],
            menu: vec![index, cart, admin_orders, admin_catalog],
            auth: vec![login, logout, profile, orders],
        }
    }
}

fn entry(
    path: &str,
    label: &str,
    page: Page,
    (guest, user, admin): (bool, bool, bool),
) -> CapabilityDescriptor {
    CapabilityDescriptor::new(path, label, page, Visibility::new(guest, user, admin))
}

/// Where an identity lands after signing in.
#[must_use]
pub fn landing_path(identity: &Identity, cart_count: u64) -> &'static str {
    if identity.is_administrator() {
        PATH_ADMIN_ORDERS
    } else if identity.is_authenticated() && identity.is_first_login {
        PATH_PROFILE
    } else if cart_count > 0 {
        PATH_SHOPPING_CART
    } else {
        PATH_INDEX
    }
}
