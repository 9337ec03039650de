//! Event-name catalog shared with UI subscribers.

use std::fmt;

/// Well-known event names. Subscribers match on the exact string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    UserLogin,
    UserLogout,
    UserInfoUpdate,
    CartUpdate,
    CartItemAdd,
    CartItemRemove,
    CartItemUpdate,
    OrderCreate,
    OrderPay,
    OrderCancel,
    OrderRefund,
    ProductFavorite,
    ProductUnfavorite,
    ProductView,
    NetworkError,
    NetworkStatusChange,
    NetworkOnline,
    NetworkOffline,
    AppUpdate,
    ThemeChange,
    Unauthorized,
}

impl Topic {
    pub const ALL: [Topic; 21] = [
        Topic::UserLogin,
        Topic::UserLogout,
        Topic::UserInfoUpdate,
        Topic::CartUpdate,
        Topic::CartItemAdd,
        Topic::CartItemRemove,
        Topic::CartItemUpdate,
        Topic::OrderCreate,
        Topic::OrderPay,
        Topic::OrderCancel,
        Topic::OrderRefund,
        Topic::ProductFavorite,
        Topic::ProductUnfavorite,
        Topic::ProductView,
        Topic::NetworkError,
        Topic::NetworkStatusChange,
        Topic::NetworkOnline,
        Topic::NetworkOffline,
        Topic::AppUpdate,
        Topic::ThemeChange,
        Topic::Unauthorized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::UserLogin => "USER_LOGIN",
            Topic::UserLogout => "USER_LOGOUT",
            Topic::UserInfoUpdate => "USER_INFO_UPDATE",
            Topic::CartUpdate => "CART_UPDATE",
            Topic::CartItemAdd => "CART_ITEM_ADD",
            Topic::CartItemRemove => "CART_ITEM_REMOVE",
            Topic::CartItemUpdate => "CART_ITEM_UPDATE",
            Topic::OrderCreate => "ORDER_CREATE",
            Topic::OrderPay => "ORDER_PAY",
            Topic::OrderCancel => "ORDER_CANCEL",
            Topic::OrderRefund => "ORDER_REFUND",
            Topic::ProductFavorite => "PRODUCT_FAVORITE",
            Topic::ProductUnfavorite => "PRODUCT_UNFAVORITE",
            Topic::ProductView => "PRODUCT_VIEW",
            Topic::NetworkError => "NETWORK_ERROR",
            Topic::NetworkStatusChange => "NETWORK_STATUS_CHANGE",
            Topic::NetworkOnline => "NETWORK_ONLINE",
            Topic::NetworkOffline => "NETWORK_OFFLINE",
            Topic::AppUpdate => "APP_UPDATE",
            Topic::ThemeChange => "THEME_CHANGE",
            Topic::Unauthorized => "UNAUTHORIZED",
        }
    }

    /// Look up a topic by its wire name.
    pub fn from_name(name: &str) -> Option<Topic> {
        Topic::ALL.into_iter().find(|topic| topic.as_str() == name)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
