//! Shop backend services built on the request pipeline.

pub mod cart;
pub mod order;
pub mod product;
pub mod types;
pub mod user;

pub use cart::CartService;
pub use order::OrderService;
pub use product::ProductService;
pub use user::UserService;
