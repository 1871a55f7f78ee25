/// Business-logic layer; one service per aggregate
pub mod carts;
pub mod catalog;
pub mod gateway;
pub mod mailer;
pub mod payments;
pub mod reviews;
pub mod taxonomy;
pub mod users;
pub mod wishlists;

pub use carts::CartService;
pub use catalog::CatalogService;
pub use payments::PaymentService;
pub use reviews::ReviewService;
pub use taxonomy::TaxonomyService;
pub use users::UserService;
pub use wishlists::WishlistService;
