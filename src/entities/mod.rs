/// Persistence entities, one module per table
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod product;
pub mod receipt;
pub mod receipt_item;
pub mod review;
pub mod subcategory;
pub mod tag;
pub mod user;
pub mod wishlist_item;

// Re-export entities under their conventional aliases
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use receipt::{Entity as Receipt, Model as ReceiptModel};
pub use receipt_item::{Entity as ReceiptItem, Model as ReceiptItemModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use subcategory::{Entity as Subcategory, Model as SubcategoryModel};
pub use tag::{Entity as Tag, Model as TagModel};
pub use user::{Entity as User, Model as UserModel, UserRole};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
