use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartModel, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Shopping cart service.
///
/// One cart per user, created lazily on the first add. Lines are keyed by
/// (cart, product): adding a product that is already in the cart aggregates
/// the quantity into the existing line instead of creating a second one.
/// Also hosts the guest-cart merge run at login.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds an item to the user's cart, creating the cart if absent.
    ///
    /// If the product is already in the cart the supplied quantity (default 1)
    /// is added to the existing line, and color/size replace the stored
    /// selections only when newly supplied. Fails with `NotFound` when the
    /// product id does not resolve.
    #[instrument(skip(self))]
    pub async fn add_item(&self, input: AddToCartInput) -> Result<cart_item::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.ensure_cart(&txn, input.user_id).await?;

        Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let line = self
            .upsert_line(
                &txn,
                cart.id,
                input.product_id,
                input.quantity.unwrap_or(1),
                input.color,
                input.size,
                SelectionPolicy::ReplaceWhenSupplied,
            )
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: input.product_id,
            })
            .await;

        info!(
            "Added product {} x{} to cart {}",
            input.product_id, line.quantity, cart.id
        );
        Ok(line)
    }

    /// Patches an existing cart line.
    ///
    /// A supplied quantity of zero or less is a removal signal, not an error.
    /// Omitted fields are left untouched.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        patch: UpdateCartItemInput,
    ) -> Result<CartItemUpdate, ServiceError> {
        let cart = self.find_cart(user_id).await?;
        let item = self.find_line(cart.id, product_id).await?;

        if let Some(quantity) = patch.quantity {
            if quantity <= 0 {
                item.delete(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::CartItemRemoved {
                        cart_id: cart.id,
                        product_id,
                    })
                    .await;
                return Ok(CartItemUpdate::Removed);
            }
        }

        let mut active: cart_item::ActiveModel = item.into();
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(size) = patch.size {
            active.selected_size = Set(Some(size));
        }
        if let Some(color) = patch.color {
            active.selected_color = Set(Some(color));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: cart.id,
                product_id,
            })
            .await;

        Ok(CartItemUpdate::Updated(updated))
    }

    /// Deletes one line from the user's cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let cart = self.find_cart(user_id).await?;
        let item = self.find_line(cart.id, product_id).await?;

        let removed = item.clone();
        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                product_id,
            })
            .await;

        Ok(removed)
    }

    /// Deletes every line in the user's cart. Succeeds on an already-empty
    /// cart; fails `NotFound` when the cart itself does not exist.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.find_cart(user_id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart.id))
            .await;

        info!("Cleared cart: {}", cart.id);
        Ok(())
    }

    /// Returns the cart with all lines and their product snapshots joined.
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = self.find_cart(user_id).await?;
        let items = self.load_lines(cart.id).await?;
        Ok(CartWithItems { cart, items })
    }

    /// Merges a client-held guest cart into the user's persisted cart at
    /// login time.
    ///
    /// Quantities are additive against any pre-existing line; guest color and
    /// size apply only when the persisted line has no selection. Lines with
    /// unresolvable product ids are skipped, and any per-line failure is
    /// logged and swallowed; the merge must never fail the login. Returns
    /// the authoritative persisted cart, expanded with product details, for
    /// the caller to hand back as the client's new source of truth.
    #[instrument(skip(self, guest_lines))]
    pub async fn merge_guest_cart(
        &self,
        user_id: Uuid,
        guest_lines: &[GuestCartLine],
    ) -> Result<Vec<CartLineDetail>, ServiceError> {
        if !guest_lines.is_empty() {
            match self.merge_lines(user_id, guest_lines).await {
                Ok(merged) => {
                    self.event_sender
                        .send_or_log(Event::GuestCartMerged {
                            user_id,
                            merged_lines: merged,
                        })
                        .await;
                }
                Err(e) => {
                    warn!("Guest cart merge failed for user {}: {}", user_id, e);
                }
            }
        }

        match self.get(user_id).await {
            Ok(cart) => Ok(cart.items),
            Err(ServiceError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn merge_lines(
        &self,
        user_id: Uuid,
        guest_lines: &[GuestCartLine],
    ) -> Result<usize, ServiceError> {
        let cart = self.ensure_cart(&*self.db, user_id).await?;
        let mut merged = 0usize;

        for line in guest_lines {
            let product = Product::find_by_id(line.id).one(&*self.db).await?;
            if product.is_none() {
                warn!("Skipping guest cart line: unknown product {}", line.id);
                continue;
            }

            let result = self
                .upsert_line(
                    &*self.db,
                    cart.id,
                    line.id,
                    line.quantity.unwrap_or(1),
                    line.color.clone(),
                    line.size.clone(),
                    SelectionPolicy::KeepExisting,
                )
                .await;

            match result {
                Ok(_) => merged += 1,
                Err(e) => warn!("Skipping guest cart line for product {}: {}", line.id, e),
            }
        }

        Ok(merged)
    }

    /// Atomic create-or-fetch of the user's cart. The unique index on
    /// `carts.user_id` resolves concurrent creation races: the losing insert
    /// is a no-op and both callers read back the same row.
    async fn ensure_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let now = Utc::now();
        let insert = Cart::insert(cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(cart::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec(conn)
        .await;

        match insert {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::InternalError("cart upsert lost its row".to_string()))
    }

    /// Upserts one line: additive quantity against any existing line, with
    /// selection handling per policy. The unique (cart_id, product_id) index
    /// turns insert races into updates of the surviving row.
    async fn upsert_line<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        color: Option<String>,
        size: Option<String>,
        policy: SelectionPolicy,
    ) -> Result<cart_item::Model, ServiceError> {
        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(conn)
            .await?;

        if let Some(item) = existing {
            return self
                .aggregate_into(conn, item, quantity, color, size, policy)
                .await;
        }

        let now = Utc::now();
        let insert = CartItem::insert(cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            selected_size: Set(size.clone()),
            selected_color: Set(color.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([cart_item::Column::CartId, cart_item::Column::ProductId])
                .do_nothing()
                .to_owned(),
        )
        .exec(conn)
        .await;

        match insert {
            Ok(_) => self
                .find_line_on(conn, cart_id, product_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError("cart line upsert lost its row".to_string())
                }),
            // A concurrent request inserted the line first; fold into it.
            Err(DbErr::RecordNotInserted) => {
                let item = self
                    .find_line_on(conn, cart_id, product_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError("cart line upsert lost its row".to_string())
                    })?;
                self.aggregate_into(conn, item, quantity, color, size, policy)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn aggregate_into<C: ConnectionTrait>(
        &self,
        conn: &C,
        item: cart_item::Model,
        quantity: i32,
        color: Option<String>,
        size: Option<String>,
        policy: SelectionPolicy,
    ) -> Result<cart_item::Model, ServiceError> {
        let current_quantity = item.quantity;
        let current_color = item.selected_color.clone();
        let current_size = item.selected_size.clone();

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(current_quantity + quantity);

        match policy {
            SelectionPolicy::ReplaceWhenSupplied => {
                active.selected_color = Set(color.or(current_color));
                active.selected_size = Set(size.or(current_size));
            }
            SelectionPolicy::KeepExisting => {
                active.selected_color = Set(current_color.or(color));
                active.selected_size = Set(current_size.or(size));
            }
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(conn).await?)
    }

    async fn find_cart(&self, user_id: Uuid) -> Result<CartModel, ServiceError> {
        Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))
    }

    async fn find_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        self.find_line_on(&*self.db, cart_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found in cart".to_string()))
    }

    async fn find_line_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<cart_item::Model>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(conn)
            .await?)
    }

    async fn load_lines(&self, cart_id: Uuid) -> Result<Vec<CartLineDetail>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                product.map(|product| CartLineDetail {
                    product,
                    quantity: item.quantity,
                    size: item.selected_size,
                    color: item.selected_color,
                })
            })
            .collect())
    }
}

/// Whether an upsert may overwrite the stored size/color selections.
#[derive(Debug, Clone, Copy)]
enum SelectionPolicy {
    /// Direct add-to-cart: newly supplied selections win.
    ReplaceWhenSupplied,
    /// Guest-cart merge: the persisted line's selections win.
    KeepExisting,
}

/// Input for adding an item to a cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Option<i32>,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Per-field patch for a cart line; omitted fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCartItemInput {
    pub quantity: Option<i32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Outcome of a cart line patch
#[derive(Debug)]
pub enum CartItemUpdate {
    Updated(cart_item::Model),
    Removed,
}

/// One guest cart line, supplied by the client only at login
#[derive(Debug, Clone, Deserialize)]
pub struct GuestCartLine {
    /// Product id as held by the client
    pub id: Uuid,
    pub quantity: Option<i32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A cart line expanded with its product snapshot
#[derive(Debug, Serialize)]
pub struct CartLineDetail {
    pub product: ProductModel,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Cart with expanded lines
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartLineDetail>,
}
