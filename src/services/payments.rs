use crate::{
    config::AppConfig,
    entities::{
        cart, cart_item, receipt, receipt_item, Cart, CartItem, Product, Receipt, ReceiptItem,
        ReceiptItemModel, ReceiptModel, User, UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::CatalogService,
        gateway::{
            CreatePaymentRequest, PaymentCustomer, PaymentCustomizations, PaymentGateway,
            PaymentMeta,
        },
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Payment reconciliation engine.
///
/// `initialize` prices the user's persisted cart and obtains a hosted-payment
/// link, embedding (user_id, order_id) as gateway metadata. `verify` turns the
/// gateway's authoritative answer into an immutable receipt exactly once per
/// order: the unique index on `receipts.order_id` is the concurrency guard,
/// and the pre-insert existence check is only a fast path for retried
/// deliveries. Stock decrements run after the receipt commits and are
/// best-effort per product: the receipt records what was purchased, stock is
/// accounting.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<CatalogService>,
    config: AppConfig,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<CatalogService>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            catalog,
            config,
        }
    }

    /// Price the user's cart and obtain a hosted-payment redirect link.
    ///
    /// Mints a fresh order id and embeds it, with the user id, as gateway
    /// metadata to be echoed back at verification. No receipt is created and
    /// no stock moves here.
    #[instrument(skip(self))]
    pub async fn initialize(&self, email: &str) -> Result<PaymentInitialization, ServiceError> {
        let user = User::find()
            .filter(crate::entities::user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User does not exist!".to_string()))?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User cart does not exist!".to_string()))?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let total: Decimal = lines
            .iter()
            .filter_map(|(item, product)| {
                product
                    .as_ref()
                    .map(|p| p.price * Decimal::from(item.quantity.max(1)))
            })
            .sum();

        let order_id = Uuid::new_v4();

        let payment = self
            .gateway
            .create_payment(CreatePaymentRequest {
                tx_ref: Uuid::new_v4().to_string(),
                amount: total,
                currency: self.config.currency.clone(),
                redirect_url: self.config.frontend_url.clone(),
                customer: PaymentCustomer {
                    email: user.email.clone(),
                    name: user.full_name(),
                    phone: user.phone.clone(),
                },
                meta: PaymentMeta {
                    user_id: user.id,
                    order_id,
                },
                customizations: PaymentCustomizations {
                    title: "Grandeur".to_string(),
                    description: "Payment".to_string(),
                },
            })
            .await?;

        self.event_sender
            .send_or_log(Event::PaymentInitialized {
                order_id,
                user_id: user.id,
                amount: total,
            })
            .await;

        info!("Initialized payment for order {}: {}", order_id, total);
        Ok(PaymentInitialization {
            link: payment.link,
            order_id,
        })
    }

    /// Verify a completed payment and reconcile it into a receipt.
    ///
    /// Identity comes exclusively from the metadata the gateway echoes back;
    /// the caller only supplies the transaction id. Safe to retry: a second
    /// delivery for an already-reconciled order fails with a distinct
    /// conflict and performs no further mutation. The cart is intentionally
    /// left untouched; clearing it is a separate, explicit client action.
    #[instrument(skip(self))]
    pub async fn verify(&self, transaction_id: &str) -> Result<ReceiptWithItems, ServiceError> {
        if transaction_id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Missing transaction_id".to_string(),
            ));
        }

        let tx = self.gateway.verify_transaction(transaction_id).await?;

        let user = User::find_by_id(tx.meta.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("User does not exist in database!".to_string())
            })?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("User cart does not exist in database!".to_string())
            })?;

        // Fast path for redelivered webhooks/redirects; the unique index on
        // order_id below is what actually holds under concurrency.
        let existing = Receipt::find()
            .filter(receipt::Column::OrderId.eq(tx.meta.order_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Receipt already exists for this order!".to_string(),
            ));
        }

        if !tx.is_successful() {
            return Err(ServiceError::PaymentFailed(format!(
                "gateway reported status '{}'",
                tx.status
            )));
        }

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let receipt = self
            .create_receipt(&user, tx.meta.order_id, transaction_id, &tx.status, tx.amount, &lines)
            .await?;

        // Stock bookkeeping is best-effort: a failing product is logged and
        // skipped, and never rolls back the receipt or blocks its siblings.
        for (item, product) in &lines {
            let Some(product) = product else { continue };
            if let Err(e) = self
                .catalog
                .decrement_stock(product.id, item.quantity)
                .await
            {
                warn!(
                    "Failed to decrement stock for product {}: {}",
                    product.id, e
                );
            }
        }

        self.event_sender
            .send_or_log(Event::ReceiptCreated {
                receipt_id: receipt.id,
                order_id: receipt.order_id,
            })
            .await;

        self.load_receipt_by_order(receipt.order_id).await
    }

    /// Insert the receipt and its line snapshots in one transaction.
    async fn create_receipt(
        &self,
        user: &UserModel,
        order_id: Uuid,
        transaction_id: &str,
        status: &str,
        amount: Decimal,
        lines: &[(cart_item::Model, Option<crate::entities::ProductModel>)],
    ) -> Result<ReceiptModel, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let insert = receipt::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            user_id: Set(user.id),
            customer_name: Set(user.full_name()),
            customer_email: Set(user.email.clone()),
            customer_phone: Set(user.phone.clone()),
            amount: Set(amount),
            transaction_id: Set(transaction_id.to_string()),
            status: Set(status.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await;

        let receipt = match insert {
            Ok(receipt) => receipt,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Lost the race against a concurrent verification call.
                return Err(ServiceError::Conflict(
                    "Receipt already exists for this order!".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let items: Vec<receipt_item::ActiveModel> = lines
            .iter()
            .filter_map(|(item, product)| {
                product.as_ref().map(|p| receipt_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    receipt_id: Set(receipt.id),
                    product_id: Set(p.id),
                    name: Set(p.name.clone()),
                    price: Set(p.price),
                    quantity: Set(item.quantity),
                    total: Set(p.price * Decimal::from(item.quantity)),
                    image: Set(p.image.clone()),
                    created_at: Set(now),
                })
            })
            .collect();

        if !items.is_empty() {
            ReceiptItem::insert_many(items).exec(&txn).await?;
        }

        txn.commit().await?;

        info!("Created receipt {} for order {}", receipt.id, order_id);
        Ok(receipt)
    }

    /// Receipts for a user, newest-first, with line items.
    pub async fn receipts_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReceiptWithItems>, ServiceError> {
        let receipts = Receipt::find()
            .filter(receipt::Column::UserId.eq(user_id))
            .order_by_desc(receipt::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        self.attach_items(receipts).await
    }

    /// All receipts, paginated newest-first, with total-count metadata.
    pub async fn list_receipts(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ReceiptWithItems>, u64), ServiceError> {
        let paginator = Receipt::find()
            .order_by_desc(receipt::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let receipts = paginator.fetch_page(page.saturating_sub(1)).await?;
        let receipts = self.attach_items(receipts).await?;

        Ok((receipts, total))
    }

    /// Administrative status override; touches nothing but the status field.
    #[instrument(skip(self))]
    pub async fn update_receipt_status(
        &self,
        receipt_id: Uuid,
        status: String,
    ) -> Result<ReceiptWithItems, ServiceError> {
        let receipt = Receipt::find_by_id(receipt_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Receipt not found".to_string()))?;

        let mut active: receipt::ActiveModel = receipt.into();
        active.status = Set(status.clone());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ReceiptStatusUpdated {
                receipt_id,
                status,
            })
            .await;

        let items = updated.find_related(ReceiptItem).all(&*self.db).await?;
        Ok(ReceiptWithItems {
            receipt: updated,
            items,
        })
    }

    async fn load_receipt_by_order(
        &self,
        order_id: Uuid,
    ) -> Result<ReceiptWithItems, ServiceError> {
        let receipt = Receipt::find()
            .filter(receipt::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InternalError("receipt vanished after insert".into()))?;

        let items = receipt.find_related(ReceiptItem).all(&*self.db).await?;
        Ok(ReceiptWithItems { receipt, items })
    }

    async fn attach_items(
        &self,
        receipts: Vec<ReceiptModel>,
    ) -> Result<Vec<ReceiptWithItems>, ServiceError> {
        let mut out = Vec::with_capacity(receipts.len());
        for receipt in receipts {
            let items = receipt.find_related(ReceiptItem).all(&*self.db).await?;
            out.push(ReceiptWithItems { receipt, items });
        }
        Ok(out)
    }
}

/// Result of a payment initialization
#[derive(Debug, Serialize)]
pub struct PaymentInitialization {
    pub link: String,
    pub order_id: Uuid,
}

/// Receipt with its line snapshots
#[derive(Debug, Serialize)]
pub struct ReceiptWithItems {
    #[serde(flatten)]
    pub receipt: ReceiptModel,
    pub items: Vec<ReceiptItemModel>,
}
