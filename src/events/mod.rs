use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the service layer. Consumers (the background processor,
/// and whatever sinks it grows) must tolerate redelivery and loss: emission
/// is best-effort and never gates the primary operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // User events
    UserRegistered(Uuid),
    UserVerified(Uuid),

    // Cart events
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemUpdated { cart_id: Uuid, product_id: Uuid },
    CartItemRemoved { cart_id: Uuid, product_id: Uuid },
    CartCleared(Uuid),
    GuestCartMerged { user_id: Uuid, merged_lines: usize },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Wishlist / review events
    WishlistToggled { user_id: Uuid, product_id: Uuid, added: bool },
    ReviewCreated { product_id: Uuid, review_id: Uuid },

    // Payment events
    PaymentInitialized { order_id: Uuid, user_id: Uuid, amount: Decimal },
    ReceiptCreated { receipt_id: Uuid, order_id: Uuid },
    ReceiptStatusUpdated { receipt_id: Uuid, status: String },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing the failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed
    /// or full. Service code uses this so event delivery never fails the
    /// primary operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Background event processing loop. Runs for the lifetime of the process;
/// terminates when every sender has been dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ReceiptCreated {
                receipt_id,
                order_id,
            } => {
                info!(%receipt_id, %order_id, "receipt created");
            }
            Event::PaymentInitialized {
                order_id,
                user_id,
                amount,
            } => {
                info!(%order_id, %user_id, %amount, "payment initialized");
            }
            Event::GuestCartMerged {
                user_id,
                merged_lines,
            } => {
                info!(%user_id, merged_lines, "guest cart merged");
            }
            other => {
                info!("event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out
        sender.send_or_log(Event::CartCleared(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let cart_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();

        sender
            .send(Event::CartItemAdded { cart_id, product_id })
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::CartItemAdded {
                cart_id: c,
                product_id: p,
            }) => {
                assert_eq!(c, cart_id);
                assert_eq!(p, product_id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
