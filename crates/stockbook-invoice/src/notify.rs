//! # Post-Commit Notification
//!
//! Fire-and-forget dispatch of [`InvoiceCreated`] events after an invoice
//! has committed.
//!
//! ```text
//! coordinator ── commit ok ──► notifier.notify(&event)
//!                                 │
//!                                 ├─ QueueNotifier: try_send on a bounded
//!                                 │  tokio mpsc; consumer runs elsewhere
//!                                 └─ LogNotifier: one structured log line
//!
//! Err(NotifyError) is logged at warn by the coordinator; the invoice stands.
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockbook_core::InvoiceWithItems;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;
use ts_rs::TS;

/// Emitted once per committed invoice.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceCreated {
    pub invoice_id: String,
    pub shop_id: String,
    pub customer_id: String,
    pub item_count: usize,
    pub total_amount_after_discount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl From<&InvoiceWithItems> for InvoiceCreated {
    fn from(invoice: &InvoiceWithItems) -> Self {
        InvoiceCreated {
            invoice_id: invoice.invoice.id.clone(),
            shop_id: invoice.invoice.shop_id.clone(),
            customer_id: invoice.invoice.customer_id.clone(),
            item_count: invoice.items.len(),
            total_amount_after_discount_cents: invoice.invoice.total_amount_after_discount_cents,
            created_at: invoice.invoice.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,
}

/// Receives committed invoices. Must not block.
pub trait InvoiceNotifier: Send + Sync {
    fn notify(&self, event: &InvoiceCreated) -> Result<(), NotifyError>;
}

/// Pushes events onto a bounded queue drained by a separate consumer.
#[derive(Debug, Clone)]
pub struct QueueNotifier {
    sender: mpsc::Sender<InvoiceCreated>,
}

impl QueueNotifier {
    /// Creates the notifier and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<InvoiceCreated>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (QueueNotifier { sender }, receiver)
    }
}

impl InvoiceNotifier for QueueNotifier {
    fn notify(&self, event: &InvoiceCreated) -> Result<(), NotifyError> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::QueueClosed,
        })
    }
}

/// Logs each event; used when no queue consumer is running.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl InvoiceNotifier for LogNotifier {
    fn notify(&self, event: &InvoiceCreated) -> Result<(), NotifyError> {
        info!(
            invoice_id = %event.invoice_id,
            customer_id = %event.customer_id,
            items = event.item_count,
            total_cents = event.total_amount_after_discount_cents,
            "Invoice created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> InvoiceCreated {
        InvoiceCreated {
            invoice_id: id.to_string(),
            shop_id: "s-1".to_string(),
            customer_id: "c-1".to_string(),
            item_count: 1,
            total_amount_after_discount_cents: 1_000,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_queue_delivers() {
        let (notifier, mut receiver) = QueueNotifier::channel(4);

        notifier.notify(&event("i-1")).unwrap();

        assert_eq!(receiver.recv().await.unwrap().invoice_id, "i-1");
    }

    #[test]
    fn test_full_queue_is_an_error() {
        let (notifier, _receiver) = QueueNotifier::channel(1);

        notifier.notify(&event("i-1")).unwrap();
        assert_eq!(notifier.notify(&event("i-2")), Err(NotifyError::QueueFull));
    }

    #[test]
    fn test_closed_queue_is_an_error() {
        let (notifier, receiver) = QueueNotifier::channel(1);
        drop(receiver);

        assert_eq!(notifier.notify(&event("i-1")), Err(NotifyError::QueueClosed));
    }

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify(&event("i-1")).is_ok());
    }
}
