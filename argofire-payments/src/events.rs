//! Payment lifecycle notifications

use crate::types::{DealId, Payment};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notification emitted as a payment moves through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentEvent {
    /// Gateway approved the sale and the payment was recorded
    Authorized(Payment),
    /// Purchase completed; the listed deals are captured
    Captured {
        payment: Payment,
        deal_ids: Vec<DealId>,
    },
    Completed(Payment),
}

/// Event type used for handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventType {
    Authorized,
    Captured,
    Completed,
}

impl PaymentEvent {
    pub fn event_type(&self) -> PaymentEventType {
        match self {
            PaymentEvent::Authorized(_) => PaymentEventType::Authorized,
            PaymentEvent::Captured { .. } => PaymentEventType::Captured,
            PaymentEvent::Completed(_) => PaymentEventType::Completed,
        }
    }

    pub fn payment(&self) -> &Payment {
        match self {
            PaymentEvent::Authorized(payment)
            | PaymentEvent::Captured { payment, .. }
            | PaymentEvent::Completed(payment) => payment,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.event_type() {
            PaymentEventType::Authorized => "payment_authorized",
            PaymentEventType::Captured => "payment_captured",
            PaymentEventType::Completed => "payment_complete",
        }
    }
}

/// Payment event handler trait
#[async_trait]
pub trait PaymentEventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &PaymentEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Clone)]
struct Subscription {
    /// `None` receives every event
    filter: Option<PaymentEventType>,
    handler: Arc<dyn PaymentEventHandler>,
}

/// Dispatches payment events to registered handlers, in registration
/// order. Handler failures are logged and never fail the payment.
#[derive(Clone, Default)]
pub struct PaymentEventBus {
    subscriptions: Vec<Subscription>,
}

impl PaymentEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        mut self,
        filter: Option<PaymentEventType>,
        handler: Arc<dyn PaymentEventHandler>,
    ) -> Self {
        self.subscriptions.push(Subscription { filter, handler });
        self
    }

    /// Register a handler for every event
    pub fn subscribe<H: PaymentEventHandler + 'static>(self, handler: H) -> Self {
        self.register(None, Arc::new(handler))
    }

    /// Register a handler for one event type
    pub fn on<H: PaymentEventHandler + 'static>(
        self,
        event_type: PaymentEventType,
        handler: H,
    ) -> Self {
        self.register(Some(event_type), Arc::new(handler))
    }

    /// Register an already shared handler
    pub fn subscribe_shared(self, handler: Arc<dyn PaymentEventHandler>) -> Self {
        self.register(None, handler)
    }

    pub fn handler_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub async fn publish(&self, event: &PaymentEvent) {
        let event_type = event.event_type();
        argofire_log::debug!(
            "Publishing {} for payment {}",
            event.name(),
            event.payment().id
        );

        for subscription in self.subscriptions.iter() {
            if subscription.filter.is_some_and(|filter| filter != event_type) {
                continue;
            }
            if let Err(e) = subscription.handler.handle(event).await {
                argofire_log::warn!("Handler for {} failed: {}", event.name(), e);
            }
        }
    }
}

impl std::fmt::Debug for PaymentEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentEventBus")
            .field("handlers", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{NewPayment, PaymentData, PaymentStatus};
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<PaymentEventType>>>,
    }

    #[async_trait]
    impl PaymentEventHandler for Recorder {
        async fn handle(
            &self,
            event: &PaymentEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen.lock().await.push(event.event_type());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PaymentEventHandler for Failing {
        async fn handle(
            &self,
            _event: &PaymentEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("handler exploded".into())
        }
    }

    fn payment() -> Payment {
        NewPayment {
            payment_method: "Credit (ArgoFire)".into(),
            purchase_id: 1,
            amount: Money::new(100),
            status: PaymentStatus::Authorized,
            transaction_id: "PN".into(),
            deals: BTreeMap::new(),
            shipping_address: None,
            data: PaymentData::default(),
        }
        .into_payment()
    }

    #[tokio::test]
    async fn test_publish_routes_by_type() {
        let all = Recorder::default();
        let captured = Recorder::default();
        let bus = PaymentEventBus::new()
            .subscribe(all.clone())
            .on(PaymentEventType::Captured, captured.clone());
        assert_eq!(bus.handler_count(), 2);

        bus.publish(&PaymentEvent::Authorized(payment())).await;
        bus.publish(&PaymentEvent::Captured {
            payment: payment(),
            deal_ids: vec![1, 2],
        })
        .await;

        assert_eq!(
            *all.seen.lock().await,
            vec![PaymentEventType::Authorized, PaymentEventType::Captured]
        );
        assert_eq!(*captured.seen.lock().await, vec![PaymentEventType::Captured]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let recorder = Recorder::default();
        let bus = PaymentEventBus::new()
            .subscribe(Failing)
            .subscribe(recorder.clone());

        bus.publish(&PaymentEvent::Completed(payment())).await;
        assert_eq!(*recorder.seen.lock().await, vec![PaymentEventType::Completed]);
    }

    #[test]
    fn test_event_names() {
        let event = PaymentEvent::Completed(payment());
        assert_eq!(event.name(), "payment_complete");
        assert_eq!(event.event_type(), PaymentEventType::Completed);
    }

    #[test]
    fn test_cloned_bus_keeps_handlers() {
        let bus = PaymentEventBus::new().subscribe(Failing);
        let clone = bus.clone();
        let extended = clone.subscribe(Failing);
        assert_eq!(bus.handler_count(), 1);
        assert_eq!(extended.handler_count(), 2);
    }
}
