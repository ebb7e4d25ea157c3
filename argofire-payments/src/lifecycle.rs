//! Authorize and complete: the two phases of a payment

use crate::error::PaymentResult;
use crate::events::{PaymentEvent, PaymentEventBus};
use crate::response::Approval;
use crate::store::PaymentStore;
use crate::types::{Checkout, NewPayment, Payment, PaymentData, PaymentStatus, Purchase};
use std::sync::Arc;

/// Records approved sales and advances payments when a purchase completes.
#[derive(Clone)]
pub struct LifecycleCoordinator {
    store: Arc<dyn PaymentStore>,
    events: PaymentEventBus,
}

impl LifecycleCoordinator {
    pub fn new(store: Arc<dyn PaymentStore>, events: PaymentEventBus) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.store
    }

    /// Create the `Authorized` payment for an approved sale, announce it,
    /// then attach the gateway response to its data. The card has been
    /// charged by then, so a failed attach only logs; the payment is
    /// returned without the response.
    pub async fn record_authorization(
        &self,
        purchase: &Purchase,
        checkout: &Checkout,
        method: &str,
        approval: Approval,
        masked_cc_number: String,
    ) -> PaymentResult<Payment> {
        let deals = purchase.deals_for(method);

        let payment = self
            .store
            .create(NewPayment {
                payment_method: method.to_string(),
                purchase_id: purchase.id,
                amount: purchase.total(method),
                status: PaymentStatus::Authorized,
                transaction_id: approval.pn_ref.clone(),
                deals: deals.clone(),
                shipping_address: checkout.shipping.clone(),
                data: PaymentData {
                    masked_cc_number,
                    uncaptured_deals: deals,
                    api_response: None,
                },
            })
            .await?;

        argofire_log::info!(
            "Payment {} authorized for purchase {} (PNRef {})",
            payment.id,
            purchase.id,
            payment.transaction_id
        );
        self.events
            .publish(&PaymentEvent::Authorized(payment.clone()))
            .await;

        let mut data = payment.data.clone();
        data.api_response = Some(approval.response.to_json());
        match self.store.set_data(payment.id, data).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                argofire_log::warn!(
                    "Payment {} authorized but gateway response not attached: {}",
                    payment.id,
                    e
                );
                Ok(payment)
            }
        }
    }

    /// Mark every payment of the purchase complete. Running it again
    /// re-emits the notifications but leaves the payments as they are.
    pub async fn complete_purchase(&self, purchase: &Purchase) -> PaymentResult<()> {
        let deal_ids = purchase.deal_ids();
        let payments = self.store.payments_for_purchase(purchase.id).await?;

        if payments.is_empty() {
            argofire_log::debug!("Purchase {} has no payments to complete", purchase.id);
            return Ok(());
        }

        for payment in payments {
            self.events
                .publish(&PaymentEvent::Captured {
                    payment: payment.clone(),
                    deal_ids: deal_ids.clone(),
                })
                .await;
            self.events
                .publish(&PaymentEvent::Completed(payment.clone()))
                .await;

            self.store
                .set_status(payment.id, PaymentStatus::Complete)
                .await?;
        }

        argofire_log::info!("Purchase {} completed", purchase.id);
        Ok(())
    }
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PaymentEventHandler, PaymentEventType};
    use crate::money::Money;
    use crate::response::GatewayResponse;
    use crate::error::PaymentError;
    use crate::store::InMemoryPaymentStore;
    use crate::types::{Address, LineItem, PaymentId, PurchaseId};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    const METHOD: &str = "Credit (ArgoFire)";

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<(PaymentEventType, Option<serde_json::Value>)>>>,
    }

    #[async_trait]
    impl PaymentEventHandler for Recorder {
        async fn handle(
            &self,
            event: &PaymentEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen
                .lock()
                .await
                .push((event.event_type(), event.payment().data.api_response.clone()));
            Ok(())
        }
    }

    fn purchase() -> Purchase {
        Purchase::new(11, 4)
            .item(LineItem::new(1, 1, Money::new(2000)).paid_with(METHOD, Money::new(2000)))
            .item(LineItem::new(2, 1, Money::new(1000)).paid_with("Account Balance", Money::new(1000)))
            .shipping_for(METHOD, Money::new(500))
    }

    fn approval() -> Approval {
        let response = GatewayResponse::parse(
            "<Response><Result>0</Result><PNRef>PN-77</PNRef></Response>",
        )
        .unwrap();
        Approval {
            pn_ref: "PN-77".into(),
            auth_code: None,
            response,
        }
    }

    fn setup() -> (LifecycleCoordinator, InMemoryPaymentStore, Recorder) {
        let store = InMemoryPaymentStore::new();
        let recorder = Recorder::default();
        let coordinator = LifecycleCoordinator::new(
            Arc::new(store.clone()),
            PaymentEventBus::new().subscribe(recorder.clone()),
        );
        (coordinator, store, recorder)
    }

    #[tokio::test]
    async fn test_record_authorization() {
        let (coordinator, store, recorder) = setup();
        let shipping = Address {
            city: "Paris".into(),
            ..Address::default()
        };
        let checkout = Checkout::new().shipping(shipping.clone());

        let payment = coordinator
            .record_authorization(&purchase(), &checkout, METHOD, approval(), "XXXX1111".into())
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Authorized);
        assert_eq!(payment.amount, Money::new(2500));
        assert_eq!(payment.transaction_id, "PN-77");
        assert_eq!(payment.shipping_address, Some(shipping));
        assert_eq!(payment.deals.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(payment.data.uncaptured_deals, payment.deals);
        assert_eq!(payment.data.masked_cc_number, "XXXX1111");
        assert_eq!(payment.data.api_response.as_ref().unwrap()["PNRef"], "PN-77");
        assert_eq!(store.len().await, 1);

        // The authorized notification goes out before the response is attached.
        let seen = recorder.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (PaymentEventType::Authorized, None));
    }

    /// Delegates to memory but cannot update payment data.
    struct ReadOnlyData(InMemoryPaymentStore);

    #[async_trait]
    impl PaymentStore for ReadOnlyData {
        async fn create(&self, payment: NewPayment) -> PaymentResult<Payment> {
            self.0.create(payment).await
        }

        async fn get(&self, id: PaymentId) -> PaymentResult<Payment> {
            self.0.get(id).await
        }

        async fn payments_for_purchase(&self, purchase_id: PurchaseId) -> PaymentResult<Vec<Payment>> {
            self.0.payments_for_purchase(purchase_id).await
        }

        async fn set_status(&self, id: PaymentId, status: PaymentStatus) -> PaymentResult<Payment> {
            self.0.set_status(id, status).await
        }

        async fn set_data(&self, _id: PaymentId, _data: PaymentData) -> PaymentResult<Payment> {
            Err(PaymentError::Storage("payment data is read-only".into()))
        }
    }

    #[tokio::test]
    async fn test_attach_failure_keeps_authorized_payment() {
        let store = InMemoryPaymentStore::new();
        let recorder = Recorder::default();
        let coordinator = LifecycleCoordinator::new(
            Arc::new(ReadOnlyData(store.clone())),
            PaymentEventBus::new().subscribe(recorder.clone()),
        );

        let payment = coordinator
            .record_authorization(&purchase(), &Checkout::new(), METHOD, approval(), String::new())
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Authorized);
        assert_eq!(payment.transaction_id, "PN-77");
        assert!(payment.data.api_response.is_none());
        assert_eq!(store.get(payment.id).await.unwrap(), payment);
        assert_eq!(recorder.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_purchase_twice() {
        let (coordinator, store, recorder) = setup();
        let payment = coordinator
            .record_authorization(&purchase(), &Checkout::new(), METHOD, approval(), String::new())
            .await
            .unwrap();

        coordinator.complete_purchase(&purchase()).await.unwrap();
        coordinator.complete_purchase(&purchase()).await.unwrap();

        assert_eq!(store.get(payment.id).await.unwrap().status, PaymentStatus::Complete);
        let types: Vec<_> = recorder.seen.lock().await.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            types,
            vec![
                PaymentEventType::Authorized,
                PaymentEventType::Captured,
                PaymentEventType::Completed,
                PaymentEventType::Captured,
                PaymentEventType::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_purchase_without_payments() {
        let (coordinator, _store, recorder) = setup();
        coordinator.complete_purchase(&purchase()).await.unwrap();
        assert!(recorder.seen.lock().await.is_empty());
    }
}
