//! Payment persistence

use crate::error::{PaymentError, PaymentResult};
use crate::types::{NewPayment, Payment, PaymentData, PaymentId, PaymentStatus, PurchaseId};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Payment store
///
/// Implemented by the host platform over its own payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a new payment and return it with its id assigned
    async fn create(&self, payment: NewPayment) -> PaymentResult<Payment>;

    async fn get(&self, id: PaymentId) -> PaymentResult<Payment>;

    /// Payments recorded against a purchase, in creation order
    async fn payments_for_purchase(&self, purchase_id: PurchaseId) -> PaymentResult<Vec<Payment>>;

    /// Advance the status. Setting the current status again is a no-op;
    /// moving backward fails.
    async fn set_status(&self, id: PaymentId, status: PaymentStatus) -> PaymentResult<Payment>;

    /// Replace the payment's data blob
    async fn set_data(&self, id: PaymentId, data: PaymentData) -> PaymentResult<Payment>;
}

/// In-memory payment store (for testing/embedding)
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<Vec<Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }

    /// Snapshot of every stored payment
    pub async fn all(&self) -> Vec<Payment> {
        self.payments.read().await.clone()
    }

    async fn update<F>(&self, id: PaymentId, apply: F) -> PaymentResult<Payment>
    where
        F: FnOnce(&mut Payment) -> PaymentResult<()> + Send,
    {
        let mut payments = self.payments.write().await;
        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PaymentError::PaymentNotFound(id.to_string()))?;
        apply(payment)?;
        Ok(payment.clone())
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: NewPayment) -> PaymentResult<Payment> {
        let payment = payment.into_payment();
        self.payments.write().await.push(payment.clone());
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> PaymentResult<Payment> {
        self.payments
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| PaymentError::PaymentNotFound(id.to_string()))
    }

    async fn payments_for_purchase(&self, purchase_id: PurchaseId) -> PaymentResult<Vec<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.purchase_id == purchase_id)
            .cloned()
            .collect())
    }

    async fn set_status(&self, id: PaymentId, status: PaymentStatus) -> PaymentResult<Payment> {
        self.update(id, |payment| payment.transition(status).map(|_| ()))
            .await
    }

    async fn set_data(&self, id: PaymentId, data: PaymentData) -> PaymentResult<Payment> {
        self.update(id, |payment| {
            payment.data = data;
            payment.updated_at = Utc::now();
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use std::collections::BTreeMap;
    use tokio_test::{assert_err, assert_ok, block_on};

    fn new_payment(purchase_id: PurchaseId, pn_ref: &str) -> NewPayment {
        NewPayment {
            payment_method: "Credit (ArgoFire)".into(),
            purchase_id,
            amount: Money::new(1000),
            status: PaymentStatus::Authorized,
            transaction_id: pn_ref.into(),
            deals: BTreeMap::new(),
            shipping_address: None,
            data: PaymentData::default(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryPaymentStore::new();
        let created = store.create(new_payment(1, "PN1")).await.unwrap();
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_payments_for_purchase_in_creation_order() {
        let store = InMemoryPaymentStore::new();
        store.create(new_payment(1, "A")).await.unwrap();
        store.create(new_payment(2, "B")).await.unwrap();
        store.create(new_payment(1, "C")).await.unwrap();

        let refs: Vec<String> = store
            .payments_for_purchase(1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.transaction_id)
            .collect();
        assert_eq!(refs, vec!["A", "C"]);
        assert!(store.payments_for_purchase(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_status_forward_only() {
        let store = InMemoryPaymentStore::new();
        let payment = store.create(new_payment(1, "PN")).await.unwrap();

        let updated = store.set_status(payment.id, PaymentStatus::Complete).await.unwrap();
        assert_eq!(updated.status, PaymentStatus::Complete);

        let again = store.set_status(payment.id, PaymentStatus::Complete).await.unwrap();
        assert_eq!(again.status, PaymentStatus::Complete);

        let err = store
            .set_status(payment.id, PaymentStatus::Authorized)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition { .. }));
        assert_eq!(store.get(payment.id).await.unwrap().status, PaymentStatus::Complete);
    }

    #[tokio::test]
    async fn test_set_data() {
        let store = InMemoryPaymentStore::new();
        let payment = store.create(new_payment(1, "PN")).await.unwrap();

        let mut data = payment.data.clone();
        data.api_response = Some(serde_json::json!({"Result": "0"}));
        let updated = store.set_data(payment.id, data).await.unwrap();
        assert_eq!(
            updated.data.api_response,
            Some(serde_json::json!({"Result": "0"}))
        );
    }

    #[test]
    fn test_missing_payment() {
        let store = InMemoryPaymentStore::new();
        let err = assert_err!(block_on(store.get(PaymentId::new())));
        assert!(matches!(err, PaymentError::PaymentNotFound(_)));
        assert_err!(block_on(store.set_status(PaymentId::new(), PaymentStatus::Complete)));
    }

    #[test]
    fn test_clones_share_payments() {
        let store = InMemoryPaymentStore::new();
        let other = store.clone();
        let created = assert_ok!(block_on(store.create(new_payment(4, "PN4"))));
        let seen = assert_ok!(block_on(other.payments_for_purchase(4)));
        assert_eq!(seen, vec![created]);
    }
}
