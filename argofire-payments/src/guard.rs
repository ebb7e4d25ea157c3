//! Zero-balance short circuit
//!
//! A purchase whose share for this payment method is already covered must
//! not reach the gateway again. The first payment recorded against the
//! purchase is handed back instead.

use crate::error::{PaymentError, PaymentResult};
use crate::store::PaymentStore;
use crate::types::{Payment, Purchase};
use std::sync::Arc;

/// What the caller should do with a payment attempt
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// Balance outstanding: contact the gateway
    Proceed,
    /// Nothing left to charge
    Existing(Payment),
}

#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn PaymentStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, purchase: &Purchase, method: &str) -> PaymentResult<GuardDecision> {
        if !purchase.total(method).is_negligible() {
            return Ok(GuardDecision::Proceed);
        }

        let existing = self.store.payments_for_purchase(purchase.id).await?;
        match existing.into_iter().next() {
            Some(payment) => {
                argofire_log::debug!(
                    "Purchase {} has no {} balance; reusing payment {}",
                    purchase.id,
                    method,
                    payment.id
                );
                Ok(GuardDecision::Existing(payment))
            }
            None => Err(PaymentError::Precondition(format!(
                "no existing payment covers purchase {} and nothing is owed",
                purchase.id
            ))),
        }
    }
}
