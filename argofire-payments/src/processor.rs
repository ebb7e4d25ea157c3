//! Credit card processor trait

use crate::card::CardBrand;
use crate::error::PaymentResult;
use crate::types::{Checkout, Payment, Purchase};
use async_trait::async_trait;

/// Credit card processor
///
/// The checkout orchestrator drives one of these per configured gateway.
#[async_trait]
pub trait CreditCardProcessor: Send + Sync {
    /// Display name
    fn name(&self) -> &'static str;

    /// Label this processor's share of a purchase is recorded under
    fn payment_method(&self) -> &'static str;

    fn accepted_cards(&self) -> &[CardBrand];

    /// Charge this payment method's share of the purchase
    async fn process_payment(&self, checkout: &Checkout, purchase: &Purchase)
    -> PaymentResult<Payment>;

    /// Capture and complete every payment of the purchase
    async fn complete_purchase(&self, purchase: &Purchase) -> PaymentResult<()>;
}
