//! ArgoFire Credit Card Gateway Adapter
//!
//! Authorizes a purchase's credit card share against the ArgoFire
//! (TPISoft SmartPayments) `ProcessCreditCard` endpoint and drives the
//! resulting payment through its lifecycle.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ArgoFireProcessor                           │
//! │                                                                  │
//! │  Checkout + Purchase                                             │
//! │         │                                                        │
//! │         ▼                                                        │
//! │  ┌────────────┐   zero balance   ┌─────────────────────────┐    │
//! │  │   Guard    │ ───────────────▶ │  existing Payment        │    │
//! │  └────────────┘                  └─────────────────────────┘    │
//! │         │                                                        │
//! │         ▼                                                        │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐                  │
//! │  │  Request   │─▶│ Transport  │─▶│  Response  │                  │
//! │  │  (NVP)     │  │  (HTTPS)   │  │  (XML)     │                  │
//! │  └────────────┘  └────────────┘  └────────────┘                  │
//! │                                         │ Approved               │
//! │                                         ▼                        │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │              Lifecycle + PaymentEventBus                  │  │
//! │  │  authorized | captured | completed                        │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use argofire_config::GatewaySettings;
//! use argofire_payments::{ArgoFireProcessor, CreditCardProcessor, InMemoryPaymentStore, PaymentEventBus};
//! use std::sync::Arc;
//!
//! argofire_log::init();
//!
//! let processor = ArgoFireProcessor::new(
//!     GatewaySettings::from_env()?,
//!     Arc::new(InMemoryPaymentStore::new()),
//!     PaymentEventBus::new(),
//! )?;
//!
//! let payment = processor.process_payment(&checkout, &purchase).await?;
//!
//! // Later, once the purchase is fulfilled
//! processor.complete_purchase(&purchase).await?;
//! ```

pub mod card;
pub mod error;
pub mod events;
pub mod guard;
pub mod lifecycle;
pub mod money;
pub mod processor;
pub mod request;
pub mod response;
pub mod store;
pub mod transport;
pub mod types;

pub use card::*;
pub use error::*;
pub use events::*;
pub use guard::*;
pub use lifecycle::*;
pub use money::*;
pub use processor::*;
pub use request::*;
pub use response::*;
pub use store::*;
pub use transport::*;
pub use types::*;

use argofire_config::{GatewaySettings, Validate};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Label purchases record this processor's share under.
pub const PAYMENT_METHOD: &str = "Credit (ArgoFire)";

/// Display name.
pub const NAME: &str = "ArgoFire";

/// ArgoFire credit card processor
pub struct ArgoFireProcessor {
    settings: Arc<GatewaySettings>,
    transport: Arc<dyn GatewayTransport>,
    guard: IdempotencyGuard,
    lifecycle: LifecycleCoordinator,
    accepted_cards: Vec<CardBrand>,
}

impl ArgoFireProcessor {
    /// Create a processor talking HTTPS to the endpoint for the
    /// configured mode.
    pub fn new(
        settings: GatewaySettings,
        store: Arc<dyn PaymentStore>,
        events: PaymentEventBus,
    ) -> PaymentResult<Self> {
        let transport = HttpTransport::new(settings.timeout)?;
        Self::with_transport(settings, store, events, Arc::new(transport))
    }

    /// Create with a custom transport
    pub fn with_transport(
        settings: GatewaySettings,
        store: Arc<dyn PaymentStore>,
        events: PaymentEventBus,
        transport: Arc<dyn GatewayTransport>,
    ) -> PaymentResult<Self> {
        settings.validate()?;

        let accepted_cards = match &settings.accepted_cards {
            Some(names) => CardBrand::parse_list(names)?,
            None => DEFAULT_ACCEPTED_CARDS.to_vec(),
        };

        argofire_log::debug!(
            "ArgoFire processor ready ({} mode, AVS check {})",
            settings.mode,
            if settings.avs_check { "on" } else { "off" }
        );

        Ok(Self {
            settings: Arc::new(settings),
            transport,
            guard: IdempotencyGuard::new(Arc::clone(&store)),
            lifecycle: LifecycleCoordinator::new(store, events),
            accepted_cards,
        })
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        self.lifecycle.store()
    }

    fn check_card(&self, checkout: &Checkout) -> PaymentResult<String> {
        let card = checkout
            .card
            .as_ref()
            .ok_or_else(|| PaymentError::Precondition("card details missing from checkout".into()))?;

        let number = card.number.expose_secret();
        let brand = CardBrand::detect(number);
        if !self.accepted_cards.contains(&brand) {
            return Err(PaymentError::Precondition(format!(
                "{} cards are not accepted",
                brand
            )));
        }

        Ok(mask_card_number(number))
    }

    async fn authorize(&self, checkout: &Checkout, purchase: &Purchase) -> PaymentResult<Payment> {
        let masked = self.check_card(checkout)?;
        let request = build_sale(&self.settings, checkout, purchase, PAYMENT_METHOD)?;
        argofire_log::dump(self.settings.debug, "ArgoFire request", &request.redacted());

        let body = self
            .transport
            .post(self.settings.endpoint(), request.encode())
            .await?;
        argofire_log::dump(self.settings.debug, "ArgoFire response", &body);

        let response = GatewayResponse::parse(&body)?;
        let approval = interpret(response, self.settings.avs_check)?.into_approval()?;

        self.lifecycle
            .record_authorization(purchase, checkout, PAYMENT_METHOD, approval, masked)
            .await
    }
}

#[async_trait]
impl CreditCardProcessor for ArgoFireProcessor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn payment_method(&self) -> &'static str {
        PAYMENT_METHOD
    }

    fn accepted_cards(&self) -> &[CardBrand] {
        &self.accepted_cards
    }

    async fn process_payment(
        &self,
        checkout: &Checkout,
        purchase: &Purchase,
    ) -> PaymentResult<Payment> {
        if let GuardDecision::Existing(payment) = self.guard.check(purchase, PAYMENT_METHOD).await? {
            return Ok(payment);
        }

        self.authorize(checkout, purchase).await.inspect_err(|e| {
            argofire_log::warn!(
                "ArgoFire payment for purchase {} failed ({:?}): {}",
                purchase.id,
                e.kind(),
                e
            );
        })
    }

    async fn complete_purchase(&self, purchase: &Purchase) -> PaymentResult<()> {
        self.lifecycle.complete_purchase(purchase).await
    }
}

impl std::fmt::Debug for ArgoFireProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgoFireProcessor")
            .field("mode", &self.settings.mode)
            .field("accepted_cards", &self.accepted_cards)
            .finish_non_exhaustive()
    }
}
