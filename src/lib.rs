// ArgoFire - credit card gateway adapter
//
// This library bridges purchase records to the ArgoFire (TPISoft SmartPayments)
// gateway: settings, request building, transport, response interpretation and
// the authorize/complete payment lifecycle.

// Re-export the adapter
pub use argofire_payments::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use argofire_config;

#[cfg(feature = "config")]
pub use argofire_config::{GatewaySettings, Mode, SettingsLoader};

#[cfg(feature = "log")]
pub use argofire_log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Address,
        ArgoFireProcessor,
        CardBrand,
        CardSnapshot,
        Checkout,
        CreditCardProcessor,
        FailureKind,
        GatewayTransport,
        InMemoryPaymentStore,
        LineItem,
        Money,
        PAYMENT_METHOD,
        Payment,
        PaymentError,
        PaymentEvent,
        PaymentEventBus,
        PaymentEventHandler,
        PaymentEventType,
        PaymentResult,
        PaymentStatus,
        PaymentStore,
        Purchase,
    };

    #[cfg(feature = "config")]
    pub use crate::{GatewaySettings, Mode, SettingsLoader};
}
