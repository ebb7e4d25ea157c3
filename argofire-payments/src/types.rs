//! Checkout, purchase and payment data structures

use crate::error::{PaymentError, PaymentResult};
use crate::money::Money;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type PurchaseId = u64;
pub type DealId = u64;
pub type UserId = u64;

/// Billing or shipping address captured at checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    /// State, province or region
    pub zone: String,
    pub postal_code: String,
    pub country: String,
}

/// Card data cached on the checkout session. Never persisted; the number
/// and CVV stay wrapped so they cannot leak through `Debug`.
#[derive(Debug, Clone)]
pub struct CardSnapshot {
    pub number: SecretString,
    pub exp_month: u32,
    pub exp_year: u32,
    pub name: String,
    pub cvv: SecretString,
}

impl CardSnapshot {
    pub fn new(
        number: impl Into<String>,
        exp_month: u32,
        exp_year: u32,
        name: impl Into<String>,
        cvv: impl Into<String>,
    ) -> Self {
        Self {
            number: SecretString::new(number.into().into()),
            exp_month,
            exp_year,
            name: name.into(),
            cvv: SecretString::new(cvv.into().into()),
        }
    }
}

/// Checkout session state handed over by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    pub billing: Option<Address>,
    pub shipping: Option<Address>,
    pub card: Option<CardSnapshot>,
}

impl Checkout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn billing(mut self, address: Address) -> Self {
        self.billing = Some(address);
        self
    }

    pub fn shipping(mut self, address: Address) -> Self {
        self.shipping = Some(address);
        self
    }

    pub fn card(mut self, card: CardSnapshot) -> Self {
        self.card = Some(card);
        self
    }
}

/// One purchased line, with the share of its price each payment method covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub deal_id: DealId,
    pub quantity: u32,
    pub unit_price: Money,
    /// Payment method label -> amount that method pays for this line
    #[serde(default)]
    pub payment_method: BTreeMap<String, Money>,
}

impl LineItem {
    pub fn new(deal_id: DealId, quantity: u32, unit_price: Money) -> Self {
        Self {
            deal_id,
            quantity,
            unit_price,
            payment_method: BTreeMap::new(),
        }
    }

    /// Assign part of this line to a payment method
    pub fn paid_with(mut self, method: impl Into<String>, amount: Money) -> Self {
        self.payment_method.insert(method.into(), amount);
        self
    }

    pub fn is_paid_with(&self, method: &str) -> bool {
        self.payment_method.contains_key(method)
    }
}

/// Purchase record owned by the host platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    /// Payment method label -> shipping charged to it
    #[serde(default)]
    pub shipping_totals: BTreeMap<String, Money>,
    /// Payment method label -> tax charged to it
    #[serde(default)]
    pub tax_totals: BTreeMap<String, Money>,
}

impl Purchase {
    pub fn new(id: PurchaseId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            items: Vec::new(),
            shipping_totals: BTreeMap::new(),
            tax_totals: BTreeMap::new(),
        }
    }

    pub fn item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn shipping_for(mut self, method: impl Into<String>, amount: Money) -> Self {
        self.shipping_totals.insert(method.into(), amount);
        self
    }

    pub fn tax_for(mut self, method: impl Into<String>, amount: Money) -> Self {
        self.tax_totals.insert(method.into(), amount);
        self
    }

    pub fn subtotal(&self, method: &str) -> Money {
        self.items
            .iter()
            .filter_map(|item| item.payment_method.get(method))
            .sum()
    }

    pub fn shipping_total(&self, method: &str) -> Money {
        self.shipping_totals.get(method).copied().unwrap_or_default()
    }

    pub fn tax_total(&self, method: &str) -> Money {
        self.tax_totals.get(method).copied().unwrap_or_default()
    }

    /// What `method` owes: its line shares plus its shipping and tax.
    pub fn total(&self, method: &str) -> Money {
        self.subtotal(method) + self.shipping_total(method) + self.tax_total(method)
    }

    /// Sum over every payment method.
    pub fn grand_total(&self) -> Money {
        let lines: Money = self
            .items
            .iter()
            .flat_map(|item| item.payment_method.values())
            .sum();
        lines
            + self.shipping_totals.values().sum::<Money>()
            + self.tax_totals.values().sum::<Money>()
    }

    /// Lines funded by `method`, grouped by deal.
    pub fn deals_for(&self, method: &str) -> BTreeMap<DealId, Vec<LineItem>> {
        let mut deals: BTreeMap<DealId, Vec<LineItem>> = BTreeMap::new();
        for item in self.items.iter().filter(|item| item.is_paid_with(method)) {
            deals.entry(item.deal_id).or_default().push(item.clone());
        }
        deals
    }

    /// Every deal in the purchase, first-seen order, without repeats.
    pub fn deal_ids(&self) -> Vec<DealId> {
        let mut ids = Vec::new();
        for item in &self.items {
            if !ids.contains(&item.deal_id) {
                ids.push(item.deal_id);
            }
        }
        ids
    }
}

/// Payment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Payment status. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Authorized,
    Complete,
}

impl PaymentStatus {
    fn rank(&self) -> u8 {
        match self {
            Self::Authorized => 0,
            Self::Complete => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data kept on the payment for later credits and audits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentData {
    pub masked_cc_number: String,
    pub uncaptured_deals: BTreeMap<DealId, Vec<LineItem>>,
    /// Decoded gateway response, attached after authorization
    pub api_response: Option<serde_json::Value>,
}

/// Stored payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub payment_method: String,
    pub purchase_id: PurchaseId,
    pub amount: Money,
    pub status: PaymentStatus,
    /// Gateway PNRef
    pub transaction_id: String,
    pub deals: BTreeMap<DealId, Vec<LineItem>>,
    pub shipping_address: Option<Address>,
    pub data: PaymentData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Move to `to`. Returns `Ok(false)` when already there; moving
    /// backward is an error.
    pub fn transition(&mut self, to: PaymentStatus) -> PaymentResult<bool> {
        if self.status == to {
            return Ok(false);
        }
        if to.rank() < self.status.rank() {
            return Err(PaymentError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(true)
    }
}

/// Payment creation request handed to the store
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_method: String,
    pub purchase_id: PurchaseId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub deals: BTreeMap<DealId, Vec<LineItem>>,
    pub shipping_address: Option<Address>,
    pub data: PaymentData,
}

impl NewPayment {
    pub fn into_payment(self) -> Payment {
        let now = Utc::now();
        Payment {
            id: PaymentId::new(),
            payment_method: self.payment_method,
            purchase_id: self.purchase_id,
            amount: self.amount,
            status: self.status,
            transaction_id: self.transaction_id,
            deals: self.deals,
            shipping_address: self.shipping_address,
            data: self.data,
            created_at: now,
            updated_at: now,
        }
    }
}
