//! `ProcessCreditCard` request construction
//!
//! The gateway takes an ordered list of name-value pairs. Field order is
//! fixed, `PNRef` and `MagData` are always present and empty, and the
//! optional billing details travel inside the `ExtData` group, which the
//! gateway expects as an inline XML fragment.
//!
//! ```text
//! UserName=..&Password=..&PNRef=&TransType=Sale&CardNum=..&ExpDate=0325&MagData=
//!   &NameOnCard=..&Amount=56.00&InvNum=7&Zip=..&Street=..&CVNum=..
//!   &ExtData=<City>..</City><BillToState>..</BillToState><CustomerID>3</CustomerID>
//!            <ShippingAmt>4.99</ShippingAmt><TaxAmt>1.01</TaxAmt>
//! ```

use crate::card::mask_card_number;
use crate::error::{PaymentError, PaymentResult};
use crate::types::{Checkout, Purchase};
use argofire_config::GatewaySettings;
use secrecy::{ExposeSecret, SecretString};

/// Transaction type sent on every authorization.
pub const TRANS_TYPE_SALE: &str = "Sale";

/// Value of a single request field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    /// Password, card number, CVV. Hidden from `Debug` and dumps.
    Sensitive(SecretString),
    /// Nested `ExtData` entries, in order.
    Group(Vec<(&'static str, String)>),
}

impl FieldValue {
    fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    fn encoded(&self) -> String {
        match self {
            FieldValue::Text(value) => value.clone(),
            FieldValue::Sensitive(secret) => secret.expose_secret().to_string(),
            FieldValue::Group(entries) => render_group(entries),
        }
    }
}

fn render_group(entries: &[(&'static str, String)]) -> String {
    entries
        .iter()
        .map(|(name, value)| format!("<{name}>{value}</{name}>"))
        .collect()
}

/// Ordered field mapping for one authorization attempt.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    fields: Vec<(&'static str, FieldValue)>,
}

impl TransactionRequest {
    fn push(&mut self, name: &'static str, value: FieldValue) {
        self.fields.push((name, value));
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Plain-text field value; `None` for sensitive or grouped fields.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Entry of the `ExtData` group.
    pub fn ext_data(&self, name: &str) -> Option<&str> {
        match self.get("ExtData") {
            Some(FieldValue::Group(entries)) => entries
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Wire body: `key=value` pairs joined by `&`. The gateway expects the
    /// values unescaped.
    pub fn encode(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.encoded()))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Same shape as [`encode`](Self::encode) with secrets masked, for
    /// diagnostic dumps.
    pub fn redacted(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| {
                let shown = match value {
                    FieldValue::Sensitive(secret) if *name == "CardNum" => {
                        mask_card_number(secret.expose_secret())
                    }
                    FieldValue::Sensitive(_) => "********".to_string(),
                    other => other.encoded(),
                };
                format!("{}={}", name, shown)
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// `MMYY`: month padded to two digits, last two digits of the year.
pub fn format_expiration(month: u32, year: u32) -> String {
    format!("{:02}{:02}", month, year % 100)
}

/// Build the `Sale` request for the share of `purchase` paid by `method`.
pub fn build_sale(
    settings: &GatewaySettings,
    checkout: &Checkout,
    purchase: &Purchase,
    method: &str,
) -> PaymentResult<TransactionRequest> {
    let card = checkout
        .card
        .as_ref()
        .ok_or_else(|| PaymentError::Precondition("card details missing from checkout".into()))?;
    let billing = checkout
        .billing
        .as_ref()
        .ok_or_else(|| PaymentError::Precondition("billing address missing from checkout".into()))?;

    if billing.street.trim().is_empty() {
        return Err(PaymentError::Precondition("billing street missing".into()));
    }
    if billing.postal_code.trim().is_empty() {
        return Err(PaymentError::Precondition("billing postal code missing".into()));
    }

    if !(1..=12).contains(&card.exp_month) {
        return Err(PaymentError::Precondition(format!(
            "invalid expiration month: {}",
            card.exp_month
        )));
    }

    let mut request = TransactionRequest::default();
    request.push("UserName", FieldValue::text(&settings.username));
    request.push("Password", FieldValue::Sensitive(settings.password().clone()));
    request.push("PNRef", FieldValue::text(""));
    request.push("TransType", FieldValue::text(TRANS_TYPE_SALE));
    request.push("CardNum", FieldValue::Sensitive(card.number.clone()));
    request.push(
        "ExpDate",
        FieldValue::text(format_expiration(card.exp_month, card.exp_year)),
    );
    request.push("MagData", FieldValue::text(""));
    request.push("NameOnCard", FieldValue::text(&card.name));
    request.push("Amount", FieldValue::text(purchase.total(method).gateway_format()));
    request.push("InvNum", FieldValue::text(purchase.id.to_string()));
    request.push("Zip", FieldValue::text(&billing.postal_code));
    request.push("Street", FieldValue::text(&billing.street));
    request.push("CVNum", FieldValue::Sensitive(card.cvv.clone()));
    request.push(
        "ExtData",
        FieldValue::Group(vec![
            ("City", billing.city.clone()),
            ("BillToState", billing.zone.clone()),
            ("CustomerID", purchase.user_id.to_string()),
            ("ShippingAmt", purchase.shipping_total(method).gateway_format()),
            ("TaxAmt", purchase.tax_total(method).gateway_format()),
        ]),
    );

    Ok(request)
}
