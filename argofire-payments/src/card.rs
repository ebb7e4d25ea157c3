//! Card brands and masking

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card networks the gateway can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Diners,
    Discover,
    Jcb,
    Maestro,
    Unknown,
}

/// Brands enabled unless settings say otherwise. Discover and Maestro are
/// routable but switched off for this merchant account type.
pub const DEFAULT_ACCEPTED_CARDS: &[CardBrand] = &[
    CardBrand::Visa,
    CardBrand::Mastercard,
    CardBrand::Amex,
    CardBrand::Diners,
    CardBrand::Jcb,
];

impl CardBrand {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "visa" => Some(Self::Visa),
            "mastercard" | "mc" => Some(Self::Mastercard),
            "amex" | "american_express" => Some(Self::Amex),
            "diners" | "diners_club" => Some(Self::Diners),
            "discover" => Some(Self::Discover),
            "jcb" => Some(Self::Jcb),
            "maestro" => Some(Self::Maestro),
            _ => None,
        }
    }

    /// Parse a settings list, rejecting names we do not know.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> PaymentResult<Vec<Self>> {
        names
            .iter()
            .map(|name| {
                Self::parse(name.as_ref()).ok_or_else(|| {
                    PaymentError::Config(format!("unknown card brand: {}", name.as_ref()))
                })
            })
            .collect()
    }

    /// Identify the brand from the leading digits (IIN ranges).
    pub fn detect(number: &str) -> Self {
        let digits = digits_only(number);
        let prefix = |len: usize| -> u32 {
            digits
                .get(..len.min(digits.len()))
                .and_then(|p| p.parse().ok())
                .unwrap_or(0)
        };

        if digits.len() < 12 {
            return Self::Unknown;
        }

        let p1 = prefix(1);
        let p2 = prefix(2);
        let p3 = prefix(3);
        let p4 = prefix(4);
        let p6 = prefix(6);

        if matches!(p4, 5018 | 5020 | 5038 | 5893 | 6304 | 6759 | 6761..=6763) {
            Self::Maestro
        } else if p1 == 4 {
            Self::Visa
        } else if (51..=55).contains(&p2) || (2221..=2720).contains(&p4) {
            Self::Mastercard
        } else if p2 == 34 || p2 == 37 {
            Self::Amex
        } else if (300..=305).contains(&p3) || p2 == 36 || p2 == 38 || p2 == 39 {
            Self::Diners
        } else if p4 == 6011 || p2 == 65 || (644..=649).contains(&p3) || (622126..=622925).contains(&p6)
        {
            Self::Discover
        } else if (3528..=3589).contains(&p4) {
            Self::Jcb
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Diners => "diners",
            Self::Discover => "discover",
            Self::Jcb => "jcb",
            Self::Maestro => "maestro",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn digits_only(number: &str) -> String {
    number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

/// Replace all but the last four characters with `X`.
pub fn mask_card_number(number: &str) -> String {
    let cleaned = digits_only(number);
    let len = cleaned.chars().count();
    if len <= 4 {
        return cleaned;
    }

    let last_four: String = cleaned.chars().skip(len - 4).collect();
    format!("{}{}", "X".repeat(len - 4), last_four)
}
