use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

// ASCII digits only: `\d` would also accept other scripts' digits
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<int>[0-9]*)(?:\.(?<frac>[0-9]*))?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("not a number")]
    NotANumber,
}

/// Largest amount, and largest monthly total, in cents.
/// Fifteen significant digits survive the trip through a YAML float exactly.
pub const MAX_CENTS: u64 = 999_999_999_999_999;

/// Non-negative money amount, kept as whole cents, never above `MAX_CENTS`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount::from_cents(0);
    pub const MAX: Amount = Amount::from_cents(MAX_CENTS);

    pub const fn from_cents(cents: u64) -> Self {
        Amount(cents)
    }

    fn bounded(cents: u64) -> Option<Amount> {
        (cents <= MAX_CENTS).then_some(Amount(cents))
    }

    /// `None` if the result would exceed `Amount::MAX`
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).and_then(Amount::bounded)
    }

    /// Exact sum of amounts, or `None` if it would exceed `Amount::MAX`
    pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Amount>) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, amount| acc.checked_add(*amount))
    }

    fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    fn from_f64(value: f64) -> Option<Amount> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        // `as` saturates, so anything huge lands above MAX_CENTS
        Amount::bounded((value * 100.0).round() as u64)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Parse user text into an amount.
///
/// Accepts both `12.5` and `12,5`. Signs, exponents, thousands separators and
/// anything finer than a cent are rejected, and so is anything above
/// `Amount::MAX`.
pub fn parse_amount(text: &str) -> Result<Amount, ParseError> {
    let normalized = text.trim().replace(',', ".");
    let captures = AMOUNT_RE
        .captures(&normalized)
        .ok_or(ParseError::NotANumber)?;

    let int_part = captures.name("int").map_or("", |m| m.as_str());
    let frac_part = captures
        .name("frac")
        .map_or("", |m| m.as_str())
        .trim_end_matches('0');

    if int_part.is_empty() && captures.name("frac").is_none_or(|m| m.as_str().is_empty()) {
        return Err(ParseError::NotANumber);
    }
    if frac_part.len() > 2 {
        return Err(ParseError::NotANumber);
    }

    let units = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<u64>()
            .map_err(|_| ParseError::NotANumber)?
    };
    let fraction = format!("{:0<2}", frac_part)
        .parse::<u64>()
        .map_err(|_| ParseError::NotANumber)?;

    units
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction))
        .and_then(Amount::bounded)
        .ok_or(ParseError::NotANumber)
}

impl FromStr for Amount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_f64(value).ok_or_else(|| {
            de::Error::invalid_value(
                de::Unexpected::Float(value),
                &"a finite non-negative amount within the maximum",
            )
        })
    }
}
