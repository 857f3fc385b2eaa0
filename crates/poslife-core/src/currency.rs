//! Currencies and currency pairs.
//!
//! A `CurrencyPair` is written `BASE/QUOTE` (e.g. `ETH/BTC`) both in
//! `Display` output and in its serde representation.

use crate::decimal::{Amount, Price};
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A currency code, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a currency from its code.
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// A tradable currency pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: Currency,
    quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// Currency being bought or sold.
    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// Currency prices are expressed in.
    pub fn quote(&self) -> &Currency {
        &self.quote
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidCurrencyPair(s.to_string()))?;
        let base =
            Currency::new(base).map_err(|_| CoreError::InvalidCurrencyPair(s.to_string()))?;
        let quote =
            Currency::new(quote).map_err(|_| CoreError::InvalidCurrencyPair(s.to_string()))?;
        if base == quote {
            return Err(CoreError::InvalidCurrencyPair(s.to_string()));
        }
        Ok(Self { base, quote })
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.to_string()
    }
}

/// A decimal value tagged with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub value: Decimal,
    pub currency: Currency,
}

impl CurrencyAmount {
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Amount in the pair's base currency.
    pub fn of_amount(amount: Amount, pair: &CurrencyPair) -> Self {
        Self::new(amount.inner(), pair.base().clone())
    }

    /// Price in the pair's quote currency.
    pub fn of_price(price: Price, pair: &CurrencyPair) -> Self {
        Self::new(price.inner(), pair.quote().clone())
    }
}

impl fmt::Display for CurrencyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}
