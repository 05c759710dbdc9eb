//! Server-side price table for credit packs.
//!
//! The amount charged for an order always comes from this table, never from
//! client input. Amounts are in the smallest unit of the currency (cents,
//! paise, ...), which is also what the payment provider expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BillingError, Result};

/// Supported checkout currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US dollar.
    Usd,
    /// Indian rupee.
    Inr,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Self; 4] = [Self::Usd, Self::Inr, Self::Eur, Self::Gbp];

    /// ISO 4217 code, as sent to the provider.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Inr => "INR",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BillingError::UnsupportedCurrency(s.to_string()))
    }
}

/// Credit packs on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    /// 10 credits.
    #[serde(rename = "proPack")]
    ProPack,
    /// 50 credits.
    #[serde(rename = "business")]
    Business,
}

impl Product {
    /// All products in the catalog.
    pub const ALL: [Self; 2] = [Self::ProPack, Self::Business];

    /// Wire name of the product.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProPack => "proPack",
            Self::Business => "business",
        }
    }

    /// Credits granted by one purchase.
    #[must_use]
    pub const fn credits(&self) -> i64 {
        match self {
            Self::ProPack => 10,
            Self::Business => 50,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BillingError::UnknownProduct(s.to_string()))
    }
}

/// One entry of the price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Checkout currency.
    pub currency: Currency,
    /// Product purchased.
    pub product: Product,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Credits granted.
    pub credits: i64,
}

/// The full set of prices offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: Vec<Price>,
}

impl PriceTable {
    /// Build a table from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidAmount` if any amount or credit count is
    /// not positive, or if a `(currency, product)` pair appears twice.
    pub fn new(prices: Vec<Price>) -> Result<Self> {
        for (i, price) in prices.iter().enumerate() {
            if price.amount <= 0 || price.credits <= 0 {
                return Err(BillingError::InvalidAmount(format!(
                    "{} {} must have a positive amount and credit count",
                    price.currency, price.product
                )));
            }
            if prices[..i]
                .iter()
                .any(|p| p.currency == price.currency && p.product == price.product)
            {
                return Err(BillingError::InvalidAmount(format!(
                    "duplicate price for {} {}",
                    price.currency, price.product
                )));
            }
        }
        Ok(Self { prices })
    }

    /// Look up the price of a product in a currency.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::PriceUnavailable` if the pair is not on sale.
    pub fn price(&self, currency: Currency, product: Product) -> Result<Price> {
        self.prices
            .iter()
            .find(|p| p.currency == currency && p.product == product)
            .copied()
            .ok_or_else(|| BillingError::PriceUnavailable {
                currency: currency.to_string(),
                product: product.to_string(),
            })
    }

    /// All entries, in table order.
    #[must_use]
    pub fn prices(&self) -> &[Price] {
        &self.prices
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        let entry = |currency, product: Product, amount| Price {
            currency,
            product,
            amount,
            credits: product.credits(),
        };

        Self {
            prices: vec![
                entry(Currency::Usd, Product::ProPack, 499), // $4.99
                entry(Currency::Usd, Product::Business, 1999),
                entry(Currency::Inr, Product::ProPack, 19_900), // Rs 199
                entry(Currency::Inr, Product::Business, 79_900),
                entry(Currency::Eur, Product::ProPack, 499),
                entry(Currency::Eur, Product::Business, 1899),
                entry(Currency::Gbp, Product::ProPack, 399),
                entry(Currency::Gbp, Product::Business, 1599),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_parsing_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::Usd));
        assert_eq!("INR".parse::<Currency>(), Ok(Currency::Inr));
        assert_eq!(
            "JPY".parse::<Currency>(),
            Err(BillingError::UnsupportedCurrency("JPY".into()))
        );
    }

    #[test]
    fn product_parsing() {
        assert_eq!("proPack".parse::<Product>(), Ok(Product::ProPack));
        assert_eq!("BUSINESS".parse::<Product>(), Ok(Product::Business));
        assert!("enterprise".parse::<Product>().is_err());
    }

    #[test]
    fn product_wire_names() {
        assert_eq!(serde_json::to_string(&Product::ProPack).unwrap(), "\"proPack\"");
        assert_eq!(serde_json::to_string(&Currency::Gbp).unwrap(), "\"GBP\"");
    }

    #[test]
    fn default_table_covers_every_pair() {
        let table = PriceTable::default();
        for currency in Currency::ALL {
            for product in Product::ALL {
                let price = table.price(currency, product).unwrap();
                assert!(price.amount > 0);
                assert_eq!(price.credits, product.credits());
            }
        }
        assert_eq!(table.prices().len(), 8);
    }

    #[test]
    fn pro_pack_grants_ten_credits() {
        let price = PriceTable::default()
            .price(Currency::Usd, Product::ProPack)
            .unwrap();
        assert_eq!(price.credits, 10);
        assert_eq!(price.amount, 499);
    }

    #[test]
    fn table_rejects_bad_entries() {
        let bad = Price {
            currency: Currency::Usd,
            product: Product::ProPack,
            amount: 0,
            credits: 10,
        };
        assert!(PriceTable::new(vec![bad]).is_err());

        let good = Price { amount: 100, ..bad };
        assert!(PriceTable::new(vec![good, good]).is_err());

        let table = PriceTable::new(vec![good]).unwrap();
        assert!(matches!(
            table.price(Currency::Eur, Product::ProPack),
            Err(BillingError::PriceUnavailable { .. })
        ));
    }
}
