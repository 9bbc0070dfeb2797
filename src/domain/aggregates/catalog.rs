//! Catalog payload
//!
//! The personalized catalog a transport token carries: company terms, the
//! customer it was generated for, and their price list. These are wire types
//! with strict shapes; unknown fields are rejected rather than stripped.
//! A payload is immutable once decoded — it is superseded, never edited.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogPayload {
    #[validate(length(min = 1))]
    pub format_version: String,
    pub generated_at: DateTime<Utc>,
    /// Absent on payloads from generators that predate expiry stamping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Generators set this to ship a deliberately empty catalog.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_empty: bool,
    #[validate]
    pub company: Company,
    #[validate]
    pub customer: Customer,
    #[validate]
    pub products: Vec<Product>,
}

impl CatalogPayload {
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn currency(&self) -> &str { &self.company.currency }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Company {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(custom = "non_negative")]
    pub minimum_order: Decimal,
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Customer {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub tier: CustomerTier,
    /// Percent, 0-100.
    #[validate(custom = "percent_range")]
    pub discount_rate: Decimal,
    #[validate(custom = "non_negative")]
    pub credit_limit: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier { #[default] Standard, Silver, Gold, Platinum }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Product {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(min = 1))]
    pub title: String,
    /// Customer-specific price; must not exceed `msrp`.
    #[validate(custom = "non_negative")]
    pub unit_price: Decimal,
    #[validate(custom = "non_negative")]
    pub msrp: Decimal,
    /// Precomputed by the generator; checked against the price pair on decode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_percent: Option<Decimal>,
    pub category: String,
    pub publisher: String,
    #[validate(range(min = 1))]
    pub min_qty: u32,
    #[validate(range(min = 1))]
    pub case_qty: u32,
    pub in_stock: bool,
    pub featured: bool,
}

impl Product {
    /// Margin implied by the price pair, as a percent of msrp.
    pub fn derived_margin(&self) -> Decimal {
        if self.msrp.is_zero() { return Decimal::ZERO; }
        (self.msrp - self.unit_price) / self.msrp * Decimal::ONE_HUNDRED
    }

    pub fn unit_profit(&self) -> Decimal { self.msrp - self.unit_price }
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() { return Err(ValidationError::new("negative")); }
    Ok(())
}

fn percent_range(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("out_of_range"));
    }
    Ok(())
}
