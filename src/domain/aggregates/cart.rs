//! Cart ledger
//!
//! Line items reference products in the active catalog by id; the ledger
//! never owns product data. Totals are recomputed on demand from the catalog
//! prices, never cached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::catalog::CatalogPayload;
use crate::domain::events::CartEvent;
use crate::domain::value_objects::Money;

pub const SNAPSHOT_VERSION: u32 = 1;

/// One cart row. Insertion order is display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Serialization contract for persisting a cart between sessions.
/// Storage itself is the caller's concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CartSnapshot {
    pub version: u32,
    pub items: Vec<LineItem>,
}

/// Derived totals. Never stored; recompute after every mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Totals {
    pub item_count: u32,
    pub subtotal: Money,
    pub retail_value: Money,
    pub profit: Money,
    pub margin_percent: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartLedger {
    items: Vec<LineItem>,
    events: Vec<CartEvent>,
}

impl CartLedger {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Merges onto an existing line for the same product, otherwise appends.
    pub fn add_item(&mut self, catalog: &CatalogPayload, product_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity(0)); }
        if catalog.product(product_id).is_none() {
            return Err(CartError::UnknownProduct(product_id.to_string()));
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            let quantity = existing.quantity;
            self.raise(CartEvent::QuantityChanged { product_id: product_id.to_string(), quantity });
        } else {
            self.items.push(LineItem { product_id: product_id.to_string(), quantity });
            self.raise(CartEvent::ItemAdded { product_id: product_id.to_string(), quantity });
        }
        Ok(())
    }

    /// Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.to_string()))?;
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
            self.raise(CartEvent::ItemRemoved { product_id: product_id.to_string() });
        } else {
            item.quantity = quantity;
            self.raise(CartEvent::QuantityChanged { product_id: product_id.to_string(), quantity });
        }
        Ok(())
    }

    /// Idempotent: removing an absent line leaves the ledger untouched.
    pub fn remove_item(&mut self, product_id: &str) {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() != before {
            self.raise(CartEvent::ItemRemoved { product_id: product_id.to_string() });
        }
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.raise(CartEvent::Cleared);
        }
    }

    pub fn totals(&self, catalog: &CatalogPayload) -> Totals {
        let currency = catalog.currency();
        let mut item_count = 0u32;
        let mut subtotal = Decimal::ZERO;
        let mut retail = Decimal::ZERO;
        for line in &self.items {
            let Some(product) = catalog.product(&line.product_id) else {
                tracing::warn!(product_id = %line.product_id, "line references product missing from catalog; excluded from totals");
                continue;
            };
            let qty = Decimal::from(line.quantity);
            item_count += line.quantity;
            subtotal += qty * product.unit_price;
            retail += qty * product.msrp;
        }
        let profit = retail - subtotal;
        let margin_percent = if retail.is_zero() {
            Decimal::ZERO
        } else {
            profit / retail * Decimal::ONE_HUNDRED
        };
        Totals {
            item_count,
            subtotal: Money::new(subtotal, currency),
            retail_value: Money::new(retail, currency),
            profit: Money::new(profit, currency),
            margin_percent,
        }
    }

    pub fn meets_minimum(&self, catalog: &CatalogPayload) -> bool {
        self.totals(catalog).subtotal.amount() >= catalog.company.minimum_order
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot { version: SNAPSHOT_VERSION, items: self.items.clone() }
    }

    /// Rebuilds a ledger from a snapshot against the active catalog. Lines
    /// whose product no longer exists are dropped and their ids returned so
    /// the caller can surface them. An unsupported snapshot version restores
    /// an empty ledger.
    pub fn restore(snapshot: CartSnapshot, catalog: &CatalogPayload) -> (Self, Vec<String>) {
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(version = snapshot.version, "unsupported cart snapshot version; starting empty");
            return (Self::new(), Vec::new());
        }
        let mut ledger = Self::new();
        let mut dropped = Vec::new();
        for line in snapshot.items {
            if line.quantity == 0 { continue; }
            if catalog.product(&line.product_id).is_some() {
                ledger.items.push(line);
            } else {
                dropped.push(line.product_id);
            }
        }
        (ledger, dropped)
    }

    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }
    fn raise(&mut self, e: CartEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("product {0} is not in the active catalog")]
    UnknownProduct(String),
    #[error("no cart line for product {0}")]
    ItemNotFound(String),
    #[error("invalid quantity {0}")]
    InvalidQuantity(u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::catalog::{Company, Customer, CustomerTier, Product};
    use chrono::Utc;

    fn product(id: &str, unit_price: Decimal, msrp: Decimal) -> Product {
        Product {
            id: id.into(), sku: format!("SKU-{id}"), title: format!("Product {id}"),
            unit_price, msrp, margin_percent: None, category: "Games".into(),
            publisher: "Acme".into(), min_qty: 1, case_qty: 6, in_stock: true, featured: false,
        }
    }

    fn catalog(minimum_order: Decimal, products: Vec<Product>) -> CatalogPayload {
        CatalogPayload {
            format_version: "1".into(),
            generated_at: Utc::now(),
            expires_at: None,
            allow_empty: false,
            company: Company { name: "Acme Wholesale".into(), minimum_order, currency: "USD".into() },
            customer: Customer {
                id: "C-1".into(), name: "Corner Shop".into(), tier: CustomerTier::Gold,
                discount_rate: Decimal::new(10, 0), credit_limit: Decimal::new(5000, 0),
            },
            products,
        }
    }

    fn two_product_catalog() -> CatalogPayload {
        catalog(Decimal::new(50, 0), vec![
            product("P1", Decimal::new(900, 2), Decimal::new(1699, 2)),
            product("P2", Decimal::new(500, 2), Decimal::new(1000, 2)),
        ])
    }

    #[test]
    fn test_add_merges_quantities() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.add_item(&cat, "P1", 1).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_add_unknown_product() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        assert_eq!(cart.add_item(&cat, "NOPE", 1), Err(CartError::UnknownProduct("NOPE".into())));
    }

    #[test]
    fn test_add_zero_quantity() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        assert_eq!(cart.add_item(&cat, "P1", 0), Err(CartError::InvalidQuantity(0)));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.set_quantity("P1", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_absent_line() {
        let mut cart = CartLedger::new();
        assert_eq!(cart.set_quantity("P1", 3), Err(CartError::ItemNotFound("P1".into())));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        let before = cart.clone();
        cart.remove_item("MISSING");
        assert_eq!(cart, before);
    }

    #[test]
    fn test_totals_worked_example() {
        // 2 x (9.00 / 16.99) + 1 x (5.00 / 10.00)
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.add_item(&cat, "P2", 1).unwrap();
        let totals = cart.totals(&cat);
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.subtotal.amount(), Decimal::new(2300, 2));
        assert_eq!(totals.retail_value.amount(), Decimal::new(4398, 2));
        assert_eq!(totals.profit.amount(), Decimal::new(2098, 2));
        assert_eq!(totals.margin_percent.round_dp(2), Decimal::new(4770, 2));
    }

    #[test]
    fn test_totals_empty_cart_no_divide_fault() {
        let cat = two_product_catalog();
        let cart = CartLedger::new();
        let totals = cart.totals(&cat);
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_minimum_gate_boundary() {
        let cat = catalog(Decimal::new(850, 0), vec![
            product("P1", Decimal::new(84999, 2), Decimal::new(99999, 2)),
            product("P2", Decimal::new(1, 2), Decimal::new(100, 2)),
        ]);
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 1).unwrap();
        assert!(!cart.meets_minimum(&cat)); // 849.99 < 850
        cart.add_item(&cat, "P2", 1).unwrap();
        assert!(cart.meets_minimum(&cat)); // 850.00
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.add_item(&cat, "P2", 4).unwrap();
        let (restored, dropped) = CartLedger::restore(cart.snapshot(), &cat);
        assert_eq!(restored.items(), cart.items());
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_restore_drops_orphaned_lines() {
        let cat = two_product_catalog();
        let snapshot = CartSnapshot {
            version: SNAPSHOT_VERSION,
            items: vec![
                LineItem { product_id: "P1".into(), quantity: 2 },
                LineItem { product_id: "GONE".into(), quantity: 5 },
            ],
        };
        let (restored, dropped) = CartLedger::restore(snapshot, &cat);
        assert_eq!(restored.items().len(), 1);
        assert_eq!(dropped, vec!["GONE".to_string()]);
    }

    #[test]
    fn test_events_drain() {
        let cat = two_product_catalog();
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.remove_item("P1");
        let events = cart.take_events();
        assert_eq!(events, vec![
            CartEvent::ItemAdded { product_id: "P1".into(), quantity: 2 },
            CartEvent::ItemRemoved { product_id: "P1".into() },
        ]);
        assert!(cart.take_events().is_empty());
    }
}
