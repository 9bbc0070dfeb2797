//! Flat order export
//!
//! Renders ledger state into row records for download or email handoff.
//! Fails closed when the minimum-order gate is not met, carrying the
//! shortfall so the caller can prompt the user. Row order follows ledger
//! insertion order; identical ledger state always produces identical output.

use rust_decimal::Decimal;
use std::borrow::Cow;
use std::fmt::Write as _;
use thiserror::Error;

use crate::domain::aggregates::cart::{CartLedger, Totals};
use crate::domain::aggregates::catalog::CatalogPayload;
use crate::domain::value_objects::Money;

/// Column contract consumed by spreadsheet tooling downstream.
/// Names and order are load-bearing.
pub const EXPORT_COLUMNS: [&str; 6] = ["SKU", "Title", "Quantity", "UnitPrice", "LineTotal", "LineProfit"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("minimum order not met; short by {shortfall}")]
    MinimumNotMet { shortfall: Money },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRow {
    pub sku: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub line_profit: Decimal,
}

#[derive(Clone, Debug)]
pub struct OrderExport {
    rows: Vec<ExportRow>,
    totals: Totals,
}

pub fn export(ledger: &CartLedger, catalog: &CatalogPayload) -> Result<OrderExport, ExportError> {
    let totals = ledger.totals(catalog);
    let minimum = catalog.company.minimum_order;
    if totals.subtotal.amount() < minimum {
        let shortfall = Money::new(minimum - totals.subtotal.amount(), catalog.currency());
        return Err(ExportError::MinimumNotMet { shortfall });
    }

    let mut rows = Vec::with_capacity(ledger.items().len());
    for line in ledger.items() {
        let Some(product) = catalog.product(&line.product_id) else {
            tracing::warn!(product_id = %line.product_id, "skipping line for product missing from catalog");
            continue;
        };
        let qty = Decimal::from(line.quantity);
        rows.push(ExportRow {
            sku: product.sku.clone(),
            title: product.title.clone(),
            quantity: line.quantity,
            unit_price: product.unit_price,
            line_total: qty * product.unit_price,
            line_profit: qty * product.unit_profit(),
        });
    }
    Ok(OrderExport { rows, totals })
}

impl OrderExport {
    pub fn rows(&self) -> &[ExportRow] { &self.rows }
    pub fn totals(&self) -> &Totals { &self.totals }

    /// Header, one row per line item, then a trailing summary row.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&EXPORT_COLUMNS.join(","));
        out.push('\n');
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{},{},{},{:.2},{:.2},{:.2}",
                csv_field(&row.sku),
                csv_field(&row.title),
                row.quantity,
                row.unit_price,
                row.line_total,
                row.line_profit,
            );
        }
        let _ = writeln!(
            out,
            "TOTAL,,{},,{:.2},{:.2}",
            self.totals.item_count,
            self.totals.subtotal.amount(),
            self.totals.profit.amount(),
        );
        out
    }
}

fn csv_field(raw: &str) -> Cow<'_, str> {
    if raw.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", raw.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::catalog::{Company, Customer, CustomerTier, Product};
    use chrono::Utc;

    fn product(id: &str, title: &str, unit_price: Decimal, msrp: Decimal) -> Product {
        Product {
            id: id.into(), sku: format!("SKU-{id}"), title: title.into(),
            unit_price, msrp, margin_percent: None, category: "Games".into(),
            publisher: "Acme".into(), min_qty: 1, case_qty: 6, in_stock: true, featured: false,
        }
    }

    fn catalog(minimum_order: Decimal) -> CatalogPayload {
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
            products: vec![
                product("P1", "Widget, Deluxe", Decimal::new(900, 2), Decimal::new(1699, 2)),
                product("P2", "Gadget", Decimal::new(500, 2), Decimal::new(1000, 2)),
            ],
        }
    }

    #[test]
    fn test_export_rows_and_summary() {
        let cat = catalog(Decimal::new(10, 0));
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.add_item(&cat, "P2", 1).unwrap();

        let result = export(&cart, &cat).unwrap();
        assert_eq!(result.rows().len(), 2);
        assert_eq!(result.rows()[0].line_total, Decimal::new(1800, 2));
        assert_eq!(result.rows()[0].line_profit, Decimal::new(1598, 2));
        assert_eq!(result.totals().subtotal.amount(), Decimal::new(2300, 2));

        let csv = result.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("SKU,Title,Quantity,UnitPrice,LineTotal,LineProfit"));
        assert_eq!(lines.next(), Some("SKU-P1,\"Widget, Deluxe\",2,9.00,18.00,15.98"));
        assert_eq!(lines.next(), Some("SKU-P2,Gadget,1,5.00,5.00,5.00"));
        assert_eq!(lines.next(), Some("TOTAL,,3,,23.00,20.98"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_minimum_gate_shortfall() {
        let cat = catalog(Decimal::new(850, 0));
        let mut cart = CartLedger::new();
        // 849.99 total
        let mut rich = cat.clone();
        rich.products.push(product("P3", "Pallet", Decimal::new(84999, 2), Decimal::new(99999, 2)));
        cart.add_item(&rich, "P3", 1).unwrap();

        match export(&cart, &rich) {
            Err(ExportError::MinimumNotMet { shortfall }) => {
                assert_eq!(shortfall.amount(), Decimal::new(1, 2)); // 0.01
            }
            other => panic!("expected minimum gate failure, got {other:?}"),
        }
    }

    #[test]
    fn test_minimum_gate_exact_boundary_passes() {
        let cat = catalog(Decimal::new(23, 0));
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P1", 2).unwrap();
        cart.add_item(&cat, "P2", 1).unwrap();
        assert!(export(&cart, &cat).is_ok()); // subtotal 23.00 == minimum
    }

    #[test]
    fn test_export_is_deterministic() {
        let cat = catalog(Decimal::new(10, 0));
        let mut cart = CartLedger::new();
        cart.add_item(&cat, "P2", 1).unwrap();
        cart.add_item(&cat, "P1", 2).unwrap();

        let first = export(&cart, &cat).unwrap().to_csv();
        let second = export(&cart, &cat).unwrap().to_csv();
        assert_eq!(first, second);
        // insertion order, not catalog order
        assert!(first.find("SKU-P2").unwrap() < first.find("SKU-P1").unwrap());
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("has,comma"), "\"has,comma\"");
        assert_eq!(csv_field("has \"quotes\""), "\"has \"\"quotes\"\"\"");
    }
}
