//! Customer session
//!
//! Explicit, passed context: one resolved catalog and one cart ledger per
//! session, no ambient globals. The session is the unit the surrounding UI
//! holds on to; persistence of its cart snapshot between sessions is the
//! caller's concern.

use uuid::Uuid;

use crate::domain::aggregates::cart::{CartError, CartLedger, CartSnapshot, Totals};
use crate::domain::aggregates::catalog::CatalogPayload;
use crate::domain::events::CartEvent;
use crate::export::{self, ExportError, OrderExport};
use crate::freshness::Freshness;
use crate::resolver::Resolved;

pub struct Session {
    id: Uuid,
    catalog: CatalogPayload,
    freshness: Freshness,
    ledger: CartLedger,
}

impl Session {
    pub fn new(resolved: Resolved) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog: resolved.catalog,
            freshness: resolved.freshness,
            ledger: CartLedger::new(),
        }
    }

    /// Starts a session with a previously persisted cart. Lines for products
    /// the resolved catalog no longer carries are dropped with a warning.
    pub fn with_snapshot(resolved: Resolved, snapshot: CartSnapshot) -> Self {
        let (ledger, dropped) = CartLedger::restore(snapshot, &resolved.catalog);
        if !dropped.is_empty() {
            tracing::warn!(?dropped, "dropped cart lines for products missing from the catalog");
        }
        Self {
            id: Uuid::new_v4(),
            catalog: resolved.catalog,
            freshness: resolved.freshness,
            ledger,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn catalog(&self) -> &CatalogPayload { &self.catalog }
    pub fn freshness(&self) -> Freshness { self.freshness }
    pub fn ledger(&self) -> &CartLedger { &self.ledger }

    pub fn add_item(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        self.ledger.add_item(&self.catalog, product_id, quantity)
    }

    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        self.ledger.set_quantity(product_id, quantity)
    }

    pub fn remove_item(&mut self, product_id: &str) {
        self.ledger.remove_item(product_id);
    }

    pub fn clear_cart(&mut self) {
        self.ledger.clear();
    }

    pub fn totals(&self) -> Totals {
        self.ledger.totals(&self.catalog)
    }

    pub fn meets_minimum(&self) -> bool {
        self.ledger.meets_minimum(&self.catalog)
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.ledger.snapshot()
    }

    /// The minimum-order gate is the only hard export gate; an expired
    /// catalog is surfaced, not blocked.
    pub fn export(&self) -> Result<OrderExport, ExportError> {
        if self.freshness.is_expired() {
            tracing::warn!(session = %self.id, "exporting against an expired catalog; re-acquisition recommended");
        }
        export::export(&self.ledger, &self.catalog)
    }

    pub fn drain_events(&mut self) -> Vec<CartEvent> {
        self.ledger.take_events()
    }
}
