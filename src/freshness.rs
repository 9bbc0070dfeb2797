//! Catalog freshness gate
//!
//! Pure classification over the payload's expiry stamp. Expired data stays
//! structurally usable so cached carts survive, but callers must surface it
//! as needing re-acquisition before checkout. Nothing here discards data.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::catalog::CatalogPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Expired,
    /// No expiry stamp on the payload; usable, but flagged.
    Unversioned,
}

impl Freshness {
    pub fn is_expired(self) -> bool { self == Self::Expired }
}

pub fn classify(catalog: &CatalogPayload, now: DateTime<Utc>) -> Freshness {
    match catalog.expires_at {
        Some(expires_at) if now > expires_at => Freshness::Expired,
        Some(_) => Freshness::Fresh,
        None => Freshness::Unversioned,
    }
}
