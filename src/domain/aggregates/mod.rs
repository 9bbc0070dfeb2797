//! Aggregates module
pub mod cart;
pub mod catalog;

pub use cart::{CartError, CartLedger, CartSnapshot, LineItem, Totals};
pub use catalog::{CatalogPayload, Company, Customer, CustomerTier, Product};
