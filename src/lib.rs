//! Catalog Link
//!
//! Client-side core for catalogs delivered as links: a personalized product
//! catalog travels inside a URL fragment as a compressed, integrity-tagged
//! token, and everything needed to turn that token into an order happens on
//! the client with zero backend calls.
//!
//! ## Pipeline
//! - [`codec`] encodes/decodes the transport token (gzip + base64url +
//!   SHA-256 tag) with strict schema validation
//! - [`resolver`] reconstructs catalog state: transport token, then persisted
//!   cache, then a remote default fetch
//! - [`freshness`] classifies resolved data as fresh, expired, or unversioned
//! - [`domain`] holds the catalog payload, the cart ledger, and money math
//! - [`export`] renders the cart into flat order records behind the
//!   minimum-order gate
//! - [`session`] ties one catalog and one cart together per customer session

pub mod codec;
pub mod domain;
pub mod export;
pub mod freshness;
pub mod resolver;
pub mod session;

pub use codec::{Codec, DecodeError, EncodeError};
pub use domain::aggregates::cart::{CartError, CartLedger, CartSnapshot, LineItem, Totals};
pub use domain::aggregates::catalog::{CatalogPayload, Company, Customer, CustomerTier, Product};
pub use domain::events::CartEvent;
pub use domain::value_objects::{Money, MoneyError};
pub use export::{export, ExportError, ExportRow, OrderExport, EXPORT_COLUMNS};
pub use freshness::{classify, Freshness};
pub use resolver::{
    CacheError, CacheStore, CachedCatalog, CatalogResolver, FsCacheStore, HttpRemote,
    NoCatalogAvailable, RemoteCatalog, RemoteError, Resolved, Source,
};
pub use session::Session;
