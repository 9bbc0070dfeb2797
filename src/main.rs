//! Catalog Link - resolve a transported catalog and print an order-ready summary

use anyhow::Result;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_link::{CatalogResolver, FsCacheStore, HttpRemote, Session};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let token = std::env::args().nth(1);
    let client_id = std::env::var("CATALOG_CLIENT_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
    let default_url = std::env::var("DEFAULT_CATALOG_URL").ok();

    let cache = FsCacheStore::for_client(&client_id)?;
    let resolver = CatalogResolver::new(cache, HttpRemote::new(default_url), client_id);
    let resolved = resolver.resolve(token.as_deref(), Utc::now()).await?;
    tracing::info!(source = ?resolved.source, freshness = ?resolved.freshness, products = resolved.catalog.products.len(), "catalog resolved");

    let session = Session::new(resolved);
    let catalog = session.catalog();
    println!("{} - catalog for {} ({})", catalog.company.name, catalog.customer.name, catalog.customer.id);
    println!("minimum order: {} {}", catalog.company.minimum_order, catalog.company.currency);
    for product in &catalog.products {
        println!(
            "  [{}] {} — {:.2} (msrp {:.2}, min {}{})",
            product.sku, product.title, product.unit_price, product.msrp, product.min_qty,
            if product.in_stock { "" } else { ", out of stock" }
        );
    }
    Ok(())
}
