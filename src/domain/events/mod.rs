//! Domain events

/// Raised by the cart ledger on every mutation; drained with `take_events`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { product_id: String, quantity: u32 },
    QuantityChanged { product_id: String, quantity: u32 },
    ItemRemoved { product_id: String },
    Cleared,
}
