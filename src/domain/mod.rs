//! Domain model: catalog payload, cart ledger, and shared value objects.
pub mod aggregates;
pub mod events;
pub mod value_objects;
