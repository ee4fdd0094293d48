//! Storage layer for the player state engine. Provides storage for:
//! - Player balances ([`BalanceStore`])
//! - Relationship records and their per-player files ([`RelationshipFiles`])
//! - The identity-keyed cache both are built on ([`RecordCache`])
//!
//! Current implementation is optimized for synchronous, direct memory
//! access from a single thread; every write goes straight to disk.

mod balances;
mod cache;
mod relationships;

pub use balances::BalanceStore;
pub use cache::RecordCache;
pub use relationships::{RelationshipFiles, RelationshipRecord};
