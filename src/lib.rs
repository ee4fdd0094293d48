mod amount;
mod bridge;
pub mod config;
mod csv_utils;
mod dto;
mod engine;
mod error;
mod friends;
mod player;
mod runner;
mod stores;

pub use amount::{format_amount, parse_amount};
pub use bridge::{Economy, EconomyResponse};
pub use config::Settings;
pub use dto::{BalanceRow, Operation, OperationType};
pub use engine::Engine;
pub use error::{AmountParseError, Error, FriendError, PersistenceError, PlayerIdError};
pub use friends::RelationshipGraph;
pub use player::PlayerId;
pub use runner::{run, run_async};
pub use stores::{BalanceStore, RecordCache, RelationshipRecord};
