use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::format_amount;
use crate::PlayerId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Set,
    Deposit,
    Withdraw,
    FriendRequest,
    FriendAccept,
    FriendDeny,
    FriendRemove,
    Unload,
}

/// One row of an operations file. `player` is the acting player; `target`
/// is the other side of a friend operation. `amount` is kept as the text the
/// user typed and parsed with [`parse_amount`](crate::parse_amount).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    #[serde(rename = "op")]
    pub op_type: OperationType,
    pub player: PlayerId,
    pub target: Option<PlayerId>,
    pub amount: Option<String>,
}

/// A balance entry as it is stored in the snapshot and journal files.
/// The amount goes through its exact text form; csv would otherwise hand it
/// to serde as a float.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct StoredBalance {
    pub player: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

/// A balance entry as it is reported by the runner.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceRow {
    pub player: PlayerId,
    pub balance: Decimal,
    pub display: String,
}

impl From<(PlayerId, Decimal)> for BalanceRow {
    fn from((player, balance): (PlayerId, Decimal)) -> Self {
        Self {
            player,
            balance: balance.normalize(),
            display: format_amount(balance),
        }
    }
}
