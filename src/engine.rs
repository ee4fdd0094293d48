use rust_decimal::Decimal;

use crate::amount::parse_amount;
use crate::config::Settings;
use crate::dto::{Operation, OperationType};
use crate::error::PersistenceError;
use crate::friends::RelationshipGraph;
use crate::stores::BalanceStore;
use crate::{Error, PlayerId};

/// Validated form of an [`Operation`] row.
#[derive(Debug)]
enum Command {
    Set { player: PlayerId, amount: Decimal },
    Deposit { player: PlayerId, amount: Decimal },
    Withdraw { player: PlayerId, amount: Decimal },
    FriendRequest { sender: PlayerId, target: PlayerId },
    FriendAccept { target: PlayerId, from: PlayerId },
    FriendDeny { target: PlayerId, from: PlayerId },
    FriendRemove { remover: PlayerId, other: PlayerId },
    Unload { player: PlayerId },
}

/// Wires the balance store and relationship graph together and applies
/// operations to them one at a time.
pub struct Engine {
    balances: BalanceStore,
    friends: RelationshipGraph,
}

impl Engine {
    pub fn open(settings: &Settings) -> Result<Self, PersistenceError> {
        Ok(Self {
            balances: BalanceStore::open(settings.balances_path(), &settings.economy)?,
            friends: RelationshipGraph::open(settings.friends_dir(), &settings.friends)?,
        })
    }

    pub fn balances(&self) -> &BalanceStore {
        &self.balances
    }

    pub fn friends(&self) -> &RelationshipGraph {
        &self.friends
    }

    pub fn friends_mut(&mut self) -> &mut RelationshipGraph {
        &mut self.friends
    }

    fn validate_and_parse_operation(operation: Operation) -> Result<Command, Error> {
        let player = operation.player;
        let target = || operation.target.ok_or(Error::MissingTarget);
        let amount = || -> Result<Decimal, Error> {
            let text = operation.amount.as_deref().ok_or(Error::MissingAmount)?;
            Ok(parse_amount(text)?)
        };
        let non_negative = || -> Result<Decimal, Error> {
            let amount = amount()?;
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(Error::NegativeAmount);
            }
            Ok(amount)
        };

        match operation.op_type {
            // Negative balances are clamped by the store rather than rejected.
            OperationType::Set => Ok(Command::Set {
                player,
                amount: amount()?,
            }),
            OperationType::Deposit => Ok(Command::Deposit {
                player,
                amount: non_negative()?,
            }),
            OperationType::Withdraw => Ok(Command::Withdraw {
                player,
                amount: non_negative()?,
            }),
            OperationType::FriendRequest => Ok(Command::FriendRequest {
                sender: player,
                target: target()?,
            }),
            OperationType::FriendAccept => Ok(Command::FriendAccept {
                target: player,
                from: target()?,
            }),
            OperationType::FriendDeny => Ok(Command::FriendDeny {
                target: player,
                from: target()?,
            }),
            OperationType::FriendRemove => Ok(Command::FriendRemove {
                remover: player,
                other: target()?,
            }),
            OperationType::Unload => Ok(Command::Unload { player }),
        }
    }

    pub fn process_operation(&mut self, operation: Operation) -> Result<(), Error> {
        let command = Self::validate_and_parse_operation(operation)?;

        match command {
            Command::Set { player, amount } => {
                self.balances.set_balance(player, amount)?;
            }
            Command::Deposit { player, amount } => {
                self.balances.deposit(player, amount)?;
            }
            Command::Withdraw { player, amount } => self.process_withdrawal(player, amount)?,
            Command::FriendRequest { sender, target } => {
                self.friends.send_request(sender, target)?
            }
            Command::FriendAccept { target, from } => self.friends.accept_request(target, from)?,
            Command::FriendDeny { target, from } => self.friends.deny_request(target, from)?,
            Command::FriendRemove { remover, other } => {
                self.friends.remove_friend(remover, other)?
            }
            Command::Unload { player } => self.friends.unload_data(player)?,
        }
        Ok(())
    }

    fn process_withdrawal(&mut self, player: PlayerId, amount: Decimal) -> Result<(), Error> {
        if !self.balances.has(player, amount) {
            return Err(Error::InsufficientFunds);
        }
        self.balances.withdraw(player, amount)?;
        Ok(())
    }

    /// Writes every cached record and compacts the balance files.
    pub fn save_all(&mut self) -> Result<(), PersistenceError> {
        let friends = self.friends.save_all();
        self.balances.flush()?;
        friends
    }
}
