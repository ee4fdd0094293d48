//! Currency contract for external economy integrations.
//!
//! Unlike [`BalanceStore::withdraw`], the contract never overdraws: a
//! withdrawal that exceeds the balance is refused without touching the
//! ledger. Negative amounts are refused in both directions.

use rust_decimal::Decimal;
use tracing::warn;

use crate::amount::format_amount;
use crate::stores::BalanceStore;
use crate::PlayerId;

/// Outcome of a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyResponse {
    pub success: bool,
    /// Amount moved; zero when the call was refused.
    pub amount: Decimal,
    /// Player balance after the call.
    pub balance: Decimal,
    pub reason: Option<String>,
}

impl EconomyResponse {
    fn success(amount: Decimal, balance: Decimal) -> Self {
        Self {
            success: true,
            amount,
            balance,
            reason: None,
        }
    }

    fn failure(balance: Decimal, reason: &str) -> Self {
        Self {
            success: false,
            amount: Decimal::ZERO,
            balance,
            reason: Some(reason.to_owned()),
        }
    }
}

pub trait Economy {
    fn name(&self) -> &str;

    fn currency_name_singular(&self) -> &str {
        "Coin"
    }

    fn currency_name_plural(&self) -> &str {
        "Coins"
    }

    fn fractional_digits(&self) -> u32 {
        0
    }

    fn has_bank_support(&self) -> bool {
        false
    }

    fn format(&self, amount: Decimal) -> String {
        format_amount(amount)
    }

    /// Every player has an account; unknown players start at the default balance.
    fn account_exists(&self, _player: PlayerId) -> bool {
        true
    }

    fn balance(&self, player: PlayerId) -> Decimal;

    fn has(&self, player: PlayerId, amount: Decimal) -> bool;

    fn withdraw_player(&mut self, player: PlayerId, amount: Decimal) -> EconomyResponse;

    fn deposit_player(&mut self, player: PlayerId, amount: Decimal) -> EconomyResponse;
}

impl Economy for BalanceStore {
    fn name(&self) -> &str {
        "OnousCore"
    }

    fn balance(&self, player: PlayerId) -> Decimal {
        BalanceStore::balance(self, player)
    }

    fn has(&self, player: PlayerId, amount: Decimal) -> bool {
        BalanceStore::has(self, player, amount)
    }

    fn withdraw_player(&mut self, player: PlayerId, amount: Decimal) -> EconomyResponse {
        if amount.is_sign_negative() && !amount.is_zero() {
            return EconomyResponse::failure(self.balance(player), "Cannot withdraw negative");
        }
        if !self.has(player, amount) {
            return EconomyResponse::failure(self.balance(player), "Insufficient funds");
        }
        // The ledger already holds the new balance even if the write failed.
        if let Err(err) = self.withdraw(player, amount) {
            warn!(%player, error = %err, "withdrawal applied but not persisted");
        }
        EconomyResponse::success(amount, self.balance(player))
    }

    fn deposit_player(&mut self, player: PlayerId, amount: Decimal) -> EconomyResponse {
        if amount.is_sign_negative() && !amount.is_zero() {
            return EconomyResponse::failure(self.balance(player), "Cannot deposit negative");
        }
        if let Err(err) = self.deposit(player, amount) {
            warn!(%player, error = %err, "deposit applied but not persisted");
        }
        EconomyResponse::success(amount, self.balance(player))
    }
}
