//! Player balances: a cached mapping from player to a non-negative amount,
//! backed by a CSV snapshot and (in journal mode) an append-only CSV journal.
//!
//! The snapshot holds `player,balance` rows. In journal mode every mutation
//! appends one header-less row to `<snapshot>.journal.csv` instead of
//! rewriting the snapshot; on load the journal is replayed over the snapshot,
//! last row wins. The journal is folded back into the snapshot once it
//! reaches `compact_after` rows and on [`BalanceStore::flush`].

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{EconomySettings, PersistenceMode};
use crate::csv_utils::{append_csv, read_csv_with_headers, write_csv_file};
use crate::dto::StoredBalance;
use crate::error::PersistenceError;
use crate::PlayerId;

#[derive(Debug)]
pub struct BalanceStore {
    snapshot_path: PathBuf,
    journal_path: PathBuf,
    starting_balance: Decimal,
    mode: PersistenceMode,
    balances: HashMap<PlayerId, Decimal>,
    /// Rows appended to the journal since the last compaction.
    journal_len: usize,
}

impl BalanceStore {
    /// Opens the store at `path`, creating an empty snapshot if none exists.
    pub fn open(
        path: impl Into<PathBuf>,
        settings: &EconomySettings,
    ) -> Result<Self, PersistenceError> {
        let snapshot_path = path.into();
        let journal_path = journal_path_for(&snapshot_path);
        let mut store = Self {
            snapshot_path,
            journal_path,
            starting_balance: settings.starting_balance,
            mode: settings.persistence,
            balances: HashMap::new(),
            journal_len: 0,
        };
        store.load()?;
        Ok(store)
    }

    /// Replaces the cache with the durable state.
    /// Rows with an unparseable player id or amount are skipped.
    pub fn load(&mut self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
            }
        }
        if !self.snapshot_path.exists() {
            fs::File::create(&self.snapshot_path)
                .map_err(|e| PersistenceError::io(&self.snapshot_path, e))?;
        }

        self.balances.clear();
        let loaded = read_balances(&self.snapshot_path, true, &mut self.balances)?;
        self.journal_len = if self.journal_path.exists() {
            read_balances(&self.journal_path, false, &mut self.balances)?
        } else {
            0
        };
        info!(
            path = %self.snapshot_path.display(),
            snapshot_rows = loaded,
            journal_rows = self.journal_len,
            players = self.balances.len(),
            "balances loaded"
        );

        if self.mode == PersistenceMode::WriteThrough && self.journal_len > 0 {
            self.flush()?;
        }
        Ok(())
    }

    /// The stored balance, or the starting balance for unknown players.
    /// Never creates an entry.
    pub fn balance(&self, player: PlayerId) -> Decimal {
        self.balances
            .get(&player)
            .copied()
            .unwrap_or(self.starting_balance)
    }

    /// Sets the balance, clamping negative amounts to zero, and persists it.
    ///
    /// Returns the stored balance. On a persistence error the in-memory value
    /// has already changed and stays changed until the next successful write.
    pub fn set_balance(
        &mut self,
        player: PlayerId,
        amount: Decimal,
    ) -> Result<Decimal, PersistenceError> {
        let balance = amount.max(Decimal::ZERO).normalize();
        self.balances.insert(player, balance);
        if let Err(err) = self.persist(player, balance) {
            warn!(%player, error = %err, "failed to persist balance");
            return Err(err);
        }
        Ok(balance)
    }

    pub fn deposit(
        &mut self,
        player: PlayerId,
        amount: Decimal,
    ) -> Result<Decimal, PersistenceError> {
        self.set_balance(player, self.balance(player).saturating_add(amount))
    }

    /// Withdraws without checking funds: overdrawing leaves a zero balance.
    /// Callers that must not overdraw check [`has`](Self::has) first.
    pub fn withdraw(
        &mut self,
        player: PlayerId,
        amount: Decimal,
    ) -> Result<Decimal, PersistenceError> {
        self.set_balance(player, self.balance(player).saturating_sub(amount))
    }

    pub fn has(&self, player: PlayerId, amount: Decimal) -> bool {
        self.balance(player) >= amount
    }

    /// Stored balances, richest first. Equal balances are ordered by player id.
    pub fn top_balances(&self, limit: usize) -> Vec<(PlayerId, Decimal)> {
        let mut entries: Vec<_> = self.balances.iter().map(|(p, b)| (*p, *b)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }

    /// Rewrites the snapshot from the cache and drops the journal.
    pub fn flush(&mut self) -> Result<(), PersistenceError> {
        self.write_snapshot()?;
        match fs::remove_file(&self.journal_path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(PersistenceError::io(&self.journal_path, err)),
        }
        debug!(
            path = %self.snapshot_path.display(),
            compacted = self.journal_len,
            "balances flushed"
        );
        self.journal_len = 0;
        Ok(())
    }

    pub fn starting_balance(&self) -> Decimal {
        self.starting_balance
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    fn persist(&mut self, player: PlayerId, balance: Decimal) -> Result<(), PersistenceError> {
        match self.mode {
            PersistenceMode::WriteThrough => self.write_snapshot(),
            PersistenceMode::Journal { compact_after } => {
                let row = StoredBalance {
                    player: player.to_string(),
                    balance,
                };
                append_csv(&self.journal_path, iter::once(row))
                    .map_err(|e| PersistenceError::csv(&self.journal_path, e))?;
                self.journal_len += 1;
                if self.journal_len >= compact_after {
                    self.flush()?;
                }
                Ok(())
            }
        }
    }

    fn write_snapshot(&self) -> Result<(), PersistenceError> {
        let mut rows: Vec<_> = self
            .balances
            .iter()
            .map(|(player, balance)| (*player, *balance))
            .collect();
        rows.sort_by_key(|(player, _)| *player);
        let rows = rows.into_iter().map(|(player, balance)| StoredBalance {
            player: player.to_string(),
            balance,
        });
        write_csv_file(&self.snapshot_path, rows)
            .map_err(|e| PersistenceError::csv(&self.snapshot_path, e))
    }
}

fn journal_path_for(snapshot: &Path) -> PathBuf {
    let stem = snapshot
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    snapshot.with_file_name(format!("{}.journal.csv", stem))
}

/// Reads balance rows from `path` into `balances`, returning how many were applied.
fn read_balances(
    path: &Path,
    has_headers: bool,
    balances: &mut HashMap<PlayerId, Decimal>,
) -> Result<usize, PersistenceError> {
    let rows = read_csv_with_headers::<StoredBalance, _>(path, has_headers)
        .map_err(|e| PersistenceError::csv(path, e))?;
    let mut applied = 0;
    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable balance row");
                continue;
            }
        };
        match row.player.parse::<PlayerId>() {
            Ok(player) => {
                balances.insert(player, row.balance.max(Decimal::ZERO));
                applied += 1;
            }
            Err(err) => debug!(path = %path.display(), error = %err, "skipping balance row"),
        }
    }
    Ok(applied)
}
