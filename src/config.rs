//! Runtime settings for the balance store and relationship graph.
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (any format the `config` crate recognises by extension), then environment
//! variables prefixed with `ONOUS`, using `__` as the section separator
//! (e.g. `ONOUS_ECONOMY__STARTING_BALANCE=500`).

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Root directory for every durable file.
    pub data_dir: PathBuf,
    pub economy: EconomySettings,
    pub friends: FriendSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EconomySettings {
    /// Balance reported for players without a stored entry.
    pub starting_balance: Decimal,
    /// Snapshot file name, relative to `data_dir`.
    pub file: PathBuf,
    pub persistence: PersistenceMode,
}

/// How balance mutations reach disk.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Rewrite the whole snapshot after every mutation.
    WriteThrough,
    /// Append each mutation to a journal and fold it into the snapshot once
    /// `compact_after` entries have accumulated.
    Journal {
        #[serde(default = "default_compact_after")]
        compact_after: usize,
    },
}

const DEFAULT_COMPACT_AFTER: usize = 256;

fn default_compact_after() -> usize {
    DEFAULT_COMPACT_AFTER
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FriendSettings {
    /// Directory holding one file per player, relative to `data_dir`.
    pub dir: PathBuf,
    pub max_friends: usize,
    pub max_requests: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            economy: EconomySettings::default(),
            friends: FriendSettings::default(),
        }
    }
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::ONE_THOUSAND,
            file: PathBuf::from("balances.csv"),
            persistence: PersistenceMode::default(),
        }
    }
}

impl Default for PersistenceMode {
    fn default() -> Self {
        Self::Journal {
            compact_after: DEFAULT_COMPACT_AFTER,
        }
    }
}

impl Default for FriendSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("friends"),
            max_friends: 50,
            max_requests: 50,
        }
    }
}

impl Settings {
    /// Loads settings from an optional file plus `ONOUS_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("ONOUS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Settings rooted at `data_dir`, all other values default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn balances_path(&self) -> PathBuf {
        self.data_dir.join(&self.economy.file)
    }

    pub fn friends_dir(&self) -> PathBuf {
        self.data_dir.join(&self.friends.dir)
    }
}
