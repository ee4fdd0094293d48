//! The runner is responsible for setting up a file stream for reading operations
//! from CSV, applying them to an [`Engine`], and writing the resulting balance
//! table to a writer.
//!
//! This module provides both a synchronous and an asynchronous runner implementations.
//!
mod async_runner;
mod sync_runner;

pub use async_runner::run as run_async;
pub use sync_runner::run;

use std::io::Write;
use tracing::debug;

use crate::{csv_utils::write_csv, dto::BalanceRow, dto::Operation, Engine};

/// Applies one operation. Rejections are expected input and are only logged.
fn apply(engine: &mut Engine, operation: Operation) {
    let op_type = operation.op_type;
    let player = operation.player;
    if let Err(err) = engine.process_operation(operation) {
        debug!(?op_type, %player, error = %err, "operation rejected");
    }
}

/// Flushes the engine and writes every stored balance, richest first.
fn finish<W: Write>(
    engine: &mut Engine,
    writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    engine.save_all()?;
    let rows = engine
        .balances()
        .top_balances(usize::MAX)
        .into_iter()
        .map(BalanceRow::from);
    write_csv(writer, rows)?;
    Ok(())
}
