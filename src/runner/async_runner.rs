use std::error::Error;
use std::io::Write;
use std::path::Path;

use crate::{config::Settings, dto::Operation, error::PersistenceError, Engine};

use csv_async::{AsyncReaderBuilder, Error as CsvError, Trim};
use tokio::fs::File;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

const BUFFER_SIZE: usize = 1024;

type Result<T, E = Box<dyn Error + Send + Sync>> = std::result::Result<T, E>;

/// Runs the engine async on the given operations file and writes the balance table to the provided writer.
/// Spawns two tasks:
/// * CSV reader - streams operations from the input file, deserializes them and sends them to the processor via channel.
/// * Processor - a blocking task that owns the engine and applies operations until the channel is closed.
///   Store I/O is synchronous, so it stays off the async workers.
///
/// # Arguments
/// * `settings` - Where the durable state lives and how it behaves
/// * `input_path` - Path to the input CSV file containing operations
/// * `writer` - Where to write the balances (e.g. stdout)
///
/// # Errors
/// Returns an error if:
/// * The stored state cannot be opened or saved
/// * The input file cannot be read
/// * The CSV is malformed
/// * Writing to the output fails
pub async fn run<P, W>(settings: &Settings, input_path: P, writer: W) -> Result<()>
where
    P: AsRef<Path>,
    W: Write,
{
    // Create channel for passing operations from reader to processor
    let (tx, rx) = mpsc::channel(BUFFER_SIZE);
    let input_path = input_path.as_ref().to_owned();
    let settings = settings.clone();

    let reader_handle = tokio::spawn(read_operations(input_path, tx));
    let processor_handle = tokio::task::spawn_blocking(move || process_operations(&settings, rx));

    // Wait for reader to finish and propagate any errors
    reader_handle.await??;

    // Get final engine state
    let mut engine = processor_handle.await??;

    super::finish(&mut engine, writer)
}

/// Reads and deserializes operations from a CSV file.
/// Returns them through the provided channel.
async fn read_operations(
    input_path: impl AsRef<Path> + Send,
    tx: mpsc::Sender<Operation>,
) -> Result<(), CsvError> {
    let file = File::open(input_path).await?;
    let mut csv_reader = AsyncReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .create_deserializer(file);

    let mut records = csv_reader.deserialize::<Operation>();
    while let Some(result) = records.next().await {
        match result {
            Ok(operation) => {
                if tx.send(operation).await.is_err() {
                    // Receiver dropped, exit gracefully
                    break;
                }
            }
            // CSV parsing errors are critical - propagate them
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Applies operations received through the channel.
/// Returns the final engine state once the channel is closed by the reader.
fn process_operations(
    settings: &Settings,
    mut rx: mpsc::Receiver<Operation>,
) -> Result<Engine, PersistenceError> {
    let mut engine = Engine::open(settings)?;
    while let Some(operation) = rx.blocking_recv() {
        super::apply(&mut engine, operation);
    }
    Ok(engine)
}
