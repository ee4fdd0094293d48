//! CSV serialization and deserialization utilities.
//!
//! Provides generic functions for reading and writing CSV data, plus the
//! file-level helpers the balance snapshot and journal are built on.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Creates an iterator that reads CSV records from a file.
/// Each record is deserialized into type T.
pub fn read_csv<T, P>(path: P) -> csv::Result<impl Iterator<Item = csv::Result<T>>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    read_csv_with_headers(path, true)
}

/// Same as [`read_csv`], for files that may or may not carry a header row.
pub fn read_csv_with_headers<T, P>(
    path: P,
    has_headers: bool,
) -> csv::Result<impl Iterator<Item = csv::Result<T>>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    Ok(csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .trim(csv::Trim::All)
        .from_path(path)?
        .into_deserialize())
}

/// Writes an iterator of records to a CSV writer.
/// Each record must implement Serialize.
pub fn write_csv<T, W>(writer: W, records: impl Iterator<Item = T>) -> csv::Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Replaces the file at `path` with the given records.
/// Records are written to a sibling temp file first, synced and renamed into
/// place, so readers never observe a half-written file.
pub fn write_csv_file<T, P>(path: P, records: impl Iterator<Item = T>) -> csv::Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let tmp = temp_path(path);
    let mut wtr = csv::Writer::from_path(&tmp)?;
    for record in records {
        wtr.serialize(record)?;
    }
    let file = wtr.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Appends header-less records to the end of `path`, creating it if needed.
pub fn append_csv<T, P>(path: P, records: impl Iterator<Item = T>) -> csv::Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
