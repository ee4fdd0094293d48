//! Relationship records and their durable storage: one JSON file per owner,
//! plus an intent file for transactions that touch two records.
//!
//! A two-record commit first writes every staged record into the intent file
//! (`pending.txn.json`, written via temp file + rename, so it is either fully
//! present or absent). That write is the commit point. The record files are
//! then rewritten one by one and the intent is removed. Any later disk access,
//! and [`RelationshipFiles::open`], first rolls an intent left behind by a
//! failed or interrupted commit forward.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::csv_utils::temp_path;
use crate::error::PersistenceError;
use crate::PlayerId;

const INTENT_FILE: &str = "pending.txn.json";

/// Confirmed friends and incoming friend requests of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRecord {
    owner: PlayerId,
    friends: BTreeSet<PlayerId>,
    requests: BTreeSet<PlayerId>,
}

impl RelationshipRecord {
    pub fn new(owner: PlayerId) -> Self {
        Self {
            owner,
            friends: BTreeSet::new(),
            requests: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn friends(&self) -> &BTreeSet<PlayerId> {
        &self.friends
    }

    /// Players who asked the owner to be friends.
    pub fn requests(&self) -> &BTreeSet<PlayerId> {
        &self.requests
    }

    pub fn is_friend(&self, other: PlayerId) -> bool {
        self.friends.contains(&other)
    }

    pub fn has_request_from(&self, other: PlayerId) -> bool {
        self.requests.contains(&other)
    }

    pub fn friend_count(&self) -> usize {
        self.friends.len()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// The owner is never their own friend; adding them is a no-op.
    pub fn add_friend(&mut self, other: PlayerId) -> bool {
        other != self.owner && self.friends.insert(other)
    }

    pub fn remove_friend(&mut self, other: PlayerId) -> bool {
        self.friends.remove(&other)
    }

    pub fn add_request(&mut self, from: PlayerId) -> bool {
        from != self.owner && self.requests.insert(from)
    }

    pub fn remove_request(&mut self, from: PlayerId) -> bool {
        self.requests.remove(&from)
    }

}

/// On-disk shape of a record. Ids stay as text so one bad entry does not
/// make the whole file unreadable.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    #[serde(default)]
    friends: Vec<String>,
    #[serde(default)]
    requests: Vec<String>,
}

impl RecordFile {
    fn into_record(self, owner: PlayerId) -> RelationshipRecord {
        let mut record = RelationshipRecord::new(owner);
        for friend in parse_ids(owner, "friends", self.friends) {
            record.add_friend(friend);
        }
        for from in parse_ids(owner, "requests", self.requests) {
            record.add_request(from);
        }
        record
    }
}

impl From<&RelationshipRecord> for RecordFile {
    fn from(record: &RelationshipRecord) -> Self {
        Self {
            friends: record.friends.iter().map(ToString::to_string).collect(),
            requests: record.requests.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StagedRecord {
    owner: PlayerId,
    #[serde(flatten)]
    file: RecordFile,
}

fn parse_ids(owner: PlayerId, list: &str, ids: Vec<String>) -> impl Iterator<Item = PlayerId> {
    let list = list.to_owned();
    ids.into_iter().filter_map(move |text| match text.parse() {
        Ok(id) => Some(id),
        Err(err) => {
            debug!(%owner, list = %list, error = %err, "dropping stored relationship entry");
            None
        }
    })
}

/// Per-player relationship files under one directory.
#[derive(Debug)]
pub struct RelationshipFiles {
    dir: PathBuf,
}

impl RelationshipFiles {
    /// Opens (creating if needed) the directory and settles any pending commit.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        let files = Self { dir };
        files.settle();
        Ok(files)
    }

    pub fn path_for(&self, owner: PlayerId) -> PathBuf {
        self.dir.join(format!("{}.json", owner))
    }

    fn intent_path(&self) -> PathBuf {
        self.dir.join(INTENT_FILE)
    }

    /// Reads the owner's record, or an empty one if nothing is stored.
    /// A record still held by an unsettled commit is read from the intent.
    /// A file that is not valid JSON is logged and treated as empty.
    pub fn load(&self, owner: PlayerId) -> Result<RelationshipRecord, PersistenceError> {
        if let Some(staged) = self.settle().into_iter().find(|s| s.owner == owner) {
            return Ok(staged.file.into_record(owner));
        }
        let path = self.path_for(owner);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(RelationshipRecord::new(owner));
            }
            Err(err) => return Err(PersistenceError::io(&path, err)),
        };
        match serde_json::from_slice::<RecordFile>(&bytes) {
            Ok(file) => Ok(file.into_record(owner)),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "unreadable relationship file, starting empty"
                );
                Ok(RelationshipRecord::new(owner))
            }
        }
    }

    /// Rewrites one record file. A record still held by an unsettled commit
    /// is restaged instead, so the older staged copy can never overwrite it.
    pub fn save(&self, record: &RelationshipRecord) -> Result<(), PersistenceError> {
        let pending = self.settle();
        if pending.iter().any(|s| s.owner == record.owner) {
            return self.stage_and_apply(pending, &[record]);
        }
        self.write_record(record)
    }

    /// Persists several records as one unit: after this returns `Ok` every
    /// record is durable (possibly via the intent, until a later access
    /// settles it). On `Err` nothing was committed.
    pub fn commit(&self, records: &[&RelationshipRecord]) -> Result<(), PersistenceError> {
        let pending = self.settle();
        self.stage_and_apply(pending, records)
    }

    /// Writes `records`, merged over whatever is still pending, into the
    /// intent, then tries to write them out.
    fn stage_and_apply(
        &self,
        mut staged: Vec<StagedRecord>,
        records: &[&RelationshipRecord],
    ) -> Result<(), PersistenceError> {
        staged.retain(|s| records.iter().all(|r| r.owner != s.owner));
        staged.extend(records.iter().map(|record| StagedRecord {
            owner: record.owner,
            file: RecordFile::from(*record),
        }));
        write_json_atomic(&self.intent_path(), &staged)?;

        if let Err((err, _)) = self.apply(staged) {
            warn!(error = %err, "relationship commit left pending, will be rolled forward");
        }
        Ok(())
    }

    /// Staged records of the intent file, empty if there is none.
    fn pending(&self) -> Result<Vec<StagedRecord>, PersistenceError> {
        let path = self.intent_path();
        match fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| PersistenceError::json(&path, e))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(PersistenceError::io(&path, err)),
        }
    }

    /// Rolls a leftover intent forward and returns the records it could not
    /// write yet. Failures are logged and only hold back the records named
    /// in the intent.
    fn settle(&self) -> Vec<StagedRecord> {
        let staged = match self.pending() {
            Ok(staged) => staged,
            Err(err) => {
                warn!(error = %err, "unreadable relationship intent, ignoring it");
                return Vec::new();
            }
        };
        if staged.is_empty() {
            return staged;
        }
        info!(records = staged.len(), "rolling forward pending relationship commit");
        match self.apply(staged) {
            Ok(()) => Vec::new(),
            Err((err, left)) => {
                warn!(records = left.len(), error = %err, "relationship commit still pending");
                left
            }
        }
    }

    /// Writes every staged record. The intent is removed once all of them
    /// are written, otherwise it is narrowed to the ones that failed. On
    /// failure the records still held by the intent are returned.
    fn apply(
        &self,
        staged: Vec<StagedRecord>,
    ) -> Result<(), (PersistenceError, Vec<StagedRecord>)> {
        let mut first_error = None;
        let (mut written, mut left) = (Vec::new(), Vec::new());
        for record in staged {
            match write_json_atomic(&self.path_for(record.owner), &record.file) {
                Ok(()) => written.push(record),
                Err(err) => {
                    first_error.get_or_insert(err);
                    left.push(record);
                }
            }
        }

        let path = self.intent_path();
        match first_error {
            None => fs::remove_file(&path).map_err(|e| (PersistenceError::io(&path, e), written)),
            Some(err) => {
                if let Err(narrow) = write_json_atomic(&path, &left) {
                    debug!(error = %narrow, "could not narrow relationship intent");
                    left.extend(written);
                }
                Err((err, left))
            }
        }
    }

    fn write_record(&self, record: &RelationshipRecord) -> Result<(), PersistenceError> {
        write_json_atomic(&self.path_for(record.owner), &RecordFile::from(record))
    }
}

/// Writes `value` to a sibling temp file, syncs it and renames it into place.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| PersistenceError::json(path, e))?;
    let tmp = temp_path(path);
    let mut file = fs::File::create(&tmp).map_err(|e| PersistenceError::io(&tmp, e))?;
    file.write_all(&bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| PersistenceError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))
}
