//! Friend request protocol over cached relationship records.
//!
//! For a pair of players the relationship is `Strangers`, `RequestPending`
//! (recorded only on the receiver's record) or `Friends` (recorded on both).
//! Every check happens before any mutation, so a rejected operation leaves
//! both cache and disk untouched.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::FriendSettings;
use crate::error::{FriendError, PersistenceError};
use crate::stores::{RecordCache, RelationshipFiles, RelationshipRecord};
use crate::PlayerId;

pub struct RelationshipGraph {
    files: RelationshipFiles,
    cache: RecordCache<PlayerId, RelationshipRecord>,
    max_friends: usize,
    max_requests: usize,
}

impl RelationshipGraph {
    pub fn open(
        dir: impl Into<PathBuf>,
        settings: &FriendSettings,
    ) -> Result<Self, PersistenceError> {
        Ok(Self {
            files: RelationshipFiles::open(dir)?,
            cache: RecordCache::new(),
            max_friends: settings.max_friends,
            max_requests: settings.max_requests,
        })
    }

    /// Returns the owner's record, loading it (or starting an empty one) on first access.
    pub fn get_data(&mut self, owner: PlayerId) -> Result<&RelationshipRecord, PersistenceError> {
        self.data_mut(owner).map(|record| &*record)
    }

    fn data_mut(&mut self, owner: PlayerId) -> Result<&mut RelationshipRecord, PersistenceError> {
        let files = &self.files;
        self.cache.get_or_try_insert_with(owner, |owner| files.load(*owner))
    }

    pub fn is_loaded(&self, owner: PlayerId) -> bool {
        self.cache.contains(&owner)
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.len()
    }

    /// Writes the cached record of `owner`. Records that are not loaded are skipped.
    pub fn save_data(&self, owner: PlayerId) -> Result<(), PersistenceError> {
        match self.cache.get(&owner) {
            Some(record) => self.files.save(record).inspect_err(|err| {
                warn!(%owner, error = %err, "failed to save friend data");
            }),
            None => Ok(()),
        }
    }

    /// Saves and evicts the owner's record. A record that fails to save stays
    /// cached so a later save can still write it.
    pub fn unload_data(&mut self, owner: PlayerId) -> Result<(), PersistenceError> {
        self.save_data(owner)?;
        self.cache.evict(&owner);
        Ok(())
    }

    /// Saves every cached record, keeping them cached. Every record is
    /// attempted; the first failure is returned.
    pub fn save_all(&self) -> Result<(), PersistenceError> {
        let mut first_error = None;
        for owner in self.cache.keys() {
            if let Err(err) = self.save_data(*owner) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => {
                info!(records = self.cache.len(), "all friend data saved");
                Ok(())
            }
        }
    }

    pub fn are_friends(&mut self, a: PlayerId, b: PlayerId) -> Result<bool, PersistenceError> {
        Ok(self.get_data(a)?.is_friend(b))
    }

    /// Records a friend request from `sender` on the `target`'s record.
    pub fn send_request(&mut self, sender: PlayerId, target: PlayerId) -> Result<(), FriendError> {
        if sender == target {
            return Err(FriendError::SelfRequest);
        }

        let max_friends = self.max_friends;
        let max_requests = self.max_requests;
        let sender_data = self.get_data(sender)?;
        if sender_data.is_friend(target) {
            return Err(FriendError::AlreadyFriends);
        }
        if sender_data.friend_count() >= max_friends {
            return Err(FriendError::FriendLimitReached { limit: max_friends });
        }

        let target_data = self.data_mut(target)?;
        if target_data.friend_count() >= max_friends {
            return Err(FriendError::OtherFriendLimitReached);
        }
        if target_data.request_count() >= max_requests {
            return Err(FriendError::RequestsFull);
        }
        if target_data.has_request_from(sender) {
            return Err(FriendError::RequestAlreadySent);
        }

        target_data.add_request(sender);
        self.save_data(target)?;
        Ok(())
    }

    /// `target` accepts the pending request from `from`; both become friends.
    pub fn accept_request(&mut self, target: PlayerId, from: PlayerId) -> Result<(), FriendError> {
        let mut target_data = self.get_data(target)?.clone();
        if !target_data.has_request_from(from) {
            return Err(FriendError::NoPendingRequest);
        }
        let mut from_data = self.get_data(from)?.clone();
        if target_data.friend_count() >= self.max_friends {
            return Err(FriendError::FriendLimitReached {
                limit: self.max_friends,
            });
        }
        if from_data.friend_count() >= self.max_friends {
            return Err(FriendError::OtherFriendLimitReached);
        }

        target_data.remove_request(from);
        target_data.add_friend(from);
        from_data.add_friend(target);
        self.commit_pair(target_data, from_data)
    }

    /// `target` declines the pending request from `from`. The sender's record is untouched.
    pub fn deny_request(&mut self, target: PlayerId, from: PlayerId) -> Result<(), FriendError> {
        let target_data = self.data_mut(target)?;
        if !target_data.remove_request(from) {
            return Err(FriendError::NoPendingRequest);
        }
        self.save_data(target)?;
        Ok(())
    }

    /// Ends the friendship between `remover` and `other` on both records.
    pub fn remove_friend(&mut self, remover: PlayerId, other: PlayerId) -> Result<(), FriendError> {
        let mut remover_data = self.get_data(remover)?.clone();
        if !remover_data.is_friend(other) {
            return Err(FriendError::NotFriends);
        }
        let mut other_data = self.get_data(other)?.clone();

        remover_data.remove_friend(other);
        other_data.remove_friend(remover);
        self.commit_pair(remover_data, other_data)
    }

    /// Persists two staged records together, then swaps them into the cache.
    /// If the commit fails the cache keeps the previous versions.
    fn commit_pair(
        &mut self,
        first: RelationshipRecord,
        second: RelationshipRecord,
    ) -> Result<(), FriendError> {
        if let Err(err) = self.files.commit(&[&first, &second]) {
            warn!(
                first = %first.owner(),
                second = %second.owner(),
                error = %err,
                "friend change rolled back"
            );
            return Err(err.into());
        }
        self.cache.insert(first.owner(), first);
        self.cache.insert(second.owner(), second);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ALICE: PlayerId = PlayerId::from_u128(1);
    const BOB: PlayerId = PlayerId::from_u128(2);
    const CAROL: PlayerId = PlayerId::from_u128(3);

    fn open(dir: &TempDir) -> RelationshipGraph {
        RelationshipGraph::open(dir.path(), &FriendSettings::default()).unwrap()
    }

    fn open_with_limits(
        dir: &TempDir,
        max_friends: usize,
        max_requests: usize,
    ) -> RelationshipGraph {
        let settings = FriendSettings {
            max_friends,
            max_requests,
            ..FriendSettings::default()
        };
        RelationshipGraph::open(dir.path(), &settings).unwrap()
    }

    fn befriend(graph: &mut RelationshipGraph, a: PlayerId, b: PlayerId) {
        graph.send_request(a, b).unwrap();
        graph.accept_request(b, a).unwrap();
    }

    #[test]
    fn test_send_request_records_on_receiver_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);

        graph.send_request(ALICE, BOB).unwrap();

        assert!(graph.get_data(BOB).unwrap().has_request_from(ALICE));
        assert!(!graph.get_data(ALICE).unwrap().has_request_from(BOB));
        assert!(dir.path().join(format!("{}.json", BOB)).exists());
        assert!(!dir.path().join(format!("{}.json", ALICE)).exists());
    }

    #[test]
    fn test_send_request_to_self_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        assert!(matches!(
            graph.send_request(ALICE, ALICE),
            Err(FriendError::SelfRequest)
        ));
        assert_eq!(graph.get_data(ALICE).unwrap().request_count(), 0);
    }

    #[test]
    fn test_duplicate_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        graph.send_request(ALICE, BOB).unwrap();
        assert!(matches!(
            graph.send_request(ALICE, BOB),
            Err(FriendError::RequestAlreadySent)
        ));
        assert_eq!(graph.get_data(BOB).unwrap().request_count(), 1);
    }

    #[test]
    fn test_accept_makes_friendship_symmetric() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        graph.send_request(ALICE, BOB).unwrap();

        graph.accept_request(BOB, ALICE).unwrap();

        assert!(graph.are_friends(ALICE, BOB).unwrap());
        assert!(graph.are_friends(BOB, ALICE).unwrap());
        assert!(!graph.get_data(BOB).unwrap().has_request_from(ALICE));
        assert!(!dir.path().join("pending.txn.json").exists());
    }

    #[test]
    fn test_request_to_existing_friend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        befriend(&mut graph, ALICE, BOB);
        assert!(matches!(
            graph.send_request(BOB, ALICE),
            Err(FriendError::AlreadyFriends)
        ));
    }

    #[test]
    fn test_accept_without_request_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        assert!(matches!(
            graph.accept_request(BOB, ALICE),
            Err(FriendError::NoPendingRequest)
        ));
        assert!(!graph.are_friends(ALICE, BOB).unwrap());
    }

    #[test]
    fn test_deny_removes_request_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        graph.send_request(ALICE, BOB).unwrap();

        graph.deny_request(BOB, ALICE).unwrap();

        assert!(!graph.get_data(BOB).unwrap().has_request_from(ALICE));
        assert!(!graph.are_friends(ALICE, BOB).unwrap());
        assert!(!graph.are_friends(BOB, ALICE).unwrap());
        assert!(matches!(
            graph.deny_request(BOB, ALICE),
            Err(FriendError::NoPendingRequest)
        ));
    }

    #[test]
    fn test_remove_friend_clears_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        befriend(&mut graph, ALICE, BOB);

        graph.remove_friend(BOB, ALICE).unwrap();

        assert!(!graph.are_friends(ALICE, BOB).unwrap());
        assert!(!graph.are_friends(BOB, ALICE).unwrap());
    }

    #[test]
    fn test_remove_non_friend_fails_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        befriend(&mut graph, ALICE, CAROL);

        assert!(matches!(
            graph.remove_friend(ALICE, BOB),
            Err(FriendError::NotFriends)
        ));
        assert_eq!(
            graph.get_data(ALICE).unwrap().friends().iter().copied().collect::<Vec<_>>(),
            vec![CAROL]
        );
    }

    #[test]
    fn test_sender_at_friend_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        for n in 100..150 {
            befriend(&mut graph, ALICE, PlayerId::from_u128(n));
        }
        assert_eq!(graph.get_data(ALICE).unwrap().friend_count(), 50);

        assert!(matches!(
            graph.send_request(ALICE, BOB),
            Err(FriendError::FriendLimitReached { limit: 50 })
        ));
        assert_eq!(graph.get_data(BOB).unwrap().request_count(), 0);
    }

    #[test]
    fn test_receiver_at_friend_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open_with_limits(&dir, 1, 50);
        befriend(&mut graph, BOB, CAROL);
        assert!(matches!(
            graph.send_request(ALICE, BOB),
            Err(FriendError::OtherFriendLimitReached)
        ));
    }

    #[test]
    fn test_full_request_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open_with_limits(&dir, 50, 2);
        graph.send_request(ALICE, BOB).unwrap();
        graph.send_request(CAROL, BOB).unwrap();
        assert!(matches!(
            graph.send_request(PlayerId::from_u128(4), BOB),
            Err(FriendError::RequestsFull)
        ));
    }

    #[test]
    fn test_accept_respects_friend_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open_with_limits(&dir, 1, 50);
        graph.send_request(ALICE, BOB).unwrap();
        graph.send_request(CAROL, BOB).unwrap();
        graph.accept_request(BOB, ALICE).unwrap();

        assert!(matches!(
            graph.accept_request(BOB, CAROL),
            Err(FriendError::FriendLimitReached { limit: 1 })
        ));
        assert!(graph.get_data(BOB).unwrap().has_request_from(CAROL));
        assert!(!graph.are_friends(BOB, CAROL).unwrap());
    }

    #[test]
    fn test_unload_saves_and_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        befriend(&mut graph, ALICE, BOB);
        assert!(graph.is_loaded(ALICE));

        graph.unload_data(ALICE).unwrap();
        assert!(!graph.is_loaded(ALICE));
        assert!(graph.are_friends(ALICE, BOB).unwrap());
        assert!(graph.is_loaded(ALICE));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut graph = open(&dir);
            befriend(&mut graph, ALICE, BOB);
            graph.send_request(CAROL, ALICE).unwrap();
            graph.save_all().unwrap();
        }

        let mut graph = open(&dir);
        assert_eq!(graph.loaded_count(), 0);
        assert!(graph.are_friends(BOB, ALICE).unwrap());
        assert!(graph.get_data(ALICE).unwrap().has_request_from(CAROL));
    }

    #[test]
    fn test_failed_commit_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        graph.send_request(ALICE, BOB).unwrap();
        graph.get_data(ALICE).unwrap();
        fs::create_dir(dir.path().join("pending.txn.json.tmp")).unwrap();

        assert!(matches!(
            graph.accept_request(BOB, ALICE),
            Err(FriendError::Persistence(_))
        ));
        assert!(graph.get_data(BOB).unwrap().has_request_from(ALICE));
        assert!(!graph.are_friends(ALICE, BOB).unwrap());
        assert!(!graph.are_friends(BOB, ALICE).unwrap());
    }

    fn block_writes(dir: &TempDir, owner: PlayerId) -> std::path::PathBuf {
        let squatter = dir.path().join(format!("{}.json.tmp", owner));
        fs::create_dir(&squatter).unwrap();
        squatter
    }

    #[test]
    fn test_failed_request_write_keeps_memory_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        block_writes(&dir, BOB);

        assert!(matches!(
            graph.send_request(ALICE, BOB),
            Err(FriendError::Persistence(_))
        ));
        assert!(graph.get_data(BOB).unwrap().has_request_from(ALICE));
    }

    #[test]
    fn test_failed_deny_write_keeps_memory_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        graph.send_request(ALICE, BOB).unwrap();
        block_writes(&dir, BOB);

        assert!(matches!(
            graph.deny_request(BOB, ALICE),
            Err(FriendError::Persistence(_))
        ));
        assert!(!graph.get_data(BOB).unwrap().has_request_from(ALICE));
    }

    #[test]
    fn test_failed_unload_keeps_record_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        befriend(&mut graph, ALICE, BOB);
        let squatter = block_writes(&dir, ALICE);

        assert!(graph.unload_data(ALICE).is_err());
        assert!(graph.is_loaded(ALICE));

        fs::remove_dir(&squatter).unwrap();
        graph.unload_data(ALICE).unwrap();
        assert!(!graph.is_loaded(ALICE));
    }

    #[test]
    fn test_stuck_commit_does_not_block_other_players() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = open(&dir);
        graph.send_request(ALICE, BOB).unwrap();
        block_writes(&dir, ALICE);
        graph.accept_request(BOB, ALICE).unwrap();
        assert!(dir.path().join("pending.txn.json").exists());

        let dave = PlayerId::from_u128(4);
        graph.send_request(CAROL, dave).unwrap();
        graph.accept_request(dave, CAROL).unwrap();
        assert!(graph.are_friends(CAROL, dave).unwrap());

        // A fresh graph sees the stuck friendship through the intent.
        let mut fresh = open(&dir);
        assert!(fresh.are_friends(ALICE, BOB).unwrap());
        assert!(fresh.are_friends(dave, CAROL).unwrap());
    }

    #[test]
    fn test_stuck_commit_is_rolled_forward_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut graph = open(&dir);
            graph.send_request(ALICE, BOB).unwrap();
            let squatter = block_writes(&dir, ALICE);
            graph.accept_request(BOB, ALICE).unwrap();
            assert!(!dir.path().join(format!("{}.json", ALICE)).exists());
            fs::remove_dir(&squatter).unwrap();
        }

        let mut graph = open(&dir);
        assert!(!dir.path().join("pending.txn.json").exists());
        assert!(dir.path().join(format!("{}.json", ALICE)).exists());
        assert!(graph.are_friends(ALICE, BOB).unwrap());
        assert!(graph.are_friends(BOB, ALICE).unwrap());
    }
}
