//! Record store: create, read, merge-update, list and soft-delete for one
//! collection, on top of the allocator, the uniqueness index and the codec.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use ticketkv_core::field::DELETED_AT;
use ticketkv_core::{codec, FieldValue, Record, RecordId, Timestamp, UniqueClaim, ValidationError};

use crate::allocator::IdAllocator;
use crate::deadline::{within, DEFAULT_TIMEOUT};
use crate::error::{Result, StoreError};
use crate::traits::KvBackend;
use crate::unique::UniqueIndex;

/// Generic persistence for records of type `R`.
///
/// Validation is the caller's job: [`create`](Self::create) and
/// [`commit_update`](Self::commit_update) write whatever they are given,
/// enforcing only uniqueness and that the record can be read back.
pub struct RecordStore<R, B: ?Sized> {
    backend: Arc<B>,
    allocator: IdAllocator<B>,
    unique: UniqueIndex<B>,
    timeout: Duration,
    _record: PhantomData<fn() -> R>,
}

impl<R, B: ?Sized> Clone for RecordStore<R, B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            allocator: self.allocator.clone(),
            unique: self.unique.clone(),
            timeout: self.timeout,
            _record: PhantomData,
        }
    }
}

impl<R: Record, B: KvBackend + ?Sized> RecordStore<R, B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            allocator: IdAllocator::new(backend.clone()),
            unique: UniqueIndex::new(backend.clone()),
            backend,
            timeout: DEFAULT_TIMEOUT,
            _record: PhantomData,
        }
    }

    /// Bound every backend call made through this store by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.allocator = self.allocator.with_timeout(timeout);
        self.unique = self.unique.with_timeout(timeout);
        self.timeout = timeout;
        self
    }

    pub fn unique(&self) -> &UniqueIndex<B> {
        &self.unique
    }

    pub fn allocator(&self) -> &IdAllocator<B> {
        &self.allocator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new record and return it as stored.
    ///
    /// Unique values are checked before an id is allocated, so a plain
    /// duplicate does not consume one. A conflict that only shows up at
    /// claim time (a racing writer) burns the allocated id.
    pub async fn create(&self, mut record: R, now: Timestamp) -> Result<R> {
        let collection = R::COLLECTION;
        unreadable(&record)?;
        let claims = record.unique_claims();
        self.unique
            .ensure_available(collection, None, &claims)
            .await?;

        let id = self.allocator.next_id(collection).await?;
        record.set_id(id);
        record.set_created_at(now);
        record.set_updated_at(now);
        record.set_deleted_at(Timestamp::ZERO);
        let key = record.storage_key();

        if let Err(err) = self.unique.reconcile(collection, &key, &[], &claims).await {
            tracing::debug!(collection = %collection, id = %id, error = %err, "create lost a unique claim, id burned");
            return Err(err);
        }

        if let Err(err) = self.write(&key, &record).await {
            self.restore_claims(&key, &claims, &[]).await;
            return Err(err);
        }

        tracing::debug!(collection = %collection, key = %key, "created record");
        self.reload(id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a live record by id. Missing and tombstoned records are `None`.
    pub async fn get(&self, id: RecordId) -> Result<Option<R>> {
        if id.is_zero() {
            return Ok(None);
        }
        self.get_by_key(&R::COLLECTION.storage_key(id)).await
    }

    /// Fetch a live record by its storage key.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<R>> {
        let map = within("hget_all", self.timeout, self.backend.hget_all(key)).await?;
        if map.is_empty() || codec::tombstone(&map).is_some() {
            return Ok(None);
        }
        Ok(Some(codec::decode(key, &map)?))
    }

    /// Every live record of the collection, sorted by id.
    ///
    /// Entries that fail to decode are logged and skipped.
    pub async fn list(&self) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        let keys = within(
            "scan_prefix",
            self.timeout,
            self.backend.scan_prefix(&collection.key_prefix()),
        )
        .await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if collection.parse_storage_key(&key).is_none() {
                continue;
            }
            let map = within("hget_all", self.timeout, self.backend.hget_all(&key)).await?;
            if map.is_empty() || codec::tombstone(&map).is_some() {
                continue;
            }
            match codec::decode::<R>(&key, &map) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(collection = %collection, key = %key, error = %err, "skipping undecodable record");
                }
            }
        }

        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the live record an update targets.
    pub async fn load_previous(&self, id: RecordId) -> Result<R> {
        if id.is_zero() {
            return Err(ValidationError::MissingId.into());
        }
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(R::COLLECTION.storage_key(id)))
    }

    /// Fill the zero fields of `incoming` from `previous`.
    pub fn merge(&self, mut incoming: R, previous: &R, now: Timestamp) -> Result<R> {
        codec::merge(&mut incoming, previous, now)?;
        Ok(incoming)
    }

    /// Persist a merged record over `previous`.
    ///
    /// Only the unique values that changed are claimed or released.
    pub async fn commit_update(&self, merged: R, previous: &R) -> Result<R> {
        let collection = R::COLLECTION;
        let key = previous.storage_key();
        let old_claims = previous.unique_claims();
        let new_claims = merged.unique_claims();
        unreadable(&merged)?;

        self.unique
            .reconcile(collection, &key, &old_claims, &new_claims)
            .await?;

        if let Err(err) = self.write(&key, &merged).await {
            self.restore_claims(&key, &new_claims, &old_claims).await;
            return Err(err);
        }

        tracing::debug!(collection = %collection, key = %key, "updated record");
        self.reload(previous.id()).await
    }

    /// Load, merge and commit in one go, for records without update rules.
    pub async fn update(&self, incoming: R, now: Timestamp) -> Result<R> {
        let previous = self.load_previous(incoming.id()).await?;
        let merged = self.merge(incoming, &previous, now)?;
        self.commit_update(merged, &previous).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delete
    // ─────────────────────────────────────────────────────────────────────────

    /// Release the unique values of a live record, then tombstone it.
    ///
    /// The record stays live until the tombstone is written, so a delete
    /// that fails part way can be retried.
    pub async fn soft_delete(&self, id: RecordId, now: Timestamp) -> Result<R> {
        let collection = R::COLLECTION;
        let mut record = self.load_previous(id).await?;
        let key = record.storage_key();
        let claims = record.unique_claims();

        self.unique.reconcile(collection, &key, &claims, &[]).await?;

        let tombstone = vec![(DELETED_AT.to_string(), FieldValue::Time(now).encode())];
        let written = within("hset_all", self.timeout, self.backend.hset_all(&key, &tombstone)).await;
        if let Err(err) = written {
            self.restore_claims(&key, &[], &claims).await;
            return Err(err);
        }
        record.set_deleted_at(now);

        tracing::debug!(collection = %collection, key = %key, "soft-deleted record");
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn write(&self, key: &str, record: &R) -> Result<()> {
        let fields = codec::encode(record);
        within("hset_all", self.timeout, self.backend.hset_all(key, &fields)).await
    }

    /// Read-after-write.
    async fn reload(&self, id: RecordId) -> Result<R> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(R::COLLECTION.storage_key(id)))
    }

    /// Best-effort undo of a reconcile after the hash write failed.
    async fn restore_claims(&self, key: &str, current: &[UniqueClaim], previous: &[UniqueClaim]) {
        if let Err(err) = self
            .unique
            .reconcile(R::COLLECTION, key, current, previous)
            .await
        {
            tracing::warn!(collection = %R::COLLECTION, key = %key, error = %err, "failed to restore unique claims");
        }
    }
}

/// Refuse a record whose encoding would not decode again.
fn unreadable<R: Record>(record: &R) -> Result<()> {
    codec::ensure_decodable(record).map_err(|e| StoreError::InvalidData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use ticketkv_core::{Collection, Event, Role, User};

    fn store() -> (Arc<MemoryBackend>, RecordStore<User, MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), RecordStore::new(backend))
    }

    fn user(username: &str, email: &str) -> User {
        User {
            username: username.into(),
            fullname: "Some One".into(),
            email: email.into(),
            password: "hashed".into(),
            role: Some(Role::Participant),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let (_, store) = store();
        let created = store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(100))
            .await
            .unwrap();

        assert_eq!(created.id, RecordId::new(1));
        assert_eq!(created.created_at, Timestamp::from_nanos(100));
        assert_eq!(created.updated_at, Timestamp::from_nanos(100));
        assert_eq!(store.get(RecordId::new(1)).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_does_not_consume_id() {
        let (_, store) = store();
        let now = Timestamp::from_nanos(1);
        store.create(user("alice1", "a@x.com"), now).await.unwrap();

        let err = store
            .create(user("alice1", "other@x.com"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "username", .. }));
        assert_eq!(store.allocator().current(Collection::User).await.unwrap(), 1);

        let next = store.create(user("bobby", "b@x.com"), now).await.unwrap();
        assert_eq!(next.id, RecordId::new(2));
    }

    #[tokio::test]
    async fn test_update_merges_and_moves_unique_value() {
        let (_, store) = store();
        let created = store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(1))
            .await
            .unwrap();

        let partial = User {
            id: created.id,
            email: "new@x.com".into(),
            ..User::default()
        };
        let updated = store.update(partial, Timestamp::from_nanos(2)).await.unwrap();

        assert_eq!(updated.username, "alice1");
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(updated.created_at, Timestamp::from_nanos(1));
        assert_eq!(updated.updated_at, Timestamp::from_nanos(2));

        // The old email is free again.
        store
            .create(user("carol", "a@x.com"), Timestamp::from_nanos(3))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_requires_live_record() {
        let (_, store) = store();
        let err = store
            .update(User::default(), Timestamp::from_nanos(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::MissingId)));

        let missing = User {
            id: RecordId::new(9),
            ..User::default()
        };
        let err = store.update(missing, Timestamp::from_nanos(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(key) if key == "user_9"));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_and_releases() {
        let (_, store) = store();
        let created = store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(1))
            .await
            .unwrap();

        store.soft_delete(created.id, Timestamp::from_nanos(5)).await.unwrap();

        assert_eq!(store.get(created.id).await.unwrap(), None);
        assert!(store.list().await.unwrap().is_empty());
        let again = store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(6))
            .await
            .unwrap();
        assert_eq!(again.id, RecordId::new(2));
    }

    #[tokio::test]
    async fn test_failed_tombstone_keeps_record_and_values() {
        let (backend, store) = store();
        let created = store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(1))
            .await
            .unwrap();

        backend.fail_on(Some("hset_all"));
        let err = store.soft_delete(created.id, Timestamp::from_nanos(5)).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.get(created.id).await.unwrap(), Some(created.clone()));
        let owner = store
            .unique()
            .check(Collection::User, "username", "alice1")
            .await
            .unwrap();
        assert_eq!(owner.as_deref(), Some("user_1"));

        backend.fail_on(None);
        store.soft_delete(created.id, Timestamp::from_nanos(6)).await.unwrap();
        assert_eq!(store.get(created.id).await.unwrap(), None);
        store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(7))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_release_can_be_retried() {
        let (backend, store) = store();
        let created = store
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(1))
            .await
            .unwrap();

        backend.fail_on(Some("del_if_eq"));
        assert!(store.soft_delete(created.id, Timestamp::from_nanos(5)).await.is_err());
        assert!(store.get(created.id).await.unwrap().is_some());

        backend.fail_on(None);
        store.soft_delete(created.id, Timestamp::from_nanos(6)).await.unwrap();
        for (field, value) in [("username", "alice1"), ("email", "a@x.com")] {
            let owner = store.unique().check(Collection::User, field, value).await.unwrap();
            assert_eq!(owner, None);
        }
    }

    #[tokio::test]
    async fn test_unreadable_record_is_never_written() {
        let backend = Arc::new(MemoryBackend::new());
        let events: RecordStore<Event, MemoryBackend> = RecordStore::new(backend.clone());
        let wide = Event {
            title: "Go Meetup".into(),
            link: "/event/go-meetup".into(),
            creator_id: RecordId::new(u64::MAX),
            ..Event::default()
        };

        let err = events.create(wide, Timestamp::from_nanos(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        assert_eq!(events.allocator().current(Collection::Event).await.unwrap(), 0);
        assert!(events.unique().ledger(Collection::Event).await.unwrap().is_empty());
        assert!(backend.scan_prefix("event_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_undecodable_entries() {
        let (backend, store) = store();
        let now = Timestamp::from_nanos(1);
        store.create(user("alice1", "a@x.com"), now).await.unwrap();
        store.create(user("bobby", "b@x.com"), now).await.unwrap();
        backend
            .hset_all("user_3", &[("created_at".into(), "not-a-number".into())])
            .await
            .unwrap();

        let users = store.list().await.unwrap();
        assert_eq!(
            users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
            vec!["alice1", "bobby"]
        );

        // A single read surfaces the decode failure.
        assert!(matches!(
            store.get(RecordId::new(3)).await,
            Err(StoreError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let (backend, store) = store();
        let store = store.with_timeout(Duration::from_millis(10));
        backend.set_latency(Some(Duration::from_millis(200)));

        let err = store.get(RecordId::new(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let backend = Arc::new(MemoryBackend::new());
        let events: RecordStore<Event, MemoryBackend> = RecordStore::new(backend.clone());
        let users: RecordStore<User, MemoryBackend> = RecordStore::new(backend);

        let event = Event {
            title: "Go Meetup".into(),
            link: "/event/go-meetup".into(),
            ..Event::default()
        };
        let event = events.create(event, Timestamp::from_nanos(1)).await.unwrap();
        let user = users
            .create(user("alice1", "a@x.com"), Timestamp::from_nanos(1))
            .await
            .unwrap();

        assert_eq!(event.id, RecordId::new(1));
        assert_eq!(user.id, RecordId::new(1));
        assert_eq!(events.list().await.unwrap().len(), 1);
    }
}
