//! Uniqueness index.
//!
//! ## Overview
//!
//! Every unique value a live record holds is owned through one string key,
//! `uk_<collection>:<field>:<value>`, whose content is the owner's storage
//! key. Claiming is a set-if-absent and releasing a compare-and-delete, so
//! two racing writers can never both own the same value.
//!
//! Next to the value keys, the `uk_<collection>` set keeps one ledger tuple
//! per record, a JSON array `[storageKey, value, ...]`, describing which
//! values that record holds. The ledger is informational; ownership is
//! decided by the value keys alone.
//!
//! ## Key Types
//!
//! - [`UniqueIndex`] - claim, release and look up unique values
//! - [`LedgerEntry`] - one decoded ledger tuple

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use ticketkv_core::{Collection, UniqueClaim};

use crate::deadline::{within, DEFAULT_TIMEOUT};
use crate::error::{Result, StoreError};
use crate::traits::KvBackend;

/// A decoded ledger tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub storage_key: String,
    pub values: Vec<String>,
}

/// Claims and releases unique values on behalf of records.
pub struct UniqueIndex<B: ?Sized> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: ?Sized> Clone for UniqueIndex<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            timeout: self.timeout,
        }
    }
}

fn ledger_tuple(storage_key: &str, claims: &[UniqueClaim]) -> Result<String> {
    let mut tuple = Vec::with_capacity(claims.len() + 1);
    tuple.push(storage_key);
    tuple.extend(claims.iter().map(|c| c.value.as_str()));
    serde_json::to_string(&tuple).map_err(|e| StoreError::InvalidData(e.to_string()))
}

impl<B: KvBackend + ?Sized> UniqueIndex<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The storage key owning `value` in `field`, if any.
    pub async fn check(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Option<String>> {
        let key = collection.unique_value_key(field, value);
        within("get", self.timeout, self.backend.get(&key)).await
    }

    /// Fail with [`StoreError::Conflict`] if any claim is owned by a record
    /// other than `storage_key`. Nothing is written.
    pub async fn ensure_available(
        &self,
        collection: Collection,
        storage_key: Option<&str>,
        claims: &[UniqueClaim],
    ) -> Result<()> {
        for claim in claims {
            if let Some(owner) = self.check(collection, claim.field, &claim.value).await? {
                if Some(owner.as_str()) != storage_key {
                    return Err(conflict(collection, claim));
                }
            }
        }
        Ok(())
    }

    /// Take ownership of every claim for `storage_key`.
    ///
    /// A value already owned by `storage_key` counts as claimed. On the first
    /// value owned by someone else, the values taken by this call are given
    /// back and the conflict is returned.
    pub async fn claim(
        &self,
        collection: Collection,
        storage_key: &str,
        claims: &[UniqueClaim],
    ) -> Result<()> {
        let mut taken: Vec<UniqueClaim> = Vec::with_capacity(claims.len());

        for claim in claims {
            match self.claim_one(collection, storage_key, claim).await {
                Ok(true) => taken.push(claim.clone()),
                Ok(false) => {}
                Err(err) => {
                    if let Err(rollback) = self.release(collection, storage_key, &taken).await {
                        tracing::warn!(
                            collection = %collection,
                            key = storage_key,
                            error = %rollback,
                            "failed to roll back unique claims"
                        );
                    }
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Returns `true` when this call took the value, `false` when
    /// `storage_key` already held it.
    async fn claim_one(
        &self,
        collection: Collection,
        storage_key: &str,
        claim: &UniqueClaim,
    ) -> Result<bool> {
        let key = collection.unique_value_key(claim.field, &claim.value);

        // A value released between the failed set and the read gets one
        // more attempt.
        for _ in 0..2 {
            if within("set_nx", self.timeout, self.backend.set_nx(&key, storage_key)).await? {
                return Ok(true);
            }
            match within("get", self.timeout, self.backend.get(&key)).await? {
                Some(owner) if owner == storage_key => return Ok(false),
                Some(_) => return Err(conflict(collection, claim)),
                None => continue,
            }
        }

        Err(conflict(collection, claim))
    }

    /// Give up every claim still owned by `storage_key`. Values owned by
    /// another record are left alone. Idempotent.
    pub async fn release(
        &self,
        collection: Collection,
        storage_key: &str,
        claims: &[UniqueClaim],
    ) -> Result<()> {
        for claim in claims {
            let key = collection.unique_value_key(claim.field, &claim.value);
            let released = within(
                "del_if_eq",
                self.timeout,
                self.backend.del_if_eq(&key, storage_key),
            )
            .await?;
            if !released {
                tracing::warn!(
                    collection = %collection,
                    key = storage_key,
                    field = claim.field,
                    "unique value was not owned at release"
                );
            }
        }
        Ok(())
    }

    /// Move `storage_key` from holding `previous` to holding `current`.
    ///
    /// New values are claimed first, so a conflict leaves everything as it
    /// was. Stale values are released afterwards and the ledger tuple is
    /// replaced.
    pub async fn reconcile(
        &self,
        collection: Collection,
        storage_key: &str,
        previous: &[UniqueClaim],
        current: &[UniqueClaim],
    ) -> Result<()> {
        let (added, removed) = diff(previous, current);
        self.claim(collection, storage_key, &added).await?;
        self.release(collection, storage_key, &removed).await?;
        self.replace_ledger(collection, storage_key, previous, current)
            .await
    }

    /// Swap the ledger tuple of `storage_key`. No-op when the claims did not
    /// change.
    pub async fn replace_ledger(
        &self,
        collection: Collection,
        storage_key: &str,
        previous: &[UniqueClaim],
        current: &[UniqueClaim],
    ) -> Result<()> {
        if previous == current {
            return Ok(());
        }
        let ledger = collection.ledger_key();
        if !previous.is_empty() {
            let tuple = ledger_tuple(storage_key, previous)?;
            within("srem", self.timeout, self.backend.srem(&ledger, &tuple)).await?;
        }
        if !current.is_empty() {
            let tuple = ledger_tuple(storage_key, current)?;
            within("sadd", self.timeout, self.backend.sadd(&ledger, &tuple)).await?;
        }
        Ok(())
    }

    /// Resolve a raw unique value to its owner by probing `fields` in order.
    pub async fn find_owner(
        &self,
        collection: Collection,
        fields: &[&str],
        value: &str,
    ) -> Result<Option<String>> {
        for field in fields {
            if let Some(owner) = self.check(collection, field, value).await? {
                return Ok(Some(owner));
            }
        }
        Ok(None)
    }

    /// Decoded ledger tuples of a collection. Malformed members are skipped.
    pub async fn ledger(&self, collection: Collection) -> Result<Vec<LedgerEntry>> {
        let members = within(
            "smembers",
            self.timeout,
            self.backend.smembers(&collection.ledger_key()),
        )
        .await?;

        let mut entries = Vec::with_capacity(members.len());
        for member in members {
            match serde_json::from_str::<Vec<String>>(&member) {
                Ok(mut tuple) if !tuple.is_empty() => {
                    let storage_key = tuple.remove(0);
                    entries.push(LedgerEntry {
                        storage_key,
                        values: tuple,
                    });
                }
                _ => tracing::warn!(collection = %collection, member = %member, "skipping malformed ledger tuple"),
            }
        }
        Ok(entries)
    }
}

fn conflict(collection: Collection, claim: &UniqueClaim) -> StoreError {
    StoreError::Conflict {
        collection,
        field: claim.field,
        value: claim.value.clone(),
    }
}

/// Split into (claims only in `current`, claims only in `previous`).
fn diff(previous: &[UniqueClaim], current: &[UniqueClaim]) -> (Vec<UniqueClaim>, Vec<UniqueClaim>) {
    let before: BTreeSet<&UniqueClaim> = previous.iter().collect();
    let after: BTreeSet<&UniqueClaim> = current.iter().collect();
    let added = current
        .iter()
        .filter(|c| !before.contains(c))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|c| !after.contains(c))
        .cloned()
        .collect();
    (added, removed)
}
