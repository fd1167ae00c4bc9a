//! Entity repositories: collection-specific rules over the generic
//! [`RecordStore`].
//!
//! Each repository validates before anything is written, forces the fields a
//! caller may not choose, and resolves relations by id at read time.

mod event;
mod transaction;
mod user;

pub use event::{EventRepository, EventWithCreator};
pub use transaction::{TransactionDetails, TransactionRepository};
pub use user::UserRepository;

use ticketkv_core::Record;
use ticketkv_store::{KvBackend, RecordStore};

use crate::error::Result;

/// A record store over the shared, dynamically chosen backend.
pub type Store<R> = RecordStore<R, dyn KvBackend>;

/// Look a record up by storage key (`user_3`) or by any of its unique
/// values (a username, an email, `user_1:event_2`, ...).
///
/// A string that parses as a storage key but names no live record is still
/// tried as a unique value.
pub(crate) async fn find_record<R: Record>(store: &Store<R>, key_or_value: &str) -> Result<Option<R>> {
    if R::COLLECTION.parse_storage_key(key_or_value).is_some() {
        if let Some(record) = store.get_by_key(key_or_value).await? {
            return Ok(Some(record));
        }
    }

    let owner = store
        .unique()
        .find_owner(R::COLLECTION, R::UNIQUE_FIELDS, key_or_value)
        .await?;
    match owner {
        Some(key) => Ok(store.get_by_key(&key).await?),
        None => Ok(None),
    }
}
