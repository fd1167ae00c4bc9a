//! Persisted key layout.
//!
//! | key                                   | kind    | holds                          |
//! |---------------------------------------|---------|--------------------------------|
//! | `<collection>_<id>`                   | hash    | one encoded record             |
//! | `idx_<collection>`                    | integer | last allocated id              |
//! | `uk_<collection>`                     | set     | JSON `[storageKey, value, ..]` |
//! | `uk_<collection>:<field>:<value>`     | string  | storage key owning the value   |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// One of the record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    User,
    Event,
    Transaction,
}

impl Collection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Event => "event",
            Self::Transaction => "transaction",
        }
    }

    /// Key of the hash holding record `id`.
    pub fn storage_key(self, id: RecordId) -> String {
        format!("{}_{}", self.as_str(), id.get())
    }

    /// Prefix shared by every record key in this collection.
    pub fn key_prefix(self) -> String {
        format!("{}_", self.as_str())
    }

    /// Parse `<collection>_<id>`. Returns `None` for anything else,
    /// including a zero id.
    pub fn parse_storage_key(self, key: &str) -> Option<RecordId> {
        let rest = key.strip_prefix(self.as_str())?.strip_prefix('_')?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(RecordId::new)
    }

    pub fn counter_key(self) -> String {
        format!("idx_{}", self.as_str())
    }

    /// The ledger set of `[storageKey, value, ...]` tuples.
    pub fn ledger_key(self) -> String {
        format!("uk_{}", self.as_str())
    }

    pub fn unique_value_key(self, field: &str, value: &str) -> String {
        format!("uk_{}:{}:{}", self.as_str(), field, value)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let c = Collection::Transaction;
        assert_eq!(c.storage_key(RecordId::new(5)), "transaction_5");
        assert_eq!(c.counter_key(), "idx_transaction");
        assert_eq!(c.ledger_key(), "uk_transaction");
        assert_eq!(
            Collection::User.unique_value_key("email", "a@x.com"),
            "uk_user:email:a@x.com"
        );
    }

    #[test]
    fn test_parse_storage_key() {
        assert_eq!(
            Collection::User.parse_storage_key("user_12"),
            Some(RecordId::new(12))
        );
        assert_eq!(Collection::User.parse_storage_key("user_0"), None);
        assert_eq!(Collection::User.parse_storage_key("user_"), None);
        assert_eq!(Collection::User.parse_storage_key("user_1a"), None);
        assert_eq!(Collection::User.parse_storage_key("event_1"), None);
        assert_eq!(Collection::User.parse_storage_key("alice1"), None);
        assert_eq!(Collection::User.parse_storage_key("user_+3"), None);
    }
}
