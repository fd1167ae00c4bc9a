//! Field codec: typed records to and from flat string maps.
//!
//! ## Encoding rules
//!
//! - Fields holding their zero value are omitted entirely.
//! - Integers and floats are decimal strings, booleans `"true"`/`"false"`.
//! - Timestamps are nanoseconds since the Unix epoch.
//! - Relations are not part of any field table, so they are never written;
//!   only the bare reference ids are.
//!
//! A zero field and an absent field decode to the same thing, which is what
//! lets a partial record merge over a stored one.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::field::{FieldKind, Record, CREATED_AT, DELETED_AT, ID, UPDATED_AT};
use crate::types::Timestamp;

/// Encode a record into `(field, value)` pairs, skipping zero fields.
pub fn encode<R: Record>(record: &R) -> Vec<(String, String)> {
    R::fields()
        .iter()
        .filter_map(|def| {
            let value = (def.get)(record);
            (!value.is_zero()).then(|| (def.name.to_string(), value.encode()))
        })
        .collect()
}

/// Decode a stored hash into a record.
///
/// Missing fields stay at their zero value and unknown fields are ignored.
/// A field that is present but cannot be parsed fails the whole decode; `key`
/// is only used to name the entry in that error.
pub fn decode<R: Record>(key: &str, map: &HashMap<String, String>) -> Result<R, CoreError> {
    let mut record = R::default();
    for def in R::fields() {
        let Some(raw) = map.get(def.name) else {
            continue;
        };
        let value = def.kind.parse(raw).map_err(|reason| CoreError::Decode {
            key: key.to_string(),
            field: def.name,
            reason,
        })?;
        (def.set)(&mut record, value).map_err(|reason| CoreError::Decode {
            key: key.to_string(),
            field: def.name,
            reason,
        })?;
    }
    Ok(record)
}

/// Check that `record` would decode again once written.
pub fn ensure_decodable<R: Record>(record: &R) -> Result<(), CoreError> {
    let map: HashMap<String, String> = encode(record).into_iter().collect();
    decode::<R>(&record.storage_key(), &map).map(|_| ())
}

/// Read the tombstone straight from a raw hash.
///
/// Returns the deletion time when the record is logically deleted. An
/// unparsable tombstone counts as alive and is left for [`decode`] to report.
pub fn tombstone(map: &HashMap<String, String>) -> Option<Timestamp> {
    map.get(DELETED_AT)
        .and_then(|raw| FieldKind::Time.parse(raw).ok())
        .and_then(|v| v.as_time().ok())
        .filter(|t| t.is_set())
}

/// Merge a partial record over the previously stored version.
///
/// Every zero field of `incoming` inherits the value from `previous`. The id,
/// creation time and tombstone always come from `previous`, and the update
/// time is always `now`.
pub fn merge<R: Record>(incoming: &mut R, previous: &R, now: Timestamp) -> Result<(), CoreError> {
    let key = previous.storage_key();
    for def in R::fields() {
        let inherit = match def.name {
            ID | CREATED_AT | DELETED_AT => true,
            UPDATED_AT => false,
            _ => (def.get)(incoming).is_zero(),
        };
        if inherit {
            (def.set)(incoming, (def.get)(previous)).map_err(|reason| CoreError::Decode {
                key: key.clone(),
                field: def.name,
                reason,
            })?;
        }
    }
    incoming.set_updated_at(now);
    Ok(())
}
