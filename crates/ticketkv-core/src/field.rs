//! Field tables: compile-time descriptions of a record's scalar fields.
//!
//! Each record type lists its fields once, as a static slice of [`FieldDef`]
//! holding the stored name, the scalar kind and a getter/setter pair. The
//! codec and the merge-on-update logic walk that table instead of inspecting
//! the struct at runtime.

use crate::keys::Collection;
use crate::types::{RecordId, Timestamp};

/// Stored name of the identifier field.
pub const ID: &str = "id";
/// Stored name of the creation timestamp.
pub const CREATED_AT: &str = "created_at";
/// Stored name of the update timestamp.
pub const UPDATED_AT: &str = "updated_at";
/// Stored name of the tombstone timestamp.
pub const DELETED_AT: &str = "deleted_at";

/// The scalar kind of a field, which fixes its string encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Text,
    Bool,
    Time,
}

impl FieldKind {
    /// Parse a stored string scalar into a value of this kind.
    pub fn parse(self, raw: &str) -> Result<FieldValue, String> {
        match self {
            Self::Int => raw
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|e| e.to_string()),
            Self::Float => raw
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|e| e.to_string()),
            Self::Text => Ok(FieldValue::Text(raw.to_string())),
            Self::Bool => match raw {
                "true" => Ok(FieldValue::Bool(true)),
                "false" => Ok(FieldValue::Bool(false)),
                other => Err(format!("expected true or false, got {other:?}")),
            },
            Self::Time => raw
                .parse::<i64>()
                .map(|n| FieldValue::Time(Timestamp::from_nanos(n)))
                .map_err(|e| e.to_string()),
        }
    }
}

/// A field value lifted out of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Time(Timestamp),
}

impl FieldValue {
    /// Whether this is the kind's zero value. Zero fields are omitted on
    /// write and inherited from the stored record on update.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Text(v) => v.is_empty(),
            Self::Bool(v) => !*v,
            Self::Time(v) => v.is_zero(),
        }
    }

    /// The string scalar stored in the hash.
    pub fn encode(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            // Display prints the shortest string that parses back exactly.
            Self::Float(v) => v.to_string(),
            Self::Text(v) => v.clone(),
            Self::Bool(v) => if *v { "true" } else { "false" }.to_string(),
            Self::Time(v) => v.as_nanos().to_string(),
        }
    }

    pub fn into_text(self) -> Result<String, String> {
        match self {
            Self::Text(v) => Ok(v),
            other => Err(format!("expected text, got {other:?}")),
        }
    }

    pub fn as_i64(&self) -> Result<i64, String> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(format!("expected integer, got {other:?}")),
        }
    }

    pub fn as_id(&self) -> Result<RecordId, String> {
        let v = self.as_i64()?;
        u64::try_from(v)
            .map(RecordId::new)
            .map_err(|_| format!("identifier must not be negative, got {v}"))
    }

    pub fn as_f64(&self) -> Result<f64, String> {
        match self {
            Self::Float(v) => Ok(*v),
            other => Err(format!("expected float, got {other:?}")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, String> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(format!("expected boolean, got {other:?}")),
        }
    }

    pub fn as_time(&self) -> Result<Timestamp, String> {
        match self {
            Self::Time(v) => Ok(*v),
            other => Err(format!("expected timestamp, got {other:?}")),
        }
    }

    /// Nullable timestamps store `None` as the zero time.
    pub fn as_optional_time(&self) -> Result<Option<Timestamp>, String> {
        self.as_time().map(|t| (!t.is_zero()).then_some(t))
    }

    /// An id past [`RecordId::MAX`] keeps its decimal text, which no
    /// `Int` field decodes.
    pub fn id(id: RecordId) -> Self {
        match i64::try_from(id.get()) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Text(id.to_string()),
        }
    }

    pub fn optional_time(t: Option<Timestamp>) -> Self {
        Self::Time(t.unwrap_or(Timestamp::ZERO))
    }
}

/// One row of a record's field table.
pub struct FieldDef<R> {
    /// Name of the field inside the stored hash.
    pub name: &'static str,
    pub kind: FieldKind,
    pub get: fn(&R) -> FieldValue,
    pub set: fn(&mut R, FieldValue) -> Result<(), String>,
}

/// A unique value a record holds, e.g. `("email", "a@x.com")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueClaim {
    pub field: &'static str,
    pub value: String,
}

impl UniqueClaim {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// A typed entity stored as one hash per record.
pub trait Record: Clone + Default + Send + Sync + 'static {
    /// The collection this record type lives in.
    const COLLECTION: Collection;

    /// Names of the fields that carry uniqueness constraints, tried in
    /// order when resolving a raw unique value.
    const UNIQUE_FIELDS: &'static [&'static str];

    /// The field table, in storage order.
    fn fields() -> &'static [FieldDef<Self>];

    /// Unique values this record currently holds. Empty values are never
    /// claimed; a record may give up its claims (e.g. a cancelled
    /// transaction) by returning none.
    fn unique_claims(&self) -> Vec<UniqueClaim>;

    fn id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
    fn created_at(&self) -> Timestamp;
    fn set_created_at(&mut self, at: Timestamp);
    fn updated_at(&self) -> Timestamp;
    fn set_updated_at(&mut self, at: Timestamp);
    fn deleted_at(&self) -> Timestamp;
    fn set_deleted_at(&mut self, at: Timestamp);

    /// `<collection>_<id>` for this record.
    fn storage_key(&self) -> String {
        Self::COLLECTION.storage_key(self.id())
    }

    /// Look up a field definition by its stored name.
    fn field(name: &str) -> Option<&'static FieldDef<Self>> {
        Self::fields().iter().find(|f| f.name == name)
    }
}
