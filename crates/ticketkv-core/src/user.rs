//! User records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field::{FieldDef, FieldKind, FieldValue, Record, UniqueClaim};
use crate::keys::Collection;
use crate::types::{RecordId, Timestamp};

/// A user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Creator,
    Participant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Creator => "creator",
            Self::Participant => "participant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "creator" => Ok(Self::Creator),
            "participant" => Ok(Self::Participant),
            other => Err(CoreError::UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// A registered account.
///
/// `password` holds the hash once the record has been stored; it is never
/// serialized outward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Option<Role>,
    pub deleted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

static USER_FIELDS: [FieldDef<User>; 9] = [
    FieldDef {
        name: "id",
        kind: FieldKind::Int,
        get: |u| FieldValue::id(u.id),
        set: |u, v| {
            u.id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "username",
        kind: FieldKind::Text,
        get: |u| FieldValue::Text(u.username.clone()),
        set: |u, v| {
            u.username = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "fullname",
        kind: FieldKind::Text,
        get: |u| FieldValue::Text(u.fullname.clone()),
        set: |u, v| {
            u.fullname = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "email",
        kind: FieldKind::Text,
        get: |u| FieldValue::Text(u.email.clone()),
        set: |u, v| {
            u.email = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "password",
        kind: FieldKind::Text,
        get: |u| FieldValue::Text(u.password.clone()),
        set: |u, v| {
            u.password = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "role",
        kind: FieldKind::Text,
        get: |u| FieldValue::Text(u.role.map(Role::as_str).unwrap_or_default().to_string()),
        set: |u, v| {
            let raw = v.into_text()?;
            u.role = if raw.is_empty() {
                None
            } else {
                Some(raw.parse().map_err(|e: CoreError| e.to_string())?)
            };
            Ok(())
        },
    },
    FieldDef {
        name: "deleted_at",
        kind: FieldKind::Time,
        get: |u| FieldValue::Time(u.deleted_at),
        set: |u, v| {
            u.deleted_at = v.as_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "created_at",
        kind: FieldKind::Time,
        get: |u| FieldValue::Time(u.created_at),
        set: |u, v| {
            u.created_at = v.as_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "updated_at",
        kind: FieldKind::Time,
        get: |u| FieldValue::Time(u.updated_at),
        set: |u, v| {
            u.updated_at = v.as_time()?;
            Ok(())
        },
    },
];

impl Record for User {
    const COLLECTION: Collection = Collection::User;
    const UNIQUE_FIELDS: &'static [&'static str] = &["username", "email"];

    fn fields() -> &'static [FieldDef<Self>] {
        &USER_FIELDS
    }

    fn unique_claims(&self) -> Vec<UniqueClaim> {
        let mut claims = Vec::with_capacity(2);
        if !self.username.is_empty() {
            claims.push(UniqueClaim::new("username", self.username.clone()));
        }
        if !self.email.is_empty() {
            claims.push(UniqueClaim::new("email", self.email.clone()));
        }
        claims
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn set_created_at(&mut self, at: Timestamp) {
        self.created_at = at;
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: Timestamp) {
        self.updated_at = at;
    }

    fn deleted_at(&self) -> Timestamp {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Timestamp) {
        self.deleted_at = at;
    }
}
