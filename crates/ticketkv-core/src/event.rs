//! Event records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field::{FieldDef, FieldKind, FieldValue, Record, UniqueClaim};
use crate::keys::Collection;
use crate::types::{RecordId, Timestamp};

/// Where an event takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Online,
    Offline,
}

impl EventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Online" => Ok(Self::Online),
            "Offline" => Ok(Self::Offline),
            other => Err(CoreError::UnknownVariant {
                kind: "event type",
                value: other.to_string(),
            }),
        }
    }
}

/// Publication status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Draft,
    Scheduled,
    Canceled,
    #[serde(rename = "In Progress")]
    InProgress,
    Stopped,
    Completed,
    #[serde(rename = "Completed and Verified")]
    CompletedAndVerified,
    Closed,
}

impl EventStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Scheduled => "Scheduled",
            Self::Canceled => "Canceled",
            Self::InProgress => "In Progress",
            Self::Stopped => "Stopped",
            Self::Completed => "Completed",
            Self::CompletedAndVerified => "Completed and Verified",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Scheduled" => Ok(Self::Scheduled),
            "Canceled" => Ok(Self::Canceled),
            "In Progress" => Ok(Self::InProgress),
            "Stopped" => Ok(Self::Stopped),
            "Completed" => Ok(Self::Completed),
            "Completed and Verified" => Ok(Self::CompletedAndVerified),
            "Closed" => Ok(Self::Closed),
            other => Err(CoreError::UnknownVariant {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

/// A ticketed event. `creator_id` references a [`crate::User`] by id only;
/// the creator is resolved at read time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub id: RecordId,
    pub creator_id: RecordId,
    pub title: String,
    pub link: String,
    pub description: String,
    pub event_type: Option<EventType>,
    pub banner: String,
    pub price: f64,
    pub quantity: i64,
    pub status: Option<EventStatus>,
    pub event_start: Option<Timestamp>,
    pub event_end: Option<Timestamp>,
    pub campaign_start: Option<Timestamp>,
    pub campaign_end: Option<Timestamp>,
    pub deleted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn parse_optional<T: FromStr<Err = CoreError>>(v: FieldValue) -> Result<Option<T>, String> {
    let raw = v.into_text()?;
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|e: CoreError| e.to_string())
}

static EVENT_FIELDS: [FieldDef<Event>; 17] = [
    FieldDef {
        name: "id",
        kind: FieldKind::Int,
        get: |e| FieldValue::id(e.id),
        set: |e, v| {
            e.id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "creator_id",
        kind: FieldKind::Int,
        get: |e| FieldValue::id(e.creator_id),
        set: |e, v| {
            e.creator_id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "title",
        kind: FieldKind::Text,
        get: |e| FieldValue::Text(e.title.clone()),
        set: |e, v| {
            e.title = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "link",
        kind: FieldKind::Text,
        get: |e| FieldValue::Text(e.link.clone()),
        set: |e, v| {
            e.link = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "description",
        kind: FieldKind::Text,
        get: |e| FieldValue::Text(e.description.clone()),
        set: |e, v| {
            e.description = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "event_type",
        kind: FieldKind::Text,
        get: |e| {
            FieldValue::Text(e.event_type.map(EventType::as_str).unwrap_or_default().to_string())
        },
        set: |e, v| {
            e.event_type = parse_optional(v)?;
            Ok(())
        },
    },
    FieldDef {
        name: "banner",
        kind: FieldKind::Text,
        get: |e| FieldValue::Text(e.banner.clone()),
        set: |e, v| {
            e.banner = v.into_text()?;
            Ok(())
        },
    },
    FieldDef {
        name: "price",
        kind: FieldKind::Float,
        get: |e| FieldValue::Float(e.price),
        set: |e, v| {
            e.price = v.as_f64()?;
            Ok(())
        },
    },
    FieldDef {
        name: "quantity",
        kind: FieldKind::Int,
        get: |e| FieldValue::Int(e.quantity),
        set: |e, v| {
            e.quantity = v.as_i64()?;
            Ok(())
        },
    },
    FieldDef {
        name: "status",
        kind: FieldKind::Text,
        get: |e| FieldValue::Text(e.status.map(EventStatus::as_str).unwrap_or_default().to_string()),
        set: |e, v| {
            e.status = parse_optional(v)?;
            Ok(())
        },
    },
    FieldDef {
        name: "event_start",
        kind: FieldKind::Time,
        get: |e| FieldValue::optional_time(e.event_start),
        set: |e, v| {
            e.event_start = v.as_optional_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "event_end",
        kind: FieldKind::Time,
        get: |e| FieldValue::optional_time(e.event_end),
        set: |e, v| {
            e.event_end = v.as_optional_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "campaign_start",
        kind: FieldKind::Time,
        get: |e| FieldValue::optional_time(e.campaign_start),
        set: |e, v| {
            e.campaign_start = v.as_optional_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "campaign_end",
        kind: FieldKind::Time,
        get: |e| FieldValue::optional_time(e.campaign_end),
        set: |e, v| {
            e.campaign_end = v.as_optional_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "deleted_at",
        kind: FieldKind::Time,
        get: |e| FieldValue::Time(e.deleted_at),
        set: |e, v| {
            e.deleted_at = v.as_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "created_at",
        kind: FieldKind::Time,
        get: |e| FieldValue::Time(e.created_at),
        set: |e, v| {
            e.created_at = v.as_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "updated_at",
        kind: FieldKind::Time,
        get: |e| FieldValue::Time(e.updated_at),
        set: |e, v| {
            e.updated_at = v.as_time()?;
            Ok(())
        },
    },
];

impl Record for Event {
    const COLLECTION: Collection = Collection::Event;
    const UNIQUE_FIELDS: &'static [&'static str] = &["title", "link"];

    fn fields() -> &'static [FieldDef<Self>] {
        &EVENT_FIELDS
    }

    fn unique_claims(&self) -> Vec<UniqueClaim> {
        let mut claims = Vec::with_capacity(2);
        if !self.title.is_empty() {
            claims.push(UniqueClaim::new("title", self.title.clone()));
        }
        if !self.link.is_empty() {
            claims.push(UniqueClaim::new("link", self.link.clone()));
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
