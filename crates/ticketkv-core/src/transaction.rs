//! Transaction records: one ticket purchase by a participant for an event.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field::{FieldDef, FieldKind, FieldValue, Record, UniqueClaim};
use crate::keys::Collection;
use crate::types::{RecordId, Timestamp};

/// Name of the compound uniqueness field (participant + event).
pub const PARTICIPANT_EVENT: &str = "participant_event";

/// Payment status of a transaction.
///
/// ```text
/// Pending ──► Processing ──► Completed
///    │            │
///    └────────────┴──► Cancelled | Refund & Cancelled
/// ```
///
/// `Pending` may also jump straight to `Completed`. The three right-hand
/// states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    #[serde(rename = "Refund & Cancelled")]
    RefundCancelled,
    Cancelled,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::RefundCancelled => "Refund & Cancelled",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Cancelled transactions give up their (participant, event) claim.
    pub const fn is_cancellation(self) -> bool {
        matches!(self, Self::Cancelled | Self::RefundCancelled)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::RefundCancelled)
    }

    /// Whether a stored transaction in `self` may move to `next`.
    /// Staying put is always allowed.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Pending => true,
            Self::Processing => next != Self::Pending,
            Self::Completed | Self::Cancelled | Self::RefundCancelled => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Refund & Cancelled" => Ok(Self::RefundCancelled),
            // Older writers used the single-l spelling.
            "Cancelled" | "Canceled" => Ok(Self::Cancelled),
            other => Err(CoreError::UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

/// A ticket purchase. References are bare ids; see the repository for the
/// read-time join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub id: RecordId,
    pub participant_id: RecordId,
    pub creator_id: RecordId,
    pub event_id: RecordId,
    pub amount: f64,
    pub status: Option<PaymentStatus>,
    pub deleted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Transaction {
    /// The compound uniqueness value, `user_<participant>:event_<event>`.
    /// `None` while either reference is unset.
    pub fn participant_event_key(&self) -> Option<String> {
        if self.participant_id.is_zero() || self.event_id.is_zero() {
            return None;
        }
        Some(format!(
            "{}:{}",
            Collection::User.storage_key(self.participant_id),
            Collection::Event.storage_key(self.event_id)
        ))
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_some_and(PaymentStatus::is_cancellation)
    }
}

static TRANSACTION_FIELDS: [FieldDef<Transaction>; 9] = [
    FieldDef {
        name: "id",
        kind: FieldKind::Int,
        get: |t| FieldValue::id(t.id),
        set: |t, v| {
            t.id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "participant_id",
        kind: FieldKind::Int,
        get: |t| FieldValue::id(t.participant_id),
        set: |t, v| {
            t.participant_id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "creator_id",
        kind: FieldKind::Int,
        get: |t| FieldValue::id(t.creator_id),
        set: |t, v| {
            t.creator_id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "event_id",
        kind: FieldKind::Int,
        get: |t| FieldValue::id(t.event_id),
        set: |t, v| {
            t.event_id = v.as_id()?;
            Ok(())
        },
    },
    FieldDef {
        name: "amount",
        kind: FieldKind::Float,
        get: |t| FieldValue::Float(t.amount),
        set: |t, v| {
            t.amount = v.as_f64()?;
            Ok(())
        },
    },
    FieldDef {
        name: "status",
        kind: FieldKind::Text,
        get: |t| {
            FieldValue::Text(t.status.map(PaymentStatus::as_str).unwrap_or_default().to_string())
        },
        set: |t, v| {
            let raw = v.into_text()?;
            t.status = if raw.is_empty() {
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
        get: |t| FieldValue::Time(t.deleted_at),
        set: |t, v| {
            t.deleted_at = v.as_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "created_at",
        kind: FieldKind::Time,
        get: |t| FieldValue::Time(t.created_at),
        set: |t, v| {
            t.created_at = v.as_time()?;
            Ok(())
        },
    },
    FieldDef {
        name: "updated_at",
        kind: FieldKind::Time,
        get: |t| FieldValue::Time(t.updated_at),
        set: |t, v| {
            t.updated_at = v.as_time()?;
            Ok(())
        },
    },
];

impl Record for Transaction {
    const COLLECTION: Collection = Collection::Transaction;
    const UNIQUE_FIELDS: &'static [&'static str] = &[PARTICIPANT_EVENT];

    fn fields() -> &'static [FieldDef<Self>] {
        &TRANSACTION_FIELDS
    }

    fn unique_claims(&self) -> Vec<UniqueClaim> {
        if self.is_cancelled() {
            return Vec::new();
        }
        self.participant_event_key()
            .map(|key| UniqueClaim::new(PARTICIPANT_EVENT, key))
            .into_iter()
            .collect()
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
