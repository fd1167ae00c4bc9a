//! Proptest generators for property-based testing.
//!
//! Records generated here survive the codec: floats are finite, optional
//! timestamps are never the zero time and ids fit the i64 counter.

use proptest::prelude::*;

use ticketkv_core::{
    Event, EventStatus, EventType, PaymentStatus, RecordId, Role, Timestamp, Transaction, User,
};

/// Generate a record id, including the unassigned zero id.
pub fn record_id() -> impl Strategy<Value = RecordId> {
    (0u64..=1_000_000).prop_map(RecordId::new)
}

/// Generate a timestamp, including the zero time.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    (0i64..=i64::MAX / 2).prop_map(Timestamp::from_nanos)
}

/// Generate an optional timestamp. `Some` is never the zero time.
pub fn optional_timestamp() -> impl Strategy<Value = Option<Timestamp>> {
    proptest::option::of((1i64..=i64::MAX / 2).prop_map(Timestamp::from_nanos))
}

/// Generate short printable text, possibly empty.
pub fn text() -> impl Strategy<Value = String> {
    "[ -~]{0,24}".prop_map(String::from)
}

/// Generate a non-negative, finite amount.
pub fn amount() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.0f64..1_000_000.0]
}

pub fn role() -> impl Strategy<Value = Option<Role>> {
    proptest::option::of(prop_oneof![
        Just(Role::Admin),
        Just(Role::Creator),
        Just(Role::Participant),
    ])
}

pub fn event_type() -> impl Strategy<Value = Option<EventType>> {
    proptest::option::of(prop_oneof![Just(EventType::Online), Just(EventType::Offline)])
}

pub fn event_status() -> impl Strategy<Value = Option<EventStatus>> {
    proptest::option::of(prop_oneof![
        Just(EventStatus::Draft),
        Just(EventStatus::Scheduled),
        Just(EventStatus::Canceled),
        Just(EventStatus::InProgress),
        Just(EventStatus::Stopped),
        Just(EventStatus::Completed),
        Just(EventStatus::CompletedAndVerified),
        Just(EventStatus::Closed),
    ])
}

pub fn payment_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Processing),
        Just(PaymentStatus::Completed),
        Just(PaymentStatus::RefundCancelled),
        Just(PaymentStatus::Cancelled),
    ]
}

/// Generate a user with arbitrary (not necessarily valid) field values.
pub fn user() -> impl Strategy<Value = User> {
    (
        record_id(),
        text(),
        text(),
        text(),
        text(),
        role(),
        (timestamp(), timestamp(), timestamp()),
    )
        .prop_map(
            |(id, username, fullname, email, password, role, (deleted_at, created_at, updated_at))| {
                User {
                    id,
                    username,
                    fullname,
                    email,
                    password,
                    role,
                    deleted_at,
                    created_at,
                    updated_at,
                }
            },
        )
}

/// Generate an event with arbitrary (not necessarily valid) field values.
pub fn event() -> impl Strategy<Value = Event> {
    (
        (record_id(), record_id(), text(), text(), text(), text()),
        (event_type(), event_status(), amount(), any::<i64>()),
        (
            optional_timestamp(),
            optional_timestamp(),
            optional_timestamp(),
            optional_timestamp(),
        ),
        (timestamp(), timestamp(), timestamp()),
    )
        .prop_map(
            |(
                (id, creator_id, title, link, description, banner),
                (event_type, status, price, quantity),
                (event_start, event_end, campaign_start, campaign_end),
                (deleted_at, created_at, updated_at),
            )| Event {
                id,
                creator_id,
                title,
                link,
                description,
                event_type,
                banner,
                price,
                quantity,
                status,
                event_start,
                event_end,
                campaign_start,
                campaign_end,
                deleted_at,
                created_at,
                updated_at,
            },
        )
}

/// Generate a transaction with arbitrary (not necessarily valid) field values.
pub fn transaction() -> impl Strategy<Value = Transaction> {
    (
        (record_id(), record_id(), record_id(), record_id()),
        amount(),
        proptest::option::of(payment_status()),
        (timestamp(), timestamp(), timestamp()),
    )
        .prop_map(
            |((id, participant_id, creator_id, event_id), amount, status, (deleted_at, created_at, updated_at))| {
                Transaction {
                    id,
                    participant_id,
                    creator_id,
                    event_id,
                    amount,
                    status,
                    deleted_at,
                    created_at,
                    updated_at,
                }
            },
        )
}

/// Generate a title whose slug is not empty.
pub fn event_title() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 &!-]{0,30}".prop_map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_transactions_have_no_claim_when_cancelled(trx in transaction()) {
            use ticketkv_core::Record;
            if trx.is_cancelled() {
                prop_assert!(trx.unique_claims().is_empty());
            }
        }

        #[test]
        fn titles_have_slugs(title in event_title()) {
            prop_assert!(!ticketkv_core::slugify(&title).is_empty());
        }
    }
}
