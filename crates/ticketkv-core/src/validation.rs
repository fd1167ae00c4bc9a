//! Business validation for records, plus link derivation for events.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::event::Event;
use crate::transaction::{PaymentStatus, Transaction};
use crate::user::User;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .unwrap_or_else(|_| unreachable!("email pattern is a valid regex"))
    })
}

fn slug_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| {
        Regex::new(r"[^\p{Alphabetic}\p{Nd}]+")
            .unwrap_or_else(|_| unreachable!("separator pattern is valid"))
    })
}

fn absolute_uri() -> &'static Regex {
    static URI: OnceLock<Regex> = OnceLock::new();
    URI.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+[^\s]*$")
            .unwrap_or_else(|_| unreachable!("uri pattern is valid"))
    })
}

/// Check an email address: 3 to 254 characters and a plausible
/// `local@domain` shape.
pub fn is_valid_email(email: &str) -> bool {
    (3..=254).contains(&email.len()) && email_regex().is_match(email)
}

/// Accepts an absolute URI (`scheme://host...`) or an absolute path.
pub fn is_valid_link(link: &str) -> bool {
    if let Some(path) = link.strip_prefix('/') {
        return !path.starts_with('/') && !link.chars().any(char::is_whitespace);
    }
    absolute_uri().is_match(link)
}

/// Lower-case the title and collapse every run of characters that are not
/// letters or decimal digits into a single `-`, trimming separators at both
/// ends. Letters outside ASCII are kept.
pub fn slugify(title: &str) -> String {
    slug_separator()
        .replace_all(title, "-")
        .trim_matches('-')
        .to_lowercase()
}

/// Build the default webinar link for a title.
pub fn derive_link(base_url: &str, title: &str) -> String {
    format!("{}{}", base_url, slugify(title))
}

/// Validate a user.
///
/// `password` is checked for length, so call this before the password is
/// replaced by its hash.
pub fn validate_user(user: &User) -> Result<(), ValidationError> {
    if user.username.chars().count() <= 4 {
        return Err(ValidationError::Username);
    }
    if !is_valid_email(&user.email) {
        return Err(ValidationError::Email);
    }
    if user.fullname.chars().count() < 3 {
        return Err(ValidationError::Fullname);
    }
    if user.password.chars().count() < 6 {
        return Err(ValidationError::Password);
    }
    if user.role.is_none() {
        return Err(ValidationError::Role);
    }
    Ok(())
}

/// Validate an event. The link must already be derived.
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    if event.title.trim().is_empty() {
        return Err(ValidationError::Title);
    }
    if !is_valid_link(&event.link) {
        return Err(ValidationError::Link(event.link.clone()));
    }
    if !event.price.is_finite() || event.price < 0.0 {
        return Err(ValidationError::Amount("price"));
    }
    if event.quantity < 0 {
        return Err(ValidationError::Amount("quantity"));
    }
    if !event.creator_id.in_range() {
        return Err(ValidationError::ReferenceOutOfRange("creator"));
    }
    if event.status.is_none() {
        return Err(ValidationError::MissingField("status"));
    }
    if event.event_type.is_none() {
        return Err(ValidationError::MissingField("event_type"));
    }
    Ok(())
}

/// Validate a transaction. Both references must be set.
pub fn validate_transaction(trx: &Transaction) -> Result<(), ValidationError> {
    if trx.participant_id.is_zero() {
        return Err(ValidationError::MissingReference("participant"));
    }
    if trx.event_id.is_zero() {
        return Err(ValidationError::MissingReference("event"));
    }
    for (name, id) in [
        ("participant", trx.participant_id),
        ("event", trx.event_id),
        ("creator", trx.creator_id),
    ] {
        if !id.in_range() {
            return Err(ValidationError::ReferenceOutOfRange(name));
        }
    }
    if !trx.amount.is_finite() || trx.amount < 0.0 {
        return Err(ValidationError::Amount("amount"));
    }
    if trx.status.is_none() {
        return Err(ValidationError::MissingField("status"));
    }
    Ok(())
}

/// Reject a status change the payment state machine does not allow.
pub fn validate_status_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), ValidationError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ValidationError::StatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
