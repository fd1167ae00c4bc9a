//! # ticketkv
//!
//! Ticket-sale repositories for users, events and transactions, stored as
//! flat hashes in a key-value backend.
//!
//! ## Overview
//!
//! - **Users**: unique by username and by email; passwords stored hashed
//! - **Events**: unique by title and by link; links derived from the title
//! - **Transactions**: one live ticket per (participant, event) pair
//!
//! Every record lives under `<collection>_<id>`. Ids come from an atomic
//! per-collection counter and uniqueness is enforced with set-if-absent
//! claims, so concurrent writers never both win the same value.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ticketkv::{Event, Ticketing, TicketingConfig, User};
//!
//! async fn example() -> ticketkv::Result<()> {
//!     let ticketing = Ticketing::open(TicketingConfig::from_env()?).await?;
//!
//!     let event = ticketing
//!         .events()
//!         .create(Event {
//!             title: "Go Meetup".into(),
//!             ..Event::default()
//!         })
//!         .await?;
//!     assert_eq!(event.link, "https://get.event.id/event/go-meetup");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ticketkv::core` - Records, codec and validation
//! - `ticketkv::store` - Backends, allocator, uniqueness index, record store

pub mod clock;
pub mod config;
pub mod error;
pub mod hasher;
pub mod repository;
pub mod ticketing;

pub use ticketkv_core as core;
pub use ticketkv_store as store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BackendConfig, TicketingConfig, DEFAULT_LINK_BASE_URL};
pub use error::{Result, TicketingError};
pub use hasher::{Argon2Hasher, PasswordHasher};
pub use repository::{
    EventRepository, EventWithCreator, TransactionDetails, TransactionRepository, UserRepository,
};
pub use ticketing::Ticketing;

pub use ticketkv_core::{
    Event, EventStatus, EventType, PaymentStatus, RecordId, Role, Timestamp, Transaction, User,
};
pub use ticketkv_store::{KvBackend, MemoryBackend, RedisBackend, SqliteBackend};
