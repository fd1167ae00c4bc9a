//! # ticketkv Testkit
//!
//! Testing utilities for ticketkv.
//!
//! ## Overview
//!
//! - **Fixtures**: an in-memory backend, a fixed clock and ready repositories
//! - **Samples**: valid users, events and transactions to tweak per test
//! - **Generators**: proptest strategies for every record type
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use ticketkv_testkit::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let creator = fixture.creator("creator1").await;
//!     let buyer = fixture.participant("buyer1").await;
//!     let event = fixture.event(&creator, "Go Meetup").await;
//!     let ticket = fixture.purchase(&buyer, &event).await;
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ticketkv_testkit::generators;
//!
//! proptest! {
//!     #[test]
//!     fn users_survive_the_codec(user in generators::user()) {
//!         let map = ticketkv_core::encode(&user).into_iter().collect();
//!         prop_assert_eq!(ticketkv_core::decode::<ticketkv_core::User>("user_1", &map)?, user);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    public_json, random_username, sample_event, sample_transaction, sample_user, TestFixture,
    FIXTURE_EPOCH, SAMPLE_PASSWORD,
};
