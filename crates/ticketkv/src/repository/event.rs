//! Event repository.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use ticketkv_core::{derive_link, validate_event, Event, EventStatus, EventType, RecordId, User};
use ticketkv_store::KvBackend;

use super::{find_record, Store};
use crate::clock::Clock;
use crate::config::DEFAULT_LINK_BASE_URL;
use crate::error::Result;

/// An event joined with its creator at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWithCreator {
    #[serde(flatten)]
    pub event: Event,
    /// `None` when the creator is missing or deleted.
    pub creator: Option<User>,
}

/// Events, unique by title and by link.
#[derive(Clone)]
pub struct EventRepository {
    store: Store<Event>,
    users: Store<User>,
    clock: Arc<dyn Clock>,
    link_base_url: String,
}

impl EventRepository {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Store::new(backend.clone()),
            users: Store::new(backend),
            clock,
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.store = self.store.with_timeout(timeout);
        self.users = self.users.with_timeout(timeout);
        self
    }

    /// Prefix used when deriving a link from the title.
    pub fn with_link_base_url(mut self, base: impl Into<String>) -> Self {
        self.link_base_url = base.into();
        self
    }

    /// Create an event.
    ///
    /// New events always start as an online draft. Without a link, one is
    /// derived from the title.
    pub async fn create(&self, mut event: Event) -> Result<Event> {
        if event.link.is_empty() {
            event.link = derive_link(&self.link_base_url, &event.title);
        }
        event.status = Some(EventStatus::Draft);
        event.event_type = Some(EventType::Online);
        validate_event(&event)?;

        let created = self.store.create(event, self.clock.now()).await?;
        tracing::debug!(id = %created.id, link = %created.link, "created event");
        Ok(created)
    }

    /// Merge `partial` over the stored event and re-validate. Title and link
    /// ownership move only when they changed.
    pub async fn update(&self, partial: Event) -> Result<Event> {
        let previous = self.store.load_previous(partial.id).await?;
        let merged = self.store.merge(partial, &previous, self.clock.now())?;
        validate_event(&merged)?;
        Ok(self.store.commit_update(merged, &previous).await?)
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Event>> {
        Ok(self.store.get(id).await?)
    }

    /// Find by `event_<id>`, title or link.
    pub async fn find(&self, key_or_value: &str) -> Result<Option<Event>> {
        find_record(&self.store, key_or_value).await
    }

    pub async fn find_with_creator(&self, key_or_value: &str) -> Result<Option<EventWithCreator>> {
        let Some(event) = self.find(key_or_value).await? else {
            return Ok(None);
        };
        Ok(Some(self.join_creator(event).await?))
    }

    pub async fn list(&self) -> Result<Vec<Event>> {
        Ok(self.store.list().await?)
    }

    pub async fn list_with_creators(&self) -> Result<Vec<EventWithCreator>> {
        let events = self.store.list().await?;
        let mut joined = Vec::with_capacity(events.len());
        for event in events {
            joined.push(self.join_creator(event).await?);
        }
        Ok(joined)
    }

    /// Soft-delete; the title and link become available again.
    pub async fn delete(&self, id: RecordId) -> Result<Event> {
        Ok(self.store.soft_delete(id, self.clock.now()).await?)
    }

    async fn join_creator(&self, event: Event) -> Result<EventWithCreator> {
        let creator = self.users.get(event.creator_id).await?;
        Ok(EventWithCreator { event, creator })
    }
}
