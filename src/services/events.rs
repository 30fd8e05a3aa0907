//! Events service
//!
//! Owner, admin and public operations over events. Writes go through the
//! lifecycle rules; public reads record a hit and carry view counts.

use std::sync::Arc;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        event::{
            AdminSearch, EventOrder, EventSort, NewEvent, PageRequest, PublicSearch,
            UpdateEventRequest,
        },
        Event, EventFull, EventShort, EventState, RequestContext,
    },
    repository::{CategoryLookup, EventStore, LocationLookup, UserLookup},
};

use super::{
    filter::{build_predicate, ensure_range, EventFilter, SearchOptions},
    lifecycle::{
        apply_update, ensure_event_date, validate_update, Actor, EventChanges, CREATE_LEAD_HOURS,
    },
    stats::{collection_key, ViewStatsAggregator},
};

#[derive(Clone)]
pub struct EventsService {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserLookup>,
    categories: Arc<dyn CategoryLookup>,
    locations: Arc<dyn LocationLookup>,
    stats: ViewStatsAggregator,
    clock: Arc<dyn Clock>,
}

impl EventsService {
    pub fn new(
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserLookup>,
        categories: Arc<dyn CategoryLookup>,
        locations: Arc<dyn LocationLookup>,
        stats: ViewStatsAggregator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            users,
            categories,
            locations,
            stats,
            clock,
        }
    }

    /// Create a PENDING event owned by `user_id`
    pub async fn create_event(&self, user_id: i64, data: &NewEvent) -> AppResult<EventFull> {
        let now = self.clock.now();
        ensure_event_date(data.event_date, now, CREATE_LEAD_HOURS)?;

        let initiator = self.users.find_by_id(user_id).await?;
        let category = self.categories.find_by_id(data.category).await?;
        let location = self.locations.resolve(&data.location).await?;

        let event = Event::new_pending(data, initiator, category, location, now);
        let stored = self.events.insert(&event).await?;

        tracing::info!(event_id = stored.id, user_id, "Event created");
        Ok(EventFull::from_event(&stored, 0))
    }

    pub async fn list_owner_events(&self, user_id: i64, page: &PageRequest) -> AppResult<Vec<EventShort>> {
        self.ensure_user(user_id).await?;

        let events = self.events.find_by_initiator(user_id, page).await?;
        tracing::debug!(user_id, count = events.len(), "Listed owner events");
        Ok(events.iter().map(|e| EventShort::from_event(e, 0)).collect())
    }

    pub async fn get_owner_event(&self, user_id: i64, event_id: i64) -> AppResult<EventFull> {
        let event = self.owned_event(user_id, event_id).await?;
        Ok(EventFull::from_event(&event, 0))
    }

    /// Partial update by the initiator, optionally cancelling or resubmitting
    pub async fn update_by_owner(
        &self,
        user_id: i64,
        event_id: i64,
        request: UpdateEventRequest,
    ) -> AppResult<EventFull> {
        let event = self.owned_event(user_id, event_id).await?;
        let now = self.clock.now();
        let action = validate_update(
            &event,
            Actor::Owner,
            request.state_action.as_deref(),
            request.event_date,
            now,
        )?;

        let changes = self.resolve_changes(request).await?;
        let updated = apply_update(&event, Actor::Owner, changes, action, now)?;
        let stored = self.events.update(&updated).await?;

        tracing::info!(event_id, user_id, state = %stored.state, "Event updated by owner");
        Ok(EventFull::from_event(&stored, 0))
    }

    /// Admin listing; views are not looked up
    pub async fn admin_list(&self, search: AdminSearch, page: &PageRequest) -> AppResult<Vec<EventFull>> {
        ensure_range(search.range_start, search.range_end)?;

        let filter = EventFilter {
            initiator_in: search.users,
            category_in: search.categories,
            states_in: search.states,
            event_date_after: search.range_start,
            event_date_before: search.range_end,
            ..Default::default()
        };
        let predicate = build_predicate(&filter, &SearchOptions::default(), self.clock.now());

        let events = self
            .events
            .query(predicate.as_ref(), page, EventOrder::Id)
            .await?;
        tracing::debug!(count = events.len(), "Admin event listing");
        Ok(events.iter().map(|e| EventFull::from_event(e, 0)).collect())
    }

    /// Partial update by an administrator, optionally publishing or rejecting
    pub async fn admin_update(&self, event_id: i64, request: UpdateEventRequest) -> AppResult<EventFull> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))?;
        let now = self.clock.now();
        let action = validate_update(
            &event,
            Actor::Admin,
            request.state_action.as_deref(),
            request.event_date,
            now,
        )?;

        let changes = self.resolve_changes(request).await?;
        let updated = apply_update(&event, Actor::Admin, changes, action, now)?;
        let stored = self.events.update(&updated).await?;

        tracing::info!(event_id, state = %stored.state, "Event updated by admin");
        Ok(EventFull::from_event(&stored, 0))
    }

    /// A single PUBLISHED event with its unique views
    pub async fn get_published_event(&self, event_id: i64, ctx: &RequestContext) -> AppResult<EventFull> {
        let event = self
            .events
            .find_by_id_and_state(event_id, EventState::Published)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))?;

        // The hit is sent in the background, so the count below may or may
        // not include this request yet.
        self.stats.record_hit(ctx);
        let views = self.stats.single_views(&ctx.path, &event).await;
        Ok(EventFull::from_event(&event, views))
    }

    /// Search among PUBLISHED events
    pub async fn public_search(
        &self,
        search: PublicSearch,
        page: &PageRequest,
        ctx: &RequestContext,
    ) -> AppResult<Vec<EventShort>> {
        ensure_range(search.range_start, search.range_end)?;

        let filter = EventFilter {
            category_in: search.categories,
            paid_eq: search.paid,
            event_date_after: search.range_start,
            event_date_before: search.range_end,
            ..Default::default()
        };
        let options = SearchOptions {
            text: search.text,
            only_available: search.only_available,
            published_only: true,
        };
        let predicate = build_predicate(&filter, &options, self.clock.now());
        let order = match search.sort {
            Some(EventSort::EventDate) => EventOrder::EventDate,
            _ => EventOrder::Id,
        };

        let events = self.events.query(predicate.as_ref(), page, order).await?;
        self.stats.record_hit(ctx);
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let views = self.stats.collection_views(&ctx.path, &events).await;
        let mut found: Vec<EventShort> = events
            .iter()
            .map(|e| {
                let count = views.get(&collection_key(&ctx.path, e.id)).copied().unwrap_or(0);
                EventShort::from_event(e, count)
            })
            .collect();

        if search.sort == Some(EventSort::Views) {
            found.sort_by_key(|e| e.views);
        }

        tracing::debug!(count = found.len(), sort = ?search.sort, "Public event search");
        Ok(found)
    }

    async fn ensure_user(&self, user_id: i64) -> AppResult<()> {
        if !self.users.exists(user_id).await? {
            return Err(AppError::user_not_found(user_id));
        }
        Ok(())
    }

    async fn owned_event(&self, user_id: i64, event_id: i64) -> AppResult<Event> {
        self.ensure_user(user_id).await?;
        self.events
            .find_by_id_and_initiator(event_id, user_id)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))
    }

    /// Look up the category and location referenced by an update.
    /// Resolving a location may insert it, so this runs only after validation.
    async fn resolve_changes(&self, request: UpdateEventRequest) -> AppResult<EventChanges> {
        let category = match request.category {
            Some(id) => Some(self.categories.find_by_id(id).await?),
            None => None,
        };
        let location = match request.location {
            Some(descriptor) => Some(self.locations.resolve(&descriptor).await?),
            None => None,
        };

        Ok(EventChanges {
            title: request.title,
            annotation: request.annotation,
            description: request.description,
            participant_limit: request.participant_limit,
            paid: request.paid,
            request_moderation: request.request_moderation,
            event_date: request.event_date,
            category,
            location,
        })
    }
}
