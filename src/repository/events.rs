//! Events repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        event::{EventOrder, PageRequest},
        Category, Event, EventState, Location, UserShort,
    },
    services::filter::{Criterion, EventPredicate},
};

use super::EventStore;

const SELECT_EVENTS: &str = r#"
    SELECT e.id, e.title, e.annotation, e.description, e.paid,
           e.participant_limit, e.request_moderation, e.event_date,
           e.created_on, e.published_on, e.confirmed_requests, e.state, e.version,
           c.id AS category_id, c.name AS category_name,
           u.id AS initiator_id, u.name AS initiator_name,
           l.id AS location_id, l.lat, l.lon
    FROM events e
    JOIN categories c ON c.id = e.category_id
    JOIN users u ON u.id = e.initiator_id
    JOIN locations l ON l.id = e.location_id
"#;

/// Flat row of an event joined with its category, initiator and location
#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    title: String,
    annotation: String,
    description: String,
    paid: bool,
    participant_limit: i32,
    request_moderation: bool,
    event_date: DateTime<Utc>,
    created_on: DateTime<Utc>,
    published_on: Option<DateTime<Utc>>,
    confirmed_requests: i32,
    state: String,
    version: i32,
    category_id: i64,
    category_name: String,
    initiator_id: i64,
    initiator_name: String,
    location_id: i64,
    lat: f64,
    lon: f64,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .parse::<EventState>()
            .map_err(|_| AppError::Internal(format!("Event {} has unknown state '{}'", row.id, row.state)))?;

        Ok(Event {
            id: row.id,
            title: row.title,
            annotation: row.annotation,
            description: row.description,
            paid: row.paid,
            participant_limit: row.participant_limit,
            request_moderation: row.request_moderation,
            event_date: row.event_date,
            created_on: row.created_on,
            published_on: row.published_on,
            category: Category {
                id: row.category_id,
                name: row.category_name,
            },
            initiator: UserShort {
                id: row.initiator_id,
                name: row.initiator_name,
            },
            location: Location {
                id: row.location_id,
                lat: row.lat,
                lon: row.lon,
            },
            confirmed_requests: row.confirmed_requests,
            state,
            version: row.version,
        })
    }
}

fn into_events(rows: Vec<EventRow>) -> AppResult<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}

/// Escape LIKE wildcards so the needle is matched literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Render one criterion as a SQL condition over the `e` alias
fn push_criterion(builder: &mut QueryBuilder<'_, Postgres>, criterion: &Criterion) {
    match criterion {
        Criterion::InitiatorIn(ids) => {
            builder.push("e.initiator_id = ANY(").push_bind(ids.clone()).push(")");
        }
        Criterion::CategoryIn(ids) => {
            builder.push("e.category_id = ANY(").push_bind(ids.clone()).push(")");
        }
        Criterion::StateIn(states) => {
            let names: Vec<String> = states.iter().map(|s| s.as_str().to_string()).collect();
            builder.push("e.state = ANY(").push_bind(names).push(")");
        }
        Criterion::StateEq(state) => {
            builder.push("e.state = ").push_bind(state.as_str());
        }
        Criterion::PaidEq(paid) => {
            builder.push("e.paid = ").push_bind(*paid);
        }
        Criterion::EventDateFrom(start) => {
            builder.push("e.event_date >= ").push_bind(*start);
        }
        Criterion::EventDateUntil(end) => {
            builder.push("e.event_date <= ").push_bind(*end);
        }
        Criterion::TextContains(needle) => {
            let pattern = format!("%{}%", escape_like(needle));
            builder
                .push("(e.annotation ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR e.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        Criterion::Available => {
            builder.push("(e.participant_limit = 0 OR e.confirmed_requests < e.participant_limit)");
        }
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, predicate: Option<&EventPredicate>) {
    let Some(predicate) = predicate else {
        return;
    };
    builder.push(" WHERE ");
    for (i, criterion) in predicate.criteria().iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        push_criterion(builder, criterion);
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: &PageRequest) {
    builder
        .push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
}

#[derive(Clone)]
pub struct EventsRepository {
    pool: Pool<Postgres>,
}

impl EventsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_one(
        &self,
        id: i64,
        initiator_id: Option<i64>,
        state: Option<EventState>,
    ) -> AppResult<Option<Event>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_EVENTS);
        builder.push(" WHERE e.id = ").push_bind(id);
        if let Some(initiator_id) = initiator_id {
            builder.push(" AND e.initiator_id = ").push_bind(initiator_id);
        }
        if let Some(state) = state {
            builder.push(" AND e.state = ").push_bind(state.as_str());
        }

        let row = builder
            .build_query_as::<EventRow>()
            .fetch_optional(&self.pool)
            .await?;
        row.map(Event::try_from).transpose()
    }
}

#[async_trait]
impl EventStore for EventsRepository {
    async fn insert(&self, event: &Event) -> AppResult<Event> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO events (
                title, annotation, description, paid, event_date,
                category_id, initiator_id, location_id,
                participant_limit, confirmed_requests, request_moderation,
                created_on, published_on, state, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 0)
            RETURNING id
            "#,
        )
        .bind(&event.title)
        .bind(&event.annotation)
        .bind(&event.description)
        .bind(event.paid)
        .bind(event.event_date)
        .bind(event.category.id)
        .bind(event.initiator.id)
        .bind(event.location.id)
        .bind(event.participant_limit)
        .bind(event.confirmed_requests)
        .bind(event.request_moderation)
        .bind(event.created_on)
        .bind(event.published_on)
        .bind(event.state.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Event {
            id,
            version: 0,
            ..event.clone()
        })
    }

    async fn update(&self, event: &Event) -> AppResult<Event> {
        let result = sqlx::query(
            r#"
            UPDATE events SET
                title = $3, annotation = $4, description = $5, paid = $6,
                event_date = $7, category_id = $8, location_id = $9,
                participant_limit = $10, request_moderation = $11,
                published_on = $12, state = $13, version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(event.id)
        .bind(event.version)
        .bind(&event.title)
        .bind(&event.annotation)
        .bind(&event.description)
        .bind(event.paid)
        .bind(event.event_date)
        .bind(event.category.id)
        .bind(event.location.id)
        .bind(event.participant_limit)
        .bind(event.request_moderation)
        .bind(event.published_on)
        .bind(event.state.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                ErrorCode::ConcurrentModification,
                format!("Event with id={} was modified concurrently", event.id),
            ));
        }

        Ok(Event {
            version: event.version + 1,
            ..event.clone()
        })
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Event>> {
        self.fetch_one(id, None, None).await
    }

    async fn find_by_id_and_initiator(&self, id: i64, initiator_id: i64) -> AppResult<Option<Event>> {
        self.fetch_one(id, Some(initiator_id), None).await
    }

    async fn find_by_id_and_state(&self, id: i64, state: EventState) -> AppResult<Option<Event>> {
        self.fetch_one(id, None, Some(state)).await
    }

    async fn find_by_initiator(&self, initiator_id: i64, page: &PageRequest) -> AppResult<Vec<Event>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_EVENTS);
        builder
            .push(" WHERE e.initiator_id = ")
            .push_bind(initiator_id)
            .push(" ORDER BY e.id");
        push_page(&mut builder, page);

        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    async fn query(
        &self,
        predicate: Option<&EventPredicate>,
        page: &PageRequest,
        order: EventOrder,
    ) -> AppResult<Vec<Event>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_EVENTS);
        push_where(&mut builder, predicate);
        builder.push(match order {
            EventOrder::Id => " ORDER BY e.id",
            EventOrder::EventDate => " ORDER BY e.event_date, e.id",
        });
        push_page(&mut builder, page);

        tracing::debug!(sql = builder.sql(), "Querying events");

        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_now\\"), "50\\% off\\_now\\\\");
        assert_eq!(escape_like("jazz"), "jazz");
    }

    #[test]
    fn test_where_clause_joins_criteria_with_and() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let predicate = EventPredicate::all_of(vec![
            Criterion::StateEq(EventState::Published),
            Criterion::EventDateFrom(start),
            Criterion::TextContains("jazz".to_string()),
            Criterion::Available,
        ])
        .unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM events e");
        push_where(&mut builder, Some(&predicate));
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM events e WHERE e.state = $1 AND e.event_date >= $2 AND \
             (e.annotation ILIKE $3 OR e.description ILIKE $4) AND \
             (e.participant_limit = 0 OR e.confirmed_requests < e.participant_limit)"
        );
    }

    #[test]
    fn test_no_predicate_means_no_where() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM events e");
        push_where(&mut builder, None);
        push_page(&mut builder, &PageRequest::new(Some(20), Some(10)).unwrap());
        assert_eq!(builder.sql(), "SELECT 1 FROM events e LIMIT $1 OFFSET $2");
    }
}
