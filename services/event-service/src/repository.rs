use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CreateEventRecord, EventFilter, EventRow, HoldRow, HOLD_ACTIVE, HOLD_CONFIRMED, HOLD_EXPIRED,
    SEAT_AVAILABLE, SEAT_BOOKED, SEAT_HELD,
};

/// The one availability predicate. Seat listing, counting and the hold-time
/// check must all agree on what "available" means, including seats still
/// marked `held` by a hold whose expiry has passed.
const EFFECTIVELY_AVAILABLE: &str =
    "(s.status = 'available' OR (s.status = 'held' AND h.expires_at < NOW()))";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("event not found")]
    EventNotFound,
    #[error("hold not found")]
    HoldNotFound,
    #[error("event already exists")]
    DuplicateEvent,
    #[error("invalid seat count: {0}")]
    InvalidSeatCount(i32),
    #[error("seat numbers do not exist: {0:?}")]
    SeatsUnknown(Vec<String>),
    #[error("seats not available: {0:?}")]
    SeatsUnavailable(Vec<String>),
    #[error("hold is not active")]
    HoldNotActive,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        EventRepository { pool }
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                venue TEXT NOT NULL,
                city TEXT NOT NULL,
                category TEXT NOT NULL,
                event_date TIMESTAMPTZ NOT NULL,
                total_seats INT NOT NULL,
                price_per_seat DOUBLE PRECISION NOT NULL,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            r#"CREATE TABLE IF NOT EXISTS seats (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL REFERENCES events(id),
                seat_number TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'available',
                hold_id TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (event_id, seat_number)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS holds (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                event_id TEXT NOT NULL REFERENCES events(id),
                seat_numbers TEXT[] NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_seats_event_seat_status ON seats (event_id, seat_number, status)",
            "CREATE INDEX IF NOT EXISTS idx_seats_hold_id ON seats (hold_id)",
            "CREATE INDEX IF NOT EXISTS idx_holds_id_expires ON holds (id, expires_at)",
            "CREATE INDEX IF NOT EXISTS idx_holds_expires_at ON holds (expires_at)",
            "CREATE INDEX IF NOT EXISTS idx_holds_user_id ON holds (user_id)",
            "CREATE INDEX IF NOT EXISTS idx_events_event_date ON events (event_date)",
            "CREATE INDEX IF NOT EXISTS idx_events_city ON events (city)",
            "CREATE INDEX IF NOT EXISTS idx_events_category ON events (category)",
        ];

        for stmt in statements {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    // ===== events =====

    /// Inserts the event and materializes all of its seat rows in one
    /// transaction, so a half-created event is never visible.
    pub async fn create_event(
        &self,
        record: CreateEventRecord,
        seat_labels: Vec<String>,
    ) -> Result<EventRow, RepositoryError> {
        if record.total_seats <= 0 {
            return Err(RepositoryError::InvalidSeatCount(record.total_seats));
        }

        let mut tx = self.pool.begin().await?;

        let event: EventRow = sqlx::query_as(
            r#"INSERT INTO events
                (id, name, description, venue, city, category, event_date,
                 total_seats, price_per_seat, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.venue)
        .bind(&record.city)
        .bind(&record.category)
        .bind(record.event_date)
        .bind(record.total_seats)
        .bind(record.price_per_seat)
        .bind(&record.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::DuplicateEvent
            } else {
                RepositoryError::Storage(e)
            }
        })?;

        for chunk in seat_labels.chunks(500) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO seats (id, event_id, seat_number, status) ");
            builder.push_values(chunk, |mut row, label| {
                row.push_bind(Uuid::new_v4().to_string())
                    .push_bind(&event.id)
                    .push_bind(label)
                    .push_bind(SEAT_AVAILABLE);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(event)
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventRow, RepositoryError> {
        sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::EventNotFound)
    }

    pub async fn list_events(
        &self,
        filter: &EventFilter,
    ) -> Result<(Vec<EventRow>, i64), RepositoryError> {
        fn apply_filters(builder: &mut QueryBuilder<Postgres>, filter: &EventFilter) {
            if let Some(city) = &filter.city {
                builder.push(" AND city ILIKE ");
                builder.push_bind(format!("%{}%", city));
            }
            if let Some(category) = &filter.category {
                builder.push(" AND category = ");
                builder.push_bind(category.clone());
            }
            if let Some(name) = &filter.name {
                builder.push(" AND name ILIKE ");
                builder.push_bind(format!("%{}%", name));
            }
            if let Some(from) = filter.date_from {
                builder.push(" AND event_date >= ");
                builder.push_bind(from);
            }
            if let Some(to) = filter.date_to {
                builder.push(" AND event_date <= ");
                builder.push_bind(to);
            }
        }

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM events WHERE 1=1");
        apply_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM events WHERE 1=1");
        apply_filters(&mut builder, filter);
        builder.push(" ORDER BY event_date ASC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);

        let events = builder
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((events, total))
    }

    // ===== seat availability =====

    pub async fn available_seat_numbers(
        &self,
        event_id: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let query = format!(
            "SELECT s.seat_number FROM seats s \
             LEFT JOIN holds h ON s.hold_id = h.id \
             WHERE s.event_id = $1 AND {} \
             ORDER BY s.seat_number",
            EFFECTIVELY_AVAILABLE
        );
        Ok(sqlx::query_scalar(&query)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn available_seat_count(&self, event_id: &str) -> Result<i64, RepositoryError> {
        let query = format!(
            "SELECT COUNT(*) FROM seats s \
             LEFT JOIN holds h ON s.hold_id = h.id \
             WHERE s.event_id = $1 AND {}",
            EFFECTIVELY_AVAILABLE
        );
        Ok(sqlx::query_scalar(&query)
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?)
    }

    // ===== holds =====

    /// Creates a hold over the requested seats. The seat rows are locked up
    /// front so concurrent contenders serialize at the store and the first
    /// committer wins; losers see `SeatsUnavailable`.
    pub async fn create_hold(
        &self,
        user_id: &str,
        event_id: &str,
        seat_numbers: &[String],
        ttl_minutes: i64,
    ) -> Result<HoldRow, RepositoryError> {
        let requested: Vec<String> = seat_numbers.to_vec();
        let mut tx = self.pool.begin().await?;

        let event_exists: Option<String> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;
        if event_exists.is_none() {
            return Err(RepositoryError::EventNotFound);
        }

        let locked: Vec<String> = sqlx::query_scalar(
            "SELECT seat_number FROM seats \
             WHERE event_id = $1 AND seat_number = ANY($2) \
             FOR UPDATE",
        )
        .bind(event_id)
        .bind(&requested)
        .fetch_all(&mut *tx)
        .await?;

        let known: HashSet<&str> = locked.iter().map(String::as_str).collect();
        let missing: Vec<String> = requested
            .iter()
            .filter(|s| !known.contains(s.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::SeatsUnknown(missing));
        }

        let check = format!(
            "SELECT s.seat_number FROM seats s \
             LEFT JOIN holds h ON s.hold_id = h.id \
             WHERE s.event_id = $1 AND s.seat_number = ANY($2) AND NOT {} \
             ORDER BY s.seat_number",
            EFFECTIVELY_AVAILABLE
        );
        let unavailable: Vec<String> = sqlx::query_scalar(&check)
            .bind(event_id)
            .bind(&requested)
            .fetch_all(&mut *tx)
            .await?;
        if !unavailable.is_empty() {
            return Err(RepositoryError::SeatsUnavailable(unavailable));
        }

        let hold_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);
        let hold: HoldRow = sqlx::query_as(
            r#"INSERT INTO holds (id, user_id, event_id, seat_numbers, expires_at, status)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(&hold_id)
        .bind(user_id)
        .bind(event_id)
        .bind(&requested)
        .bind(expires_at)
        .bind(HOLD_ACTIVE)
        .fetch_one(&mut *tx)
        .await?;

        // A seat may be taken over from a logically expired hold here; the
        // stale hold keeps its row but loses the seat reference.
        sqlx::query(
            "UPDATE seats SET status = $1, hold_id = $2, updated_at = NOW() \
             WHERE event_id = $3 AND seat_number = ANY($4)",
        )
        .bind(SEAT_HELD)
        .bind(&hold_id)
        .bind(event_id)
        .bind(&requested)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(hold)
    }

    pub async fn get_hold(&self, hold_id: &str) -> Result<HoldRow, RepositoryError> {
        sqlx::query_as::<_, HoldRow>("SELECT * FROM holds WHERE id = $1")
            .bind(hold_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::HoldNotFound)
    }

    /// Returns seats to `available` and marks the hold `expired`. Releasing a
    /// hold that already left `active` is a no-op success.
    pub async fn release_hold(&self, hold_id: &str) -> Result<HoldRow, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let hold: HoldRow = sqlx::query_as("SELECT * FROM holds WHERE id = $1 FOR UPDATE")
            .bind(hold_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::HoldNotFound)?;

        if hold.status != HOLD_ACTIVE {
            return Ok(hold);
        }

        // only seats still referencing this hold; booked seats stay booked
        sqlx::query(
            "UPDATE seats SET status = $1, hold_id = NULL, updated_at = NOW() \
             WHERE hold_id = $2 AND status = $3",
        )
        .bind(SEAT_AVAILABLE)
        .bind(hold_id)
        .bind(SEAT_HELD)
        .execute(&mut *tx)
        .await?;

        let hold: HoldRow = sqlx::query_as(
            "UPDATE holds SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(HOLD_EXPIRED)
        .bind(hold_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(hold)
    }

    /// Books the held seats. Refuses unless the hold is `active` and not past
    /// its expiry, so released or expired seats can never be confirmed late.
    pub async fn confirm_hold(&self, hold_id: &str) -> Result<HoldRow, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let hold: HoldRow = sqlx::query_as("SELECT * FROM holds WHERE id = $1 FOR UPDATE")
            .bind(hold_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::HoldNotFound)?;

        if !hold.is_usable_at(Utc::now()) {
            return Err(RepositoryError::HoldNotActive);
        }

        sqlx::query(
            "UPDATE seats SET status = $1, updated_at = NOW() \
             WHERE hold_id = $2 AND status = $3",
        )
        .bind(SEAT_BOOKED)
        .bind(hold_id)
        .bind(SEAT_HELD)
        .execute(&mut *tx)
        .await?;

        let hold: HoldRow = sqlx::query_as(
            "UPDATE holds SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(HOLD_CONFIRMED)
        .bind(hold_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(hold)
    }

    pub async fn expired_active_holds(&self) -> Result<Vec<HoldRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, HoldRow>(
            "SELECT * FROM holds WHERE status = $1 AND expires_at < NOW()",
        )
        .bind(HOLD_ACTIVE)
        .fetch_all(&self.pool)
        .await?)
    }
}
