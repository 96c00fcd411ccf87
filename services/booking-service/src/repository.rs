use sqlx::PgPool;
use thiserror::Error;

use crate::models::{BookingRow, CreateBookingRecord, StatusTransition, BOOKING_PROCESSING,
    PAYMENT_PENDING};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("booking not found")]
    NotFound,
    #[error("booking already exists for this hold")]
    DuplicateHold,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        BookingRepository { pool }
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                user_email TEXT NOT NULL,
                user_name TEXT NOT NULL,
                event_id TEXT NOT NULL,
                event_name TEXT NOT NULL,
                venue TEXT NOT NULL,
                event_date TIMESTAMPTZ NOT NULL,
                seats TEXT[] NOT NULL,
                total_amount DOUBLE PRECISION NOT NULL,
                status TEXT NOT NULL DEFAULT 'processing',
                payment_status TEXT NOT NULL DEFAULT 'pending',
                hold_id TEXT NOT NULL UNIQUE,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                confirmed_at TIMESTAMPTZ,
                failed_at TIMESTAMPTZ
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_bookings_user_id ON bookings (user_id)",
            "CREATE INDEX IF NOT EXISTS idx_bookings_event_id ON bookings (event_id)",
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

    pub async fn create_booking(
        &self,
        record: CreateBookingRecord,
    ) -> Result<BookingRow, RepositoryError> {
        sqlx::query_as::<_, BookingRow>(
            r#"INSERT INTO bookings
                (id, user_id, user_email, user_name, event_id, event_name, venue,
                 event_date, seats, total_amount, status, payment_status, hold_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.user_email)
        .bind(&record.user_name)
        .bind(&record.event_id)
        .bind(&record.event_name)
        .bind(&record.venue)
        .bind(record.event_date)
        .bind(&record.seats)
        .bind(record.total_amount)
        .bind(BOOKING_PROCESSING)
        .bind(PAYMENT_PENDING)
        .bind(&record.hold_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::DuplicateHold
            } else {
                RepositoryError::Storage(e)
            }
        })
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<BookingRow, RepositoryError> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    pub async fn get_booking_by_hold(
        &self,
        hold_id: &str,
    ) -> Result<Option<BookingRow>, RepositoryError> {
        Ok(
            sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE hold_id = $1")
                .bind(hold_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Applies a status transition. The WHERE clause is the terminal-status
    /// guard: a booking that already reached `confirmed` or `failed` is left
    /// untouched and `false` is returned.
    pub async fn update_booking_status(
        &self,
        transition: &StatusTransition,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE bookings
               SET status = $2,
                   payment_status = $3,
                   error_message = COALESCE($4, error_message),
                   confirmed_at = COALESCE($5, confirmed_at),
                   failed_at = COALESCE($6, failed_at)
               WHERE id = $1 AND status NOT IN ('confirmed', 'failed')"#,
        )
        .bind(&transition.booking_id)
        .bind(&transition.status)
        .bind(&transition.payment_status)
        .bind(&transition.error_message)
        .bind(transition.confirmed_at)
        .bind(transition.failed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_user_bookings(
        &self,
        user_id: &str,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<BookingRow>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings \
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let bookings = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings \
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((bookings, total))
    }
}
