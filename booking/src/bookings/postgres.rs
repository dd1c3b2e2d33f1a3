//! `PostgreSQL` booking store.

use super::{BookingStore, BookingStoreError, StoredBooking};
use crate::ticket::{BookingStatus, Pnr, Ticket};
use crate::types::UserId;
use futures::future::BoxFuture;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;

/// Bookings table in `PostgreSQL`
///
/// ```sql
/// bookings(id UUID, user_id TEXT, pnr TEXT UNIQUE, status TEXT,
///          ticket_details JSONB, created_at TIMESTAMPTZ)
/// ```
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

fn database(error: &sqlx::Error) -> BookingStoreError {
    BookingStoreError::Database(error.to_string())
}

impl PostgresBookingStore {
    /// Connect a pool
    ///
    /// # Errors
    ///
    /// Returns [`BookingStoreError::Unavailable`] if no connection can be made.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, BookingStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| BookingStoreError::Unavailable(e.to_string()))?;

        tracing::info!(max_connections, "Connected to booking database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the bookings table and its index if missing
    ///
    /// # Errors
    ///
    /// Returns [`BookingStoreError::Database`] if a statement fails.
    pub async fn migrate(&self) -> Result<(), BookingStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS bookings (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL,
                pnr TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                ticket_details JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| database(&e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id, created_at DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| database(&e))?;

        tracing::debug!("Bookings table ready");
        Ok(())
    }

    fn row_to_booking(row: &PgRow) -> Result<StoredBooking, BookingStoreError> {
        let decode = |e: sqlx::Error| BookingStoreError::Serialization(e.to_string());

        let user_id: String = row.try_get("user_id").map_err(decode)?;
        let pnr: String = row.try_get("pnr").map_err(decode)?;
        let status: String = row.try_get("status").map_err(decode)?;
        let Json(ticket): Json<Ticket> = row.try_get("ticket_details").map_err(decode)?;

        Ok(StoredBooking {
            user_id: UserId::new(user_id),
            pnr: Pnr::parse(&pnr).map_err(|e| BookingStoreError::Serialization(e.to_string()))?,
            status: status
                .parse()
                .map_err(|e: crate::ticket::TicketError| BookingStoreError::Serialization(e.to_string()))?,
            ticket,
            created_at: row.try_get("created_at").map_err(decode)?,
        })
    }
}

impl BookingStore for PostgresBookingStore {
    fn insert(&self, user_id: &UserId, ticket: &Ticket) -> BoxFuture<'static, Result<(), BookingStoreError>> {
        let pool = self.pool.clone();
        let user_id = user_id.clone();
        let ticket = ticket.clone();

        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO bookings (id, user_id, pnr, status, ticket_details, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(uuid::Uuid::new_v4())
            .bind(user_id.as_str())
            .bind(ticket.pnr.as_str())
            .bind(ticket.status.as_str())
            .bind(Json(&ticket))
            .bind(ticket.booked_at)
            .execute(&pool)
            .await
            .map_err(|e| database(&e))?;

            tracing::debug!(pnr = %ticket.pnr, "Booking inserted");
            Ok(())
        })
    }

    fn update_status(
        &self,
        pnr: &Pnr,
        status: BookingStatus,
    ) -> BoxFuture<'static, Result<(), BookingStoreError>> {
        let pool = self.pool.clone();
        let pnr = pnr.clone();

        Box::pin(async move {
            let result = sqlx::query("UPDATE bookings SET status = $1 WHERE pnr = $2")
                .bind(status.as_str())
                .bind(pnr.as_str())
                .execute(&pool)
                .await
                .map_err(|e| database(&e))?;

            if result.rows_affected() == 0 {
                return Err(BookingStoreError::NotFound(pnr));
            }
            tracing::debug!(%pnr, %status, "Booking status updated");
            Ok(())
        })
    }

    fn list_for_user(&self, user_id: &UserId) -> BoxFuture<'static, Result<Vec<StoredBooking>, BookingStoreError>> {
        let pool = self.pool.clone();
        let user_id = user_id.clone();

        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT user_id, pnr, status, ticket_details, created_at
                FROM bookings
                WHERE user_id = $1
                ORDER BY created_at DESC
                ",
            )
            .bind(user_id.as_str())
            .fetch_all(&pool)
            .await
            .map_err(|e| database(&e))?;

            rows.iter().map(Self::row_to_booking).collect()
        })
    }
}
