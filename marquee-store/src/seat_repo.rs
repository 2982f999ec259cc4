use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use marquee_core::{BoxError, CommitError, Seat, SeatRepository};

const SEAT_COLUMNS: &str = "id, show_id, number, is_booked, booked_by, locked_by, locked_until";

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    show_id: Uuid,
    number: String,
    is_booked: bool,
    booked_by: Option<String>,
    locked_by: Option<String>,
    locked_until: Option<DateTime<Utc>>,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            id: row.id,
            show_id: row.show_id,
            number: row.number,
            is_booked: row.is_booked,
            booked_by: row.booked_by,
            locked_by: row.locked_by,
            locked_until: row.locked_until,
        }
    }
}

/// Postgres seat repository. Row locks inside `book_seats` serialize
/// overlapping commits; everything else is a single statement.
pub struct PgSeatRepository {
    pool: Pool<Postgres>,
}

impl PgSeatRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Catalog setup helper; seat creation itself is outside the reservation
    /// engine's surface.
    pub async fn insert(&self, seat: &Seat) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO seats (id, show_id, number, is_booked, booked_by, locked_by, locked_until) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(seat.id)
        .bind(seat.show_id)
        .bind(&seat.number)
        .bind(seat.is_booked)
        .bind(&seat.booked_by)
        .bind(&seat.locked_by)
        .bind(seat.locked_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SeatRepository for PgSeatRepository {
    async fn find_by_id(&self, seat_id: Uuid) -> Result<Option<Seat>, BoxError> {
        let row: Option<SeatRow> =
            sqlx::query_as(&format!("SELECT {} FROM seats WHERE id = $1", SEAT_COLUMNS))
                .bind(seat_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Seat::from))
    }

    async fn find_by_ids(&self, seat_ids: &[Uuid]) -> Result<Vec<Seat>, BoxError> {
        let rows: Vec<SeatRow> =
            sqlx::query_as(&format!("SELECT {} FROM seats WHERE id = ANY($1)", SEAT_COLUMNS))
                .bind(seat_ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn find_by_ids_in_show(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
    ) -> Result<Vec<Seat>, BoxError> {
        let rows: Vec<SeatRow> = sqlx::query_as(&format!(
            "SELECT {} FROM seats WHERE id = ANY($1) AND show_id = $2",
            SEAT_COLUMNS
        ))
        .bind(seat_ids)
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn find_by_show(&self, show_id: Uuid) -> Result<Vec<Seat>, BoxError> {
        let rows: Vec<SeatRow> = sqlx::query_as(&format!(
            "SELECT {} FROM seats WHERE show_id = $1 ORDER BY number",
            SEAT_COLUMNS
        ))
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn set_locked(
        &self,
        seat_id: Uuid,
        owner: &str,
        until: DateTime<Utc>,
    ) -> Result<(), BoxError> {
        sqlx::query("UPDATE seats SET locked_by = $2, locked_until = $3 WHERE id = $1")
            .bind(seat_id)
            .bind(owner)
            .bind(until)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_locked(&self, seat_id: Uuid, owner: &str) -> Result<bool, BoxError> {
        // Owner match in the predicate: a stale clear cannot wipe a newer
        // holder's fields.
        let result = sqlx::query(
            "UPDATE seats SET locked_by = NULL, locked_until = NULL \
             WHERE id = $1 AND locked_by = $2",
        )
        .bind(seat_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, BoxError> {
        let result = sqlx::query(
            "UPDATE seats SET locked_by = NULL, locked_until = NULL \
             WHERE is_booked = FALSE AND locked_until IS NOT NULL AND locked_until < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn book_seats(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
        owner: &str,
    ) -> Result<(), CommitError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CommitError::Backend(e.into()))?;

        // A seat booked by a racing transaction drops out of this match set;
        // FOR UPDATE blocks the race until the other commit resolves.
        let matched: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM seats \
             WHERE id = ANY($1) AND show_id = $2 AND is_booked = FALSE \
             FOR UPDATE",
        )
        .bind(seat_ids)
        .bind(show_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| CommitError::Backend(e.into()))?;

        if matched.len() != seat_ids.len() {
            // Dropping the transaction rolls it back.
            return Err(CommitError::PartialAvailability {
                requested: seat_ids.len(),
                matched: matched.len(),
            });
        }

        sqlx::query(
            "UPDATE seats SET is_booked = TRUE, booked_by = $1, \
             locked_by = NULL, locked_until = NULL \
             WHERE id = ANY($2)",
        )
        .bind(owner)
        .bind(seat_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| CommitError::Backend(e.into()))?;

        tx.commit()
            .await
            .map_err(|e| CommitError::Backend(e.into()))?;
        Ok(())
    }
}
