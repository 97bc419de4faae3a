//! Postgres-backed rider store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RiderStoreError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation on phone number) | `23505` | `DuplicatePhone` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Other | N/A | `Backend` |
//!
//! ## Serialization
//!
//! `update_if_status` runs in a transaction that locks the row with
//! `SELECT ... FOR UPDATE`, compares the status, writes, then commits. A second
//! writer blocks on the lock and then observes the committed status.
//!
//! Profile sequence numbers come from a per-year counter row bumped with a
//! single upsert, so two approvals committing at once never share a number.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::instrument;

use boda_core::{ActorId, RiderId};
use boda_riders::{PhoneNumber, ProfileId, Rider, RiderStatus, StatusCounts};

use super::r#trait::{apply_lifecycle, RiderFilter, RiderStore, RiderStoreError};

const PHONE_UNIQUE_CONSTRAINT: &str = "riders_phone_number_unique";

const RIDER_COLUMNS: &str = r#"
    id, phone_number, first_name, last_name, status, assigned_enumerator,
    profile_id, reviewed_by,
    approved_at, rejected_at, rejection_reason, review_notes, submitted_at,
    push_token, created_at, updated_at, revision
"#;

/// Postgres-backed rider store.
#[derive(Debug, Clone)]
pub struct PostgresRiderStore {
    pool: Arc<PgPool>,
}

impl PostgresRiderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the `riders` table, its indexes and the profile sequence table
    /// if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), RiderStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS riders (
                id UUID PRIMARY KEY,
                phone_number TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                status TEXT NOT NULL,
                assigned_enumerator UUID NULL,
                profile_id TEXT NULL,
                reviewed_by UUID NULL,
                approved_at TIMESTAMPTZ NULL,
                rejected_at TIMESTAMPTZ NULL,
                rejection_reason TEXT NULL,
                review_notes TEXT NULL,
                submitted_at TIMESTAMPTZ NULL,
                push_token TEXT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                revision BIGINT NOT NULL,
                CONSTRAINT riders_phone_number_unique UNIQUE (phone_number),
                CONSTRAINT riders_profile_id_unique UNIQUE (profile_id),
                CONSTRAINT riders_approved_at_matches_status
                    CHECK ((status = 'APPROVED') = (approved_at IS NOT NULL)),
                CONSTRAINT riders_profile_id_matches_status
                    CHECK ((status = 'APPROVED') = (profile_id IS NOT NULL)),
                CONSTRAINT riders_rejection_matches_status
                    CHECK ((status = 'REJECTED') = (rejection_reason IS NOT NULL AND rejection_reason <> ''))
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_riders_table", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS riders_status_created_idx ON riders (status, created_at DESC)")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_riders_index", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS riders_assigned_enumerator_idx ON riders (assigned_enumerator)")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_assignment_index", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rider_profile_sequences (
                year INTEGER PRIMARY KEY,
                last_value INTEGER NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_profile_sequences_table", e))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RiderStore for PostgresRiderStore {
    #[instrument(skip(self, rider), fields(rider_id = %rider.id), err)]
    async fn insert(&self, rider: Rider) -> Result<Rider, RiderStoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO riders ({RIDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {RIDER_COLUMNS}
            "#
        ))
        .bind(rider.id.as_uuid())
        .bind(rider.phone_number.as_str())
        .bind(&rider.first_name)
        .bind(&rider.last_name)
        .bind(rider.status.as_str())
        .bind(rider.assigned_enumerator.map(|a| *a.as_uuid()))
        .bind(rider.profile_id.as_ref().map(|p| p.as_str()))
        .bind(rider.reviewed_by.map(|a| *a.as_uuid()))
        .bind(rider.approved_at)
        .bind(rider.rejected_at)
        .bind(&rider.rejection_reason)
        .bind(&rider.review_notes)
        .bind(rider.submitted_at)
        .bind(&rider.push_token)
        .bind(rider.created_at)
        .bind(rider.updated_at)
        .bind(rider.revision as i64)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, PHONE_UNIQUE_CONSTRAINT) {
                RiderStoreError::DuplicatePhone(rider.phone_number.to_string())
            } else {
                map_sqlx_error("insert_rider", e)
            }
        })?;

        rider_from_row(&row)
    }

    #[instrument(skip(self), fields(rider_id = %id), err)]
    async fn get(&self, id: RiderId) -> Result<Rider, RiderStoreError> {
        let row = sqlx::query(&format!("SELECT {RIDER_COLUMNS} FROM riders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_rider", e))?;

        match row {
            Some(row) => rider_from_row(&row),
            None => Err(RiderStoreError::NotFound(id)),
        }
    }

    #[instrument(skip(self), err)]
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Rider>, RiderStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {RIDER_COLUMNS} FROM riders WHERE phone_number = $1"
        ))
        .bind(phone.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_phone", e))?;

        row.as_ref().map(rider_from_row).transpose()
    }

    #[instrument(
        skip(self, next),
        fields(rider_id = %next.id, expected = %expected, target = %next.status),
        err
    )]
    async fn update_if_status(
        &self,
        expected: RiderStatus,
        next: Rider,
    ) -> Result<Rider, RiderStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            "SELECT {RIDER_COLUMNS} FROM riders WHERE id = $1 FOR UPDATE"
        ))
        .bind(next.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_rider", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RiderStoreError::NotFound(next.id));
        };
        let stored = rider_from_row(&row)?;

        if stored.status != expected {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RiderStoreError::StatusMismatch {
                expected,
                actual: stored.status,
            });
        }

        let committed = apply_lifecycle(&stored, &next);

        let row = sqlx::query(&format!(
            r#"
            UPDATE riders SET
                status = $2,
                profile_id = $3,
                reviewed_by = $4,
                approved_at = $5,
                rejected_at = $6,
                rejection_reason = $7,
                review_notes = $8,
                submitted_at = $9,
                updated_at = $10,
                revision = $11
            WHERE id = $1
            RETURNING {RIDER_COLUMNS}
            "#
        ))
        .bind(committed.id.as_uuid())
        .bind(committed.status.as_str())
        .bind(committed.profile_id.as_ref().map(|p| p.as_str()))
        .bind(committed.reviewed_by.map(|a| *a.as_uuid()))
        .bind(committed.approved_at)
        .bind(committed.rejected_at)
        .bind(&committed.rejection_reason)
        .bind(&committed.review_notes)
        .bind(committed.submitted_at)
        .bind(committed.updated_at)
        .bind(committed.revision as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_rider_lifecycle", e))?;

        let committed = rider_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(committed)
    }

    #[instrument(skip(self, token), fields(rider_id = %id), err)]
    async fn set_push_token(
        &self,
        id: RiderId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Rider, RiderStoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE riders
            SET push_token = $2, updated_at = $3, revision = revision + 1
            WHERE id = $1
            RETURNING {RIDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(token)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_push_token", e))?;

        match row {
            Some(row) => rider_from_row(&row),
            None => Err(RiderStoreError::NotFound(id)),
        }
    }

    #[instrument(skip(self), err)]
    async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, RiderStoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RIDER_COLUMNS} FROM riders
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR assigned_enumerator = $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.assigned_enumerator.map(|a| *a.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_riders", e))?;

        rows.iter().map(rider_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn status_counts(&self, assigned: Option<ActorId>) -> Result<StatusCounts, RiderStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n FROM riders
            WHERE ($1::UUID IS NULL OR assigned_enumerator = $1)
            GROUP BY status
            "#,
        )
        .bind(assigned.map(|a| *a.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("status_counts", e))?;

        let mut counts = StatusCounts::new();
        for row in rows {
            let status: String = row.try_get("status").map_err(decode_error)?;
            let n: i64 = row.try_get("n").map_err(decode_error)?;
            counts.set(parse_status(&status)?, n as u64);
        }
        Ok(counts)
    }

    #[instrument(skip(self), err)]
    async fn count_recent_submissions(
        &self,
        assigned: Option<ActorId>,
        since: DateTime<Utc>,
    ) -> Result<u64, RiderStoreError> {
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM riders
            WHERE status = $1 AND submitted_at >= $2
              AND ($3::UUID IS NULL OR assigned_enumerator = $3)
            "#,
        )
        .bind(RiderStatus::PendingApproval.as_str())
        .bind(since)
        .bind(assigned.map(|a| *a.as_uuid()))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_recent_submissions", e))?;

        Ok(n as u64)
    }

    #[instrument(skip(self), err)]
    async fn next_profile_sequence(&self, year: i32) -> Result<u32, RiderStoreError> {
        let last: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO rider_profile_sequences (year, last_value) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE
                SET last_value = rider_profile_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_profile_sequence", e))?;

        u32::try_from(last)
            .map_err(|_| RiderStoreError::Backend(format!("profile sequence out of range: {last}")))
    }
}

fn rider_from_row(row: &PgRow) -> Result<Rider, RiderStoreError> {
    let phone: String = row.try_get("phone_number").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let assigned_enumerator: Option<uuid::Uuid> =
        row.try_get("assigned_enumerator").map_err(decode_error)?;
    let profile_id: Option<String> = row.try_get("profile_id").map_err(decode_error)?;
    let reviewed_by: Option<uuid::Uuid> = row.try_get("reviewed_by").map_err(decode_error)?;
    let revision: i64 = row.try_get("revision").map_err(decode_error)?;

    Ok(Rider {
        id: RiderId::from_uuid(row.try_get("id").map_err(decode_error)?),
        phone_number: PhoneNumber::parse(&phone)
            .map_err(|e| RiderStoreError::Backend(format!("stored phone number is invalid: {e}")))?,
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
        status: parse_status(&status)?,
        assigned_enumerator: assigned_enumerator.map(ActorId::from_uuid),
        profile_id: profile_id
            .as_deref()
            .map(ProfileId::parse)
            .transpose()
            .map_err(|e| RiderStoreError::Backend(format!("stored profile id is invalid: {e}")))?,
        reviewed_by: reviewed_by.map(ActorId::from_uuid),
        approved_at: row.try_get("approved_at").map_err(decode_error)?,
        rejected_at: row.try_get("rejected_at").map_err(decode_error)?,
        rejection_reason: row.try_get("rejection_reason").map_err(decode_error)?,
        review_notes: row.try_get("review_notes").map_err(decode_error)?,
        submitted_at: row.try_get("submitted_at").map_err(decode_error)?,
        push_token: row.try_get("push_token").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
        revision: revision as u64,
    })
}

fn parse_status(raw: &str) -> Result<RiderStatus, RiderStoreError> {
    RiderStatus::from_str(raw)
        .map_err(|e| RiderStoreError::Backend(format!("stored status is invalid: {e}")))
}

fn decode_error(err: sqlx::Error) -> RiderStoreError {
    RiderStoreError::Backend(format!("failed to decode rider row: {err}"))
}

/// Map SQLx errors to `RiderStoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RiderStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            let phone_taken = db_err.code().is_some_and(|code| code.as_ref() == "23505")
                && db_err.constraint() == Some(PHONE_UNIQUE_CONSTRAINT);
            if phone_taken {
                RiderStoreError::DuplicatePhone(msg)
            } else {
                RiderStoreError::Backend(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            RiderStoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => RiderStoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique violation of `constraint`.
fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505" && db_err.constraint() == Some(constraint);
        }
    }
    false
}
