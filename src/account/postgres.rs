//! Postgres-backed [`AccountStore`].
//!
//! Secret + `otp_required` travel in the same INSERT as the credential
//! fields, so enrollment commit is a single atomic row write. The schema
//! additionally enforces the invariant with a CHECK constraint (see
//! `sql/schema.sql`).

use super::{Account, AccountChanges, AccountStore, CreateOutcome, NewAccount, UpdateOutcome};
use crate::otp::secret::OtpSecret;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Map SQLSTATE 23505 so callers can distinguish validation conflicts from
/// infrastructure failures.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

impl<'r> FromRow<'r, PgRow> for Account {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let otp_secret: Option<Vec<u8>> = row.try_get("otp_secret")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            otp_secret: otp_secret.map(OtpSecret::from_bytes),
            otp_required: row.try_get("otp_required")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create_with_secret(
        &self,
        new_account: NewAccount,
        secret: &OtpSecret,
    ) -> Result<CreateOutcome> {
        let query = r"
            INSERT INTO users (email, password_hash, otp_secret, otp_required)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, email, password_hash, otp_secret, otp_required, created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query_as::<_, Account>(query)
            .bind(&new_account.email)
            .bind(&new_account.password_hash)
            .bind(secret.as_bytes())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(account) => Ok(CreateOutcome::Created(account)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = r"
            SELECT id, email, password_hash, otp_secret, otp_required, created_at
            FROM users
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, Account>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by email")
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = r"
            SELECT id, email, password_hash, otp_secret, otp_required, created_at
            FROM users
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, Account>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by id")
    }

    async fn update_fields(&self, id: Uuid, changes: AccountChanges) -> Result<UpdateOutcome> {
        // COALESCE keeps untouched columns; the secret columns are not
        // reachable from this statement.
        let query = r"
            UPDATE users
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING id, email, password_hash, otp_secret, otp_required, created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query_as::<_, Account>(query)
            .bind(id)
            .bind(changes.email.as_deref())
            .bind(changes.password_hash.as_deref())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(Some(account)) => Ok(UpdateOutcome::Updated(account)),
            Ok(None) => Ok(UpdateOutcome::NotFound),
            Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::Conflict),
            Err(err) => Err(err).context("failed to update account"),
        }
    }
}
