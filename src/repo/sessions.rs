use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::model::UserSession;

/// Repository for refresh-token sessions
pub struct SessionsRepo;

impl SessionsRepo {
    #[tracing::instrument("Insert a new session", skip(executor, token_hash))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<Uuid> {
        let (id,): (Uuid,) = sqlx::query_as(
            "insert into user_sessions(user_id, token_hash, expires_at)
             values ($1, $2, $3)
             returning id",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    /// Fetch the unexpired session holding `token_hash`
    #[tracing::instrument("Fetch session by token hash", skip(executor, token_hash))]
    pub async fn fetch_active_by_hash<'con>(
        executor: impl PgExecutor<'con>,
        token_hash: &str,
    ) -> sqlx::Result<Option<UserSession>> {
        sqlx::query_as::<_, UserSession>(
            "select * from user_sessions where token_hash=$1 and expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// Swap the stored hash, only if it still holds `old_hash`.
    /// Returns `false` when another request rotated the session first.
    #[tracing::instrument("Rotate session", skip(executor, old_hash, new_hash))]
    pub async fn rotate<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update user_sessions set token_hash=$3, expires_at=$4
             where id=$1 and token_hash=$2",
        )
        .bind(id)
        .bind(old_hash)
        .bind(new_hash)
        .bind(expires_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument("Delete sessions of user", skip(executor))]
    pub async fn delete_for_user<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query("delete from user_sessions where user_id=$1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument("Delete expired sessions of user", skip(executor))]
    pub async fn delete_expired_for_user<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
    ) -> sqlx::Result<u64> {
        let result =
            sqlx::query("delete from user_sessions where user_id=$1 and expires_at <= now()")
                .bind(user_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }
}
