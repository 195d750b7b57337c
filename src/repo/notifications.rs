use sqlx::{PgExecutor, PgPool};

use uuid::Uuid;

use crate::domain::Pagination;
use crate::model::{NewNotification, Notification};

/// Repository for the `notifications` table.
/// Every read and write is scoped to the owning user.
pub struct NotificationsRepo;

impl NotificationsRepo {
    #[tracing::instrument("Insert notification", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_notification: &NewNotification,
    ) -> sqlx::Result<Notification> {
        sqlx::query_as::<_, Notification>(
            "insert into notifications(user_id, loan_id, notification_type, subject, body)
             values ($1, $2, $3, $4, $5)
             returning *",
        )
        .bind(new_notification.user_id)
        .bind(new_notification.loan_id)
        .bind(new_notification.kind.as_str())
        .bind(&new_notification.subject)
        .bind(&new_notification.body)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch notifications of user", skip(pool))]
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        window: Pagination,
    ) -> sqlx::Result<(Vec<Notification>, i64)> {
        let (total,): (i64,) = sqlx::query_as("select count(*) from notifications where user_id=$1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        let notifications = sqlx::query_as::<_, Notification>(
            "select * from notifications where user_id=$1
             order by created_at desc
             offset $2 limit $3",
        )
        .bind(user_id)
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(pool)
        .await?;
        Ok((notifications, total))
    }

    #[tracing::instrument("Fetch unread notifications of user", skip(executor))]
    pub async fn list_unread<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
    ) -> sqlx::Result<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "select * from notifications where user_id=$1 and status='PENDING'
             order by created_at desc",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Fetch notifications of user for loan", skip(executor))]
    pub async fn list_for_loan<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
        loan_id: Uuid,
    ) -> sqlx::Result<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "select * from notifications where user_id=$1 and loan_id=$2
             order by created_at desc",
        )
        .bind(user_id)
        .bind(loan_id)
        .fetch_all(executor)
        .await
    }

    /// Returns `None` when the notification does not exist or belongs to someone else
    #[tracing::instrument("Mark notification opened", skip(executor))]
    pub async fn mark_opened<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "update notifications
             set status='OPENED', opened_at=coalesce(opened_at, now())
             where id=$1 and user_id=$2
             returning *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument("Delete notification", skip(executor))]
    pub async fn delete<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from notifications where id=$1 and user_id=$2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument("Clear notifications of user", skip(executor))]
    pub async fn clear_for_user<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query("delete from notifications where user_id=$1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
