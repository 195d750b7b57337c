use chrono::{DateTime, Utc};

use sqlx::{PgExecutor, PgPool};

use uuid::Uuid;

use crate::domain::Pagination;
use crate::model::{Activity, NewActivity};

/// Repository for the `activities` audit log
pub struct ActivitiesRepo;

impl ActivitiesRepo {
    #[tracing::instrument("Insert activity", skip(executor, activity), fields(action = activity.action.as_str()))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        activity: &NewActivity,
    ) -> sqlx::Result<Activity> {
        sqlx::query_as::<_, Activity>(
            "insert into activities(
                user_id, action, description, resource_type, resource_id, loan_id,
                old_values, new_values, ip_address, user_agent
             )
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             returning *",
        )
        .bind(activity.user_id)
        .bind(activity.action.as_str())
        .bind(activity.description.as_deref())
        .bind(activity.action.resource_type())
        .bind(activity.resource_id.as_deref())
        .bind(activity.loan_id)
        .bind(activity.old_values.as_ref())
        .bind(activity.new_values.as_ref())
        .bind(activity.origin.ip_address.as_deref())
        .bind(activity.origin.user_agent.as_deref())
        .fetch_one(executor)
        .await
    }

    /// The newest activities across the whole system
    #[tracing::instrument("Fetch recent activities", skip(executor))]
    pub async fn recent<'con>(
        executor: impl PgExecutor<'con>,
        window: Pagination,
    ) -> sqlx::Result<Vec<Activity>> {
        sqlx::query_as::<_, Activity>(
            "select * from activities order by created_at desc offset $1 limit $2",
        )
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Fetch activities by action", skip(pool))]
    pub async fn list_by_action(
        pool: &PgPool,
        action: &str,
        window: Pagination,
    ) -> sqlx::Result<(Vec<Activity>, i64)> {
        let (total,): (i64,) = sqlx::query_as("select count(*) from activities where action=$1")
            .bind(action)
            .fetch_one(pool)
            .await?;
        let activities = sqlx::query_as::<_, Activity>(
            "select * from activities where action=$1
             order by created_at desc
             offset $2 limit $3",
        )
        .bind(action)
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(pool)
        .await?;
        Ok((activities, total))
    }

    #[tracing::instrument("Fetch activities of user", skip(pool))]
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        window: Pagination,
    ) -> sqlx::Result<(Vec<Activity>, i64)> {
        let (total,): (i64,) = sqlx::query_as("select count(*) from activities where user_id=$1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        let activities = sqlx::query_as::<_, Activity>(
            "select * from activities where user_id=$1
             order by created_at desc
             offset $2 limit $3",
        )
        .bind(user_id)
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(pool)
        .await?;
        Ok((activities, total))
    }

    #[tracing::instrument("Fetch activities of loan", skip(pool))]
    pub async fn list_for_loan(
        pool: &PgPool,
        loan_id: Uuid,
        window: Pagination,
    ) -> sqlx::Result<(Vec<Activity>, i64)> {
        let (total,): (i64,) = sqlx::query_as("select count(*) from activities where loan_id=$1")
            .bind(loan_id)
            .fetch_one(pool)
            .await?;
        let activities = sqlx::query_as::<_, Activity>(
            "select * from activities where loan_id=$1
             order by created_at desc
             offset $2 limit $3",
        )
        .bind(loan_id)
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(pool)
        .await?;
        Ok((activities, total))
    }

    /// Delete everything recorded before `before`, returning how many rows went
    #[tracing::instrument("Archive activities", skip(executor))]
    pub async fn archive_before<'con>(
        executor: impl PgExecutor<'con>,
        before: DateTime<Utc>,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query("delete from activities where created_at < $1")
            .bind(before)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
