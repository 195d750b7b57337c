use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{EmailAddress, UserRole, Username};
use crate::model::{NewUser, User};

/// Repository for the `users` table
pub struct UsersRepo;

impl UsersRepo {
    #[tracing::instrument("Insert a new user record", skip(executor, new_user))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_user: &NewUser,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            "insert into users(email, username, password_hash, first_name, last_name, role)
             values ($1, $2, $3, $4, $5, $6)
             returning *",
        )
        .bind(new_user.email.as_ref())
        .bind(new_user.username.as_ref())
        .bind(&new_user.password_hash)
        .bind(new_user.first_name.as_ref().map(AsRef::<str>::as_ref))
        .bind(new_user.last_name.as_ref().map(AsRef::<str>::as_ref))
        .bind(new_user.role)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch user by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("select * from users where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument("Fetch user by email", skip(executor))]
    pub async fn fetch_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("select * from users where email=$1")
            .bind(email.as_ref())
            .fetch_optional(executor)
            .await
    }

    /// Whether the email and the username are already registered, in that order
    #[tracing::instrument("Check for registered email or username", skip(executor))]
    pub async fn find_taken<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
        username: &Username,
    ) -> sqlx::Result<(bool, bool)> {
        sqlx::query_as::<_, (bool, bool)>(
            "select exists(select 1 from users where email=$1),
                    exists(select 1 from users where username=$2)",
        )
        .bind(email.as_ref())
        .bind(username.as_ref())
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Record user login", skip(executor))]
    pub async fn record_login<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("update users set last_login_at=now() where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    #[tracing::instrument("Update user password", skip(executor, password_hash))]
    pub async fn update_password_hash<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        password_hash: &str,
    ) -> sqlx::Result<()> {
        sqlx::query("update users set password_hash=$2 where id=$1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(())
    }

    #[tracing::instrument("Update user role", skip(executor))]
    pub async fn update_role<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        role: UserRole,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("update users set role=$2 where id=$1 returning *")
            .bind(id)
            .bind(role)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument("Update user active flag", skip(executor))]
    pub async fn update_active<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        is_active: bool,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("update users set is_active=$2 where id=$1 returning *")
            .bind(id)
            .bind(is_active)
            .fetch_optional(executor)
            .await
    }

    /// The longest-registered active user holding `role`
    #[tracing::instrument("Fetch first user with role", skip(executor))]
    pub async fn first_with_role<'con>(
        executor: impl PgExecutor<'con>,
        role: UserRole,
    ) -> sqlx::Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "select id from users where role=$1 and is_active order by created_at limit 1",
        )
        .bind(role)
        .fetch_optional(executor)
        .await?;
        Ok(row.map(|(id,)| id))
    }
}
