use actix_web::dev::HttpServiceFactory;
use actix_web::{put, web, HttpResponse};

use serde::Deserialize;
use serde_json::json;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::{revoke_sessions, Admin};
use crate::domain::{ActivityAction, UserRole};
use crate::error::{Error, Result};
use crate::model::{NewActivity, RequestOrigin};
use crate::repo::UsersRepo;

use super::{record_activity, required};

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    is_active: Option<bool>,
}

#[tracing::instrument(name = "Change user role", skip(body, pool, origin), fields(admin.id = %admin.id))]
#[put("/{id}/role")]
async fn update_role(
    Admin(admin): Admin,
    path: web::Path<Uuid>,
    body: web::Json<RoleBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let user_id = path.into_inner();

    let role: UserRole = required(body.into_inner().role, "Role is required")?
        .parse()
        .map_err(Error::validation)?;

    let previous = UsersRepo::fetch_by_id(pool, user_id)
        .await?
        .ok_or(Error::NotFound("User"))?;
    let user = UsersRepo::update_role(pool, user_id, role)
        .await?
        .ok_or(Error::NotFound("User"))?;

    record_activity(
        pool,
        NewActivity::new(admin.id, ActivityAction::UserRoleChanged, origin)
            .description(format!("Role of {} changed to {}", user.username, role))
            .resource(user.id)
            .values(
                Some(json!({ "role": previous.role })),
                Some(json!({ "role": user.role })),
            ),
    )
    .await;

    Ok(HttpResponse::Ok().json(user))
}

#[tracing::instrument(name = "Change user status", skip(body, pool, origin), fields(admin.id = %admin.id))]
#[put("/{id}/status")]
async fn update_status(
    Admin(admin): Admin,
    path: web::Path<Uuid>,
    body: web::Json<StatusBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let user_id = path.into_inner();
    let is_active = required(body.into_inner().is_active, "isActive is required")?;

    let mut tx = pool.begin().await?;
    let user = UsersRepo::update_active(&mut *tx, user_id, is_active)
        .await?
        .ok_or(Error::NotFound("User"))?;
    if !is_active {
        revoke_sessions(&mut *tx, user.id).await?;
    }
    tx.commit().await?;

    record_activity(
        pool,
        NewActivity::new(admin.id, ActivityAction::UserStatusChanged, origin)
            .description(format!(
                "User {} {}",
                user.username,
                if is_active { "activated" } else { "deactivated" }
            ))
            .resource(user.id)
            .values(None, Some(json!({ "isActive": is_active }))),
    )
    .await;

    Ok(HttpResponse::Ok().json(user))
}

/// User administration endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/users")
        .service(update_role)
        .service(update_status)
}
