use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, web, HttpResponse};

use serde_json::json;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::{Page, PageQuery};
use crate::error::{Error, Result};
use crate::repo::NotificationsRepo;

use super::loans::accessible_loan;
use super::page_window;

const DEFAULT_PAGE_SIZE: i64 = 20;

#[tracing::instrument(name = "List notifications", skip(query, pool), fields(user.id = %user.id))]
#[get("")]
async fn list(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let window = page_window(&query, DEFAULT_PAGE_SIZE)?;
    let (notifications, total) =
        NotificationsRepo::list_for_user(pool.get_ref(), user.id, window).await?;

    Ok(HttpResponse::Ok().json(Page::new(notifications, total, window)))
}

#[tracing::instrument(name = "List unread notifications", skip(pool), fields(user.id = %user.id))]
#[get("/unread")]
async fn unread(user: AuthenticatedUser, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let notifications = NotificationsRepo::list_unread(pool.get_ref(), user.id).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[tracing::instrument(name = "List loan notifications", skip(pool), fields(user.id = %user.id))]
#[get("/loans/{loan_id}")]
async fn list_for_loan(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let notifications = NotificationsRepo::list_for_loan(pool, user.id, loan.id).await?;

    Ok(HttpResponse::Ok().json(notifications))
}

#[tracing::instrument(name = "Mark notification opened", skip(pool), fields(user.id = %user.id))]
#[post("/{id}/mark-opened")]
async fn mark_opened(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    // Other users' notifications look missing
    let notification = NotificationsRepo::mark_opened(pool.get_ref(), path.into_inner(), user.id)
        .await?
        .ok_or(Error::NotFound("Notification"))?;

    Ok(HttpResponse::Ok().json(notification))
}

#[tracing::instrument(name = "Clear notifications", skip(pool), fields(user.id = %user.id))]
#[post("/clear-all")]
async fn clear_all(user: AuthenticatedUser, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let cleared = NotificationsRepo::clear_for_user(pool.get_ref(), user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "cleared": cleared })))
}

#[tracing::instrument(name = "Delete notification", skip(pool), fields(user.id = %user.id))]
#[delete("/{id}")]
async fn remove(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    if !NotificationsRepo::delete(pool.get_ref(), path.into_inner(), user.id).await? {
        return Err(Error::NotFound("Notification"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Endpoints over the caller's own notifications
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/notifications")
        .service(list)
        .service(unread)
        .service(list_for_loan)
        .service(clear_all)
        .service(mark_opened)
        .service(remove)
}
