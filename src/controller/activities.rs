use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, web, HttpResponse};

use chrono::{DateTime, Utc};

use serde::Deserialize;
use serde_json::json;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::{Admin, AuthenticatedUser, Staff};
use crate::domain::{Page, PageQuery};
use crate::error::{Error, Result};
use crate::repo::ActivitiesRepo;

use super::loans::accessible_loan;
use super::{page_window, required};

const FEED_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 50;

#[tracing::instrument(name = "Recent activity feed", skip(query, pool), fields(user.id = %staff.id))]
#[get("")]
async fn recent(
    Staff(staff): Staff,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let window = page_window(&query, FEED_SIZE)?;
    let activities = ActivitiesRepo::recent(pool.get_ref(), window).await?;

    Ok(HttpResponse::Ok().json(activities))
}

#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    action: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[tracing::instrument(name = "List activities by action", skip(query, pool), fields(user.id = %staff.id))]
#[get("/action")]
async fn by_action(
    Staff(staff): Staff,
    query: web::Query<ActionQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let window = page_window(&page, DEFAULT_PAGE_SIZE)?;
    let action = required(
        query.action.filter(|action| !action.is_empty()),
        "Action parameter is required",
    )?;

    let (activities, total) =
        ActivitiesRepo::list_by_action(pool.get_ref(), &action.to_uppercase(), window).await?;

    Ok(HttpResponse::Ok().json(Page::new(activities, total, window)))
}

#[tracing::instrument(name = "List my activities", skip(query, pool), fields(user.id = %user.id))]
#[get("/user/my-activities")]
async fn mine(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let window = page_window(&query, DEFAULT_PAGE_SIZE)?;
    let (activities, total) = ActivitiesRepo::list_for_user(pool.get_ref(), user.id, window).await?;

    Ok(HttpResponse::Ok().json(Page::new(activities, total, window)))
}

#[tracing::instrument(name = "List loan activities", skip(query, pool), fields(user.id = %user.id))]
#[get("/loans/{loan_id}")]
async fn list_for_loan(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let window = page_window(&query, DEFAULT_PAGE_SIZE)?;
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let (activities, total) = ActivitiesRepo::list_for_loan(pool, loan.id, window).await?;

    Ok(HttpResponse::Ok().json(Page::new(activities, total, window)))
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    before: Option<String>,
}

#[tracing::instrument(name = "Archive activities", skip(query, pool), fields(user.id = %admin.id))]
#[delete("/archive")]
async fn archive(
    Admin(admin): Admin,
    query: web::Query<ArchiveQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let before = required(query.into_inner().before, "Before date is required")?;
    let before = DateTime::parse_from_rfc3339(&before)
        .map_err(|_| Error::validation("Before must be an RFC 3339 timestamp"))?
        .with_timezone(&Utc);

    let archived = ActivitiesRepo::archive_before(pool.get_ref(), before).await?;
    tracing::info!(archived, %before, "Archived activities");

    Ok(HttpResponse::Ok().json(json!({ "archived": archived })))
}

/// Audit log endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/activities")
        .service(recent)
        .service(by_action)
        .service(mine)
        .service(list_for_loan)
        .service(archive)
}
