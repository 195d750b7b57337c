use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse};

use serde::{Deserialize, Serialize};

use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::model::{LoanProgram, StatusCount};
use crate::repo::{LoansRepo, ProgramsRepo};

use super::required;

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgramWithCount {
    #[serde(flatten)]
    program: LoanProgram,
    application_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgramStats {
    program: LoanProgram,
    status_breakdown: Vec<StatusCount>,
}

async fn fetch_program(pool: &PgPool, id: i32) -> Result<LoanProgram> {
    ProgramsRepo::fetch_by_id(pool, id)
        .await?
        .ok_or(Error::NotFound("Loan program"))
}

#[tracing::instrument(name = "List loan programs", skip(pool))]
#[get("")]
async fn list(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let programs = ProgramsRepo::list_active(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(programs))
}

#[tracing::instrument(name = "List loan programs by category", skip(pool))]
#[get("/category")]
async fn by_category(
    query: web::Query<CategoryQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let category = required(
        query.into_inner().category.filter(|c| !c.trim().is_empty()),
        "Category parameter is required",
    )?;
    let programs =
        ProgramsRepo::list_by_category(pool.get_ref(), &category.trim().to_uppercase()).await?;

    Ok(HttpResponse::Ok().json(programs))
}

#[tracing::instrument(name = "Fetch loan program", skip(pool))]
#[get("/{id}")]
async fn detail(path: web::Path<i32>, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let program = fetch_program(pool, path.into_inner()).await?;
    let application_count = LoansRepo::count_for_program(pool, program.id).await?;

    Ok(HttpResponse::Ok().json(ProgramWithCount {
        program,
        application_count,
    }))
}

#[tracing::instrument(name = "Loan program statistics", skip(pool))]
#[get("/{id}/stats")]
async fn stats(path: web::Path<i32>, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let program = fetch_program(pool, path.into_inner()).await?;
    let status_breakdown = LoansRepo::status_counts_for_program(pool, program.id).await?;

    Ok(HttpResponse::Ok().json(ProgramStats {
        program,
        status_breakdown,
    }))
}

/// Public catalogue of loan programs
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/loan-programs")
        .service(list)
        .service(by_category)
        .service(detail)
        .service(stats)
}
