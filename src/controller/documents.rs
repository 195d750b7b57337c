use actix_web::dev::HttpServiceFactory;
use actix_web::http::{header, StatusCode};
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};

use serde::Deserialize;
use serde_json::json;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Staff};
use crate::domain::{ActivityAction, DocumentType, VerificationStatus};
use crate::error::{Error, Result};
use crate::model::{NewActivity, NewDocument, RequestOrigin};
use crate::repo::DocumentsRepo;
use crate::storage::FileStore;

use super::loans::accessible_loan;
use super::{record_activity, required};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Largest accepted upload, in bytes
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    document_type: Option<String>,
    document_name: Option<String>,
    is_required: Option<bool>,
}

#[tracing::instrument(
    name = "Upload loan document",
    skip(req, query, body, pool, store, limit, origin),
    fields(user.id = %user.id)
)]
#[post("/{id}/documents")]
pub(crate) async fn upload(
    req: HttpRequest,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<UploadQuery>,
    body: std::result::Result<web::Bytes, actix_web::Error>,
    pool: web::Data<PgPool>,
    store: web::Data<dyn FileStore>,
    limit: web::Data<UploadLimit>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let limit = limit.0;

    let contents = body.map_err(|e| {
        if e.as_response_error().status_code() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge(limit)
        } else {
            tracing::debug!(error = %e, "Failed to read upload body");
            Error::validation("Failed to read uploaded file")
        }
    })?;
    if contents.is_empty() {
        return Err(Error::validation("No file uploaded"));
    }
    if contents.len() > limit {
        return Err(Error::PayloadTooLarge(limit));
    }

    let query = query.into_inner();
    let document_type: DocumentType = required(query.document_type, "Document type is required")?
        .parse()
        .map_err(Error::validation)?;
    let document_name = required(
        query.document_name.filter(|name| !name.trim().is_empty()),
        "Document name is required",
    )?;
    let mime_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    let loan = accessible_loan(pool, &user, path.into_inner()).await?;

    let file_path = store.save(&document_name, &contents).await?;
    let new_document = NewDocument {
        loan_id: loan.id,
        document_type,
        document_name: document_name.trim().to_string(),
        file_path,
        file_size: contents.len() as i64,
        mime_type,
        uploaded_by_id: user.id,
        is_required: query.is_required.unwrap_or(false),
    };
    let document = match DocumentsRepo::insert(pool, &new_document).await {
        Ok(document) => document,
        Err(e) => {
            // Don't leave an orphaned file behind
            if let Err(error) = store.remove(&new_document.file_path).await {
                tracing::warn!(error.cause_chain = ?error, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::DocumentUploaded, origin)
            .description(format!(
                "Document {} uploaded to loan {}",
                document.document_name, loan.loan_number
            ))
            .resource(document.id)
            .loan(loan.id)
            .values(
                None,
                Some(json!({
                    "documentType": document.document_type,
                    "fileSize": document.file_size,
                })),
            ),
    )
    .await;

    Ok(HttpResponse::Created().json(document))
}

#[tracing::instrument(name = "List loan documents", skip(pool), fields(user.id = %user.id))]
#[get("/{id}/documents")]
pub(crate) async fn list_for_loan(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let documents = DocumentsRepo::list_for_loan(pool, loan.id).await?;

    Ok(HttpResponse::Ok().json(documents))
}

#[tracing::instrument(name = "Fetch document", skip(pool), fields(user.id = %user.id))]
#[get("/{id}")]
async fn detail(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let document = DocumentsRepo::fetch_by_id(pool, path.into_inner())
        .await?
        .ok_or(Error::NotFound("Document"))?;
    accessible_loan(pool, &user, document.loan_id).await?;

    Ok(HttpResponse::Ok().json(document))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBody {
    verification_status: Option<String>,
    notes: Option<String>,
}

#[tracing::instrument(name = "Verify document", skip(body, pool, origin), fields(user.id = %staff.id))]
#[post("/{id}/verify")]
async fn verify(
    Staff(staff): Staff,
    path: web::Path<Uuid>,
    body: web::Json<VerifyBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();
    let status: VerificationStatus =
        required(body.verification_status, "Verification status is required")?
            .parse()
            .map_err(Error::validation)?;

    let previous = DocumentsRepo::fetch_by_id(pool, path.into_inner())
        .await?
        .ok_or(Error::NotFound("Document"))?;
    let document = DocumentsRepo::verify(pool, previous.id, status, staff.id, body.notes.as_deref())
        .await?
        .ok_or(Error::NotFound("Document"))?;

    record_activity(
        pool,
        NewActivity::new(staff.id, ActivityAction::DocumentVerified, origin)
            .description(format!(
                "Document {} marked {:?}",
                document.document_name, document.verification_status
            ))
            .resource(document.id)
            .loan(document.loan_id)
            .values(
                Some(json!({ "verificationStatus": previous.verification_status })),
                Some(json!({ "verificationStatus": document.verification_status })),
            ),
    )
    .await;

    Ok(HttpResponse::Ok().json(document))
}

#[tracing::instrument(name = "Delete document", skip(pool, store, origin), fields(user.id = %user.id))]
#[delete("/{id}")]
async fn remove(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    store: web::Data<dyn FileStore>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let document = DocumentsRepo::fetch_by_id(pool, path.into_inner())
        .await?
        .ok_or(Error::NotFound("Document"))?;
    accessible_loan(pool, &user, document.loan_id).await?;

    if let Err(error) = store.remove(&document.file_path).await {
        tracing::warn!(error.cause_chain = ?error, document.id = %document.id, "Failed to remove stored file");
    }
    if !DocumentsRepo::delete(pool, document.id).await? {
        return Err(Error::NotFound("Document"));
    }

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::DocumentDeleted, origin)
            .description(format!("Document {} deleted", document.document_name))
            .resource(document.id)
            .loan(document.loan_id),
    )
    .await;

    Ok(HttpResponse::NoContent().finish())
}

/// Endpoints addressing a document directly.
/// Uploading and listing live under the loan they belong to.
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/documents")
        .service(detail)
        .service(verify)
        .service(remove)
}
