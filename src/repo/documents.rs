use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::VerificationStatus;
use crate::model::{Document, NewDocument};

/// Repository for the `documents` table
pub struct DocumentsRepo;

impl DocumentsRepo {
    #[tracing::instrument("Insert document record", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_document: &NewDocument,
    ) -> sqlx::Result<Document> {
        sqlx::query_as::<_, Document>(
            "insert into documents(
                loan_id, document_type, document_name, file_path,
                file_size, mime_type, uploaded_by_id, is_required
             )
             values ($1, $2, $3, $4, $5, $6, $7, $8)
             returning *",
        )
        .bind(new_document.loan_id)
        .bind(new_document.document_type)
        .bind(&new_document.document_name)
        .bind(&new_document.file_path)
        .bind(new_document.file_size)
        .bind(&new_document.mime_type)
        .bind(new_document.uploaded_by_id)
        .bind(new_document.is_required)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch document by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Document>> {
        sqlx::query_as::<_, Document>("select * from documents where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Documents of a loan, newest first
    #[tracing::instrument("Fetch documents of loan", skip(executor))]
    pub async fn list_for_loan<'con>(
        executor: impl PgExecutor<'con>,
        loan_id: Uuid,
    ) -> sqlx::Result<Vec<Document>> {
        sqlx::query_as::<_, Document>(
            "select * from documents where loan_id=$1 order by uploaded_at desc",
        )
        .bind(loan_id)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Record document verification", skip(executor))]
    pub async fn verify<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        status: VerificationStatus,
        verified_by_id: Uuid,
        notes: Option<&str>,
    ) -> sqlx::Result<Option<Document>> {
        sqlx::query_as::<_, Document>(
            "update documents
             set verification_status=$2, verified_by_id=$3, verified_at=now(), notes=$4
             where id=$1
             returning *",
        )
        .bind(id)
        .bind(status)
        .bind(verified_by_id)
        .bind(notes)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument("Delete document record", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from documents where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
