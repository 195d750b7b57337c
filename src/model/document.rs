use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{DocumentType, VerificationStatus};

#[derive(Debug)]
pub struct NewDocument {
    pub loan_id: Uuid,
    pub document_type: DocumentType,
    pub document_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by_id: Uuid,
    pub is_required: bool,
}

/// Metadata of a file attached to a loan application
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub document_type: DocumentType,
    pub document_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by_id: Uuid,
    pub is_required: bool,
    pub verification_status: VerificationStatus,
    pub verified_by_id: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}
