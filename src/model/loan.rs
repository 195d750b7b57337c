use chrono::{DateTime, Utc};

use rust_decimal::Decimal;

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{LoanAmount, LoanPurpose, LoanStatus, LoanTerm};

use super::Borrower;

/// New loan application, validated and ready to store
#[derive(Debug)]
pub struct NewLoan {
    pub loan_number: String,
    pub created_by_id: Uuid,
    pub borrower_id: Uuid,
    pub program_id: Option<i32>,
    pub loan_officer_id: Option<Uuid>,
    pub amount: LoanAmount,
    pub term: LoanTerm,
    pub purpose: LoanPurpose,
    pub status: LoanStatus,
}

/// Changes to the editable fields of an application; `None` leaves a field as is
#[derive(Debug, Default)]
pub struct LoanChanges {
    pub amount: Option<LoanAmount>,
    pub term: Option<LoanTerm>,
    pub purpose: Option<LoanPurpose>,
    pub program_id: Option<i32>,
}

impl LoanChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.term.is_none()
            && self.purpose.is_none()
            && self.program_id.is_none()
    }

    /// Whether the changes touch what a loan program constrains
    pub fn affects_program_terms(&self) -> bool {
        self.amount.is_some() || self.term.is_some() || self.program_id.is_some()
    }
}

/// Stored loan application record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: Uuid,
    pub loan_number: String,
    pub created_by_id: Uuid,
    pub borrower_id: Uuid,
    pub program_id: Option<i32>,
    pub loan_officer_id: Option<Uuid>,
    pub loan_amount: Decimal,
    pub loan_term_months: i32,
    pub purpose: String,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One accepted workflow transition
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistory {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub from_status: LoanStatus,
    pub to_status: LoanStatus,
    pub reason: Option<String>,
    pub changed_by_id: Uuid,
    pub changed_at: DateTime<Utc>,
}

/// A loan together with its borrower and full status history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: LoanApplication,
    pub borrower: Borrower,
    pub status_history: Vec<StatusHistory>,
}
