use chrono::{DateTime, Utc};

use rust_decimal::Decimal;

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{EmailAddress, EmploymentStatus, Income, PersonName};

#[derive(Debug)]
pub struct NewBorrower {
    pub email: EmailAddress,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub employment_status: EmploymentStatus,
    pub employer_name: Option<String>,
    pub income: Income,
}

/// The person a loan application is made for
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Borrower {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub employment_status: EmploymentStatus,
    pub employer_name: Option<String>,
    pub annual_income: Decimal,
    pub additional_income: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
