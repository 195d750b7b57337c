use chrono::{DateTime, Utc};

use rust_decimal::Decimal;

use serde::Serialize;

use crate::domain::LoanStatus;

/// Catalogue entry describing a kind of loan on offer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoanProgram {
    pub id: i32,
    pub program_code: String,
    pub program_name: String,
    pub program_category: String,
    pub description: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub min_term_months: i32,
    pub max_term_months: i32,
    pub requirements: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl LoanProgram {
    /// Whether a request for `amount` over `term_months` fits this program
    pub fn accepts(&self, amount: Decimal, term_months: i32) -> Result<(), String> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(format!(
                "Loan amount must be between {} and {} for {}",
                self.min_amount, self.max_amount, self.program_name
            ));
        }
        if term_months < self.min_term_months || term_months > self.max_term_months {
            return Err(format!(
                "Loan term must be between {} and {} months for {}",
                self.min_term_months, self.max_term_months, self.program_name
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: LoanStatus,
    pub count: i64,
}
