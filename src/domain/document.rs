use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "document_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    IncomeStatement,
    TaxReturn,
    BankStatement,
    Identification,
    ProofOfAddress,
    PropertyAppraisal,
    Other,
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "INCOME_STATEMENT" => Ok(Self::IncomeStatement),
            "TAX_RETURN" => Ok(Self::TaxReturn),
            "BANK_STATEMENT" => Ok(Self::BankStatement),
            "IDENTIFICATION" => Ok(Self::Identification),
            "PROOF_OF_ADDRESS" => Ok(Self::ProofOfAddress),
            "PROPERTY_APPRAISAL" => Ok(Self::PropertyAppraisal),
            "OTHER" => Ok(Self::Other),
            _ => Err("Invalid document type".into()),
        }
    }
}

/// Outcome of a staff review of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "verification_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    NeedsReview,
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "VERIFIED" => Ok(Self::Verified),
            "REJECTED" => Ok(Self::Rejected),
            "NEEDS_REVIEW" => Ok(Self::NeedsReview),
            _ => Err("Invalid verification status".into()),
        }
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` so client file names are safe on disk
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Never produce a hidden file or a parent-directory reference
    sanitized.trim_start_matches('.').to_string()
}
