use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Position of a loan application in the origination workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "loan_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Lead,
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Funded,
    Closed,
}

/// A workflow transition that the transition table does not allow
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("Cannot transition from {from} to {to}")]
pub struct IllegalTransition {
    pub from: LoanStatus,
    pub to: LoanStatus,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 8] = [
        Self::Lead,
        Self::Draft,
        Self::Submitted,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::Funded,
        Self::Closed,
    ];

    /// Statuses reachable from this one
    pub fn allowed_transitions(&self) -> &'static [LoanStatus] {
        use LoanStatus::*;

        match self {
            Lead => &[Draft, Submitted, Closed],
            Draft => &[Submitted, Closed],
            Submitted => &[UnderReview, Rejected, Draft],
            UnderReview => &[Approved, Rejected],
            Approved => &[Funded, Rejected],
            Rejected => &[Closed],
            Funded => &[Closed],
            Closed => &[],
        }
    }

    pub fn can_transition(&self, target: LoanStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Validate a move to `target`, returning the new status
    pub fn transition(self, target: LoanStatus) -> Result<LoanStatus, IllegalTransition> {
        if self.can_transition(target) {
            tracing::info!(from = %self, to = %target, "Workflow transition accepted");
            Ok(target)
        } else {
            tracing::warn!(from = %self, to = %target, "Invalid workflow transition");
            Err(IllegalTransition {
                from: self,
                to: target,
            })
        }
    }

    /// Whether the application fields may still be edited, and the application deleted
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Lead | Self::Draft)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Lead => "Application has been started on behalf of a prospective borrower",
            Self::Draft => "Application is being prepared",
            Self::Submitted => "Application has been submitted for review",
            Self::UnderReview => "Application is under review by underwriters",
            Self::Approved => "Application has been approved",
            Self::Rejected => "Application has been rejected",
            Self::Funded => "Loan has been funded",
            Self::Closed => "Application is closed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "LEAD",
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Funded => "FUNDED",
            Self::Closed => "CLOSED",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| format!("{} is not a valid loan status", value))
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
