use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "notification_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Opened,
}

/// Kinds of notification the service raises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    LoanSubmitted,
    LoanStatusChanged,
    TaskAssigned,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoanSubmitted => "LOAN_SUBMITTED",
            Self::LoanStatusChanged => "LOAN_STATUS_CHANGED",
            Self::TaskAssigned => "TASK_ASSIGNED",
        }
    }
}
