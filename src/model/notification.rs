use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{NotificationKind, NotificationStatus};

#[derive(Debug)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub loan_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

/// A message shown to a single user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_id: Option<Uuid>,
    pub notification_type: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
