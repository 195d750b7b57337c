use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{TaskPriority, TaskStatus};

#[derive(Debug)]
pub struct NewTask {
    pub loan_id: Uuid,
    pub task_type: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
}

/// A unit of work on a loan application
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTask {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub task_type: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Number of tasks in each status
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
}
