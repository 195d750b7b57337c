use chrono::{DateTime, Utc};

use serde::Serialize;
use serde_json::Value;

use uuid::Uuid;

use crate::domain::ActivityAction;

/// Who performed a request, and from where
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// An audit record waiting to be written
#[derive(Debug)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub action: ActivityAction,
    pub description: Option<String>,
    pub resource_id: Option<String>,
    pub loan_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub origin: RequestOrigin,
}

impl NewActivity {
    pub fn new(user_id: Uuid, action: ActivityAction, origin: RequestOrigin) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            description: None,
            resource_id: None,
            loan_id: None,
            old_values: None,
            new_values: None,
            origin,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn resource(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn loan(mut self, loan_id: Uuid) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn values(mut self, old: Option<Value>, new: Option<Value>) -> Self {
        self.old_values = old;
        self.new_values = new;
        self
    }
}

/// Stored audit record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub description: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub loan_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
