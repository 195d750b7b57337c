use chrono::{DateTime, Utc};

use uuid::Uuid;

/// Stored refresh-token session
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Hex SHA-256 of the refresh token, the token itself is never stored
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
