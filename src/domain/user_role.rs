use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role a user acts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Borrower,
    Lender,
    Underwriter,
    Admin,
}

impl UserRole {
    /// Lenders, underwriters and admins work on every loan
    pub fn is_staff(&self) -> bool {
        !matches!(self, Self::Borrower)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrower => "BORROWER",
            Self::Lender => "LENDER",
            Self::Underwriter => "UNDERWRITER",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_uppercase().as_str() {
            "BORROWER" => Ok(Self::Borrower),
            "LENDER" => Ok(Self::Lender),
            "UNDERWRITER" => Ok(Self::Underwriter),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("{} is not a valid role", other)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
