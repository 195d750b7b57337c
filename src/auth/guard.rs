use std::future::{ready, Ready};

use actix_web::{dev, web, FromRequest, HttpRequest};

use uuid::Uuid;

use crate::domain::UserRole;
use crate::error::Error;

use super::{bearer_token, AuthConfig};

/// The caller, as identified by a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    fn from_http_request(req: &HttpRequest) -> Result<Self, Error> {
        // NOTE: Must be registered with the application at startup
        let config = req
            .app_data::<web::Data<AuthConfig>>()
            .ok_or_else(|| anyhow::anyhow!("AuthConfig not registered for application"))?;

        let token = bearer_token(req.headers()).map_err(|e| {
            tracing::debug!(error.cause_chain = ?e, "Rejected request without bearer token");
            Error::Authentication("Access token required".into())
        })?;

        let claims = config.keys.verify_access(token).map_err(|e| {
            tracing::debug!(error.cause_chain = ?e, "Rejected access token");
            Error::Forbidden("Invalid or expired token".into())
        })?;

        Ok(Self {
            id: claims.sub,
            email: claims.email,
            username: claims.username,
            role: claims.role,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(Self::from_http_request(req))
    }
}

/// An authenticated lender, underwriter or admin
#[derive(Debug, Clone)]
pub struct Staff(pub AuthenticatedUser);

impl FromRequest for Staff {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(require_role(req, UserRole::is_staff).map(Staff))
    }
}

/// An authenticated admin
#[derive(Debug, Clone)]
pub struct Admin(pub AuthenticatedUser);

impl FromRequest for Admin {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(require_role(req, |role| *role == UserRole::Admin).map(Admin))
    }
}

fn require_role(
    req: &HttpRequest,
    allowed: impl Fn(&UserRole) -> bool,
) -> Result<AuthenticatedUser, Error> {
    let user = AuthenticatedUser::from_http_request(req)?;
    if allowed(&user.role) {
        Ok(user)
    } else {
        tracing::warn!(user.id = %user.id, role = %user.role, "Insufficient role for endpoint");
        Err(Error::Forbidden("Insufficient permissions".into()))
    }
}
