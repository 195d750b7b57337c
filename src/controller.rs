pub mod activities;
pub mod auth;
pub mod documents;
pub mod loans;
pub mod notifications;
pub mod programs;
pub mod tasks;
pub mod users;

use std::future::{ready, Ready};

use actix_web::http::header;
use actix_web::{dev, FromRequest, HttpRequest};

use sqlx::PgPool;

use crate::domain::{PageQuery, Pagination};
use crate::error::{Error, Result};
use crate::model::{NewActivity, NewNotification, RequestOrigin};
use crate::repo::{ActivitiesRepo, NotificationsRepo};

impl FromRequest for RequestOrigin {
    type Error = Error;
    type Future = Ready<Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let ip_address = req
            .connection_info()
            .realip_remote_addr()
            .map(ToString::to_string);
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        ready(Ok(Self {
            ip_address,
            user_agent,
        }))
    }
}

/// Unwrap a field the request must carry
pub(crate) fn required<T>(value: Option<T>, message: &str) -> Result<T> {
    value.ok_or_else(|| Error::validation(message))
}

/// Resolve `?page=&limit=` into an offset window
pub(crate) fn page_window(query: &PageQuery, default_limit: i64) -> Result<Pagination> {
    Pagination::from_query(query, default_limit).map_err(Error::validation)
}

/// Append to the audit log. The request has already succeeded, so failures are only logged.
pub(crate) async fn record_activity(pool: &PgPool, activity: NewActivity) {
    if let Err(error) = ActivitiesRepo::insert(pool, &activity).await {
        tracing::error!(
            error.cause_chain = ?error,
            action = activity.action.as_str(),
            "Failed to record activity"
        );
    }
}

/// Raise a notification for a user; failures are only logged
pub(crate) async fn notify(pool: &PgPool, notification: NewNotification) {
    if let Err(error) = NotificationsRepo::insert(pool, &notification).await {
        tracing::error!(
            error.cause_chain = ?error,
            user.id = %notification.user_id,
            kind = notification.kind.as_str(),
            "Failed to create notification"
        );
    }
}
