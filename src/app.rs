use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{error, get, web, App, HttpRequest, HttpResponse, HttpServer, Responder};

use serde_json::json;

use sqlx::PgPool;

use tracing_actix_web::TracingLogger;

use crate::auth::AuthConfig;
use crate::client::EmailClient;
use crate::controller::documents::UploadLimit;
use crate::controller::{
    activities, auth, documents, loans, notifications, programs, tasks, users,
};
use crate::error::Error;
use crate::storage::FileStore;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Route not found" }))
}

// Malformed bodies, queries and paths are client errors like any other validation failure
fn json_error(err: error::JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    Error::validation(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    Error::validation(err.to_string()).into()
}

fn path_error(err: error::PathError, _: &HttpRequest) -> actix_web::Error {
    Error::validation(err.to_string()).into()
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    pool: PgPool,
    auth_config: AuthConfig,
    email_client: EmailClient,
    store: Arc<dyn FileStore>,
    max_upload_size: usize,
) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let auth_config = web::Data::new(auth_config);
    let email_client = web::Data::new(email_client);
    let store: web::Data<dyn FileStore> = web::Data::from(store);
    let upload_limit = web::Data::new(UploadLimit(max_upload_size));

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(pool.clone())
            .app_data(auth_config.clone())
            .app_data(email_client.clone())
            .app_data(store.clone())
            .app_data(upload_limit.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .app_data(web::PayloadConfig::new(max_upload_size))
            .service(health_check)
            .service(
                web::scope("/api")
                    .service(auth::scope())
                    .service(users::scope())
                    .service(loans::scope())
                    .service(documents::scope())
                    .service(programs::scope())
                    .service(tasks::scope())
                    .service(notifications::scope())
                    .service(activities::scope()),
            )
            .default_service(web::route().to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
