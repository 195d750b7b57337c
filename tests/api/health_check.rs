use serde_json::Value;

use sqlx::PgPool;

use reqwest::Method;

use crate::helpers::TestApp;

#[sqlx::test]
async fn is_present(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.health_check().await.expect("Failed to execute request");

    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!("ok", body["status"]);

    Ok(())
}

#[sqlx::test]
async fn unknown_routes_are_json_404s(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .request(Method::GET, "api/nothing-here")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, res.status().as_u16());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Route not found", body["error"]);

    Ok(())
}
