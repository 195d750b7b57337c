use reqwest::{header, Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use clarifi::domain::UserRole;

use crate::helpers::{TestApp, TestUser, MAX_UPLOAD};

async fn upload(
    app: &TestApp,
    user: &TestUser,
    loan: &Value,
    query: &str,
    contents: Vec<u8>,
) -> reqwest::Response {
    app.api(
        Method::POST,
        &format!("loans/{}/documents?{}", loan["id"].as_str().unwrap(), query),
        user,
    )
    .header(header::CONTENT_TYPE, "application/pdf")
    .body(contents)
    .send()
    .await
    .expect("Failed to execute request")
}

const PAYSTUB: &str = "documentType=INCOME_STATEMENT&documentName=pay%20stub%20(march).pdf&isRequired=true";

#[sqlx::test]
async fn upload_stores_the_file_and_its_metadata(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;

    let res = upload(&app, &user, &loan, PAYSTUB, b"%PDF-1.4 test".to_vec()).await;

    assert_eq!(StatusCode::CREATED, res.status());
    let document: Value = res.json().await.unwrap();
    assert_eq!("INCOME_STATEMENT", document["documentType"]);
    assert_eq!("pay stub (march).pdf", document["documentName"]);
    assert_eq!("application/pdf", document["mimeType"]);
    assert_eq!(13, document["fileSize"]);
    assert_eq!(true, document["isRequired"]);
    assert_eq!("PENDING", document["verificationStatus"]);

    let file_path = document["filePath"].as_str().unwrap();
    assert!(file_path.ends_with("-pay_stub__march_.pdf"));
    assert_eq!(b"%PDF-1.4 test".to_vec(), std::fs::read(file_path).unwrap());

    let listed: Vec<Value> = app
        .api(
            Method::GET,
            &format!("loans/{}/documents", loan["id"].as_str().unwrap()),
            &user,
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, listed.len());

    Ok(())
}

#[sqlx::test]
async fn upload_rejects_bad_requests(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;

    let res = upload(&app, &user, &loan, PAYSTUB, Vec::new()).await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("No file uploaded", body["message"]);

    let res = upload(&app, &user, &loan, PAYSTUB, vec![b'x'; MAX_UPLOAD + 1]).await;
    assert_eq!(StatusCode::PAYLOAD_TOO_LARGE, res.status());

    let res = upload(
        &app,
        &user,
        &loan,
        "documentType=PAYSLIP&documentName=a.pdf",
        b"data".to_vec(),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = upload(
        &app,
        &user,
        &loan,
        "documentType=TAX_RETURN",
        b"data".to_vec(),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let missing = json!({ "id": uuid::Uuid::new_v4().to_string() });
    let res = upload(&app, &user, &missing, PAYSTUB, b"data".to_vec()).await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn strangers_cannot_upload(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let owner = TestUser::create(&app, UserRole::Borrower).await;
    let stranger = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&owner).await;

    let res = upload(&app, &stranger, &loan, PAYSTUB, b"data".to_vec()).await;

    assert_eq!(StatusCode::FORBIDDEN, res.status());
    Ok(())
}

#[sqlx::test]
async fn only_staff_verify_documents(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let underwriter = TestUser::create(&app, UserRole::Underwriter).await;
    let loan = app.create_loan(&user).await;
    let document: Value = upload(&app, &user, &loan, PAYSTUB, b"data".to_vec())
        .await
        .json()
        .await
        .unwrap();
    let verify_path = format!("documents/{}/verify", document["id"].as_str().unwrap());

    let res = app
        .api(Method::POST, &verify_path, &user)
        .json(&json!({ "verificationStatus": "VERIFIED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = app
        .api(Method::POST, &verify_path, &underwriter)
        .json(&json!({ "verificationStatus": "APPROVED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = app
        .api(Method::POST, &verify_path, &underwriter)
        .json(&json!({ "verificationStatus": "VERIFIED", "notes": "Matches employer records" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let verified: Value = res.json().await.unwrap();
    assert_eq!("VERIFIED", verified["verificationStatus"]);
    assert_eq!(underwriter.id.to_string(), verified["verifiedById"]);
    assert!(verified["verifiedAt"].is_string());

    Ok(())
}

#[sqlx::test]
async fn delete_removes_row_and_file(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    let document: Value = upload(&app, &user, &loan, PAYSTUB, b"data".to_vec())
        .await
        .json()
        .await
        .unwrap();
    let document_path = format!("documents/{}", document["id"].as_str().unwrap());

    let res = app
        .api(Method::DELETE, &document_path, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());
    assert!(!std::path::Path::new(document["filePath"].as_str().unwrap()).exists());

    let res = app
        .api(Method::GET, &document_path, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn deleting_a_loan_removes_its_files(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    let document: Value = upload(&app, &user, &loan, PAYSTUB, b"data".to_vec())
        .await
        .json()
        .await
        .unwrap();

    let res = app
        .api(
            Method::DELETE,
            &format!("loans/{}", loan["id"].as_str().unwrap()),
            &user,
        )
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, res.status());
    assert!(!std::path::Path::new(document["filePath"].as_str().unwrap()).exists());
    Ok(())
}
