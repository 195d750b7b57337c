use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use clarifi::domain::UserRole;

use crate::helpers::{loan_body, TestApp, TestUser};

fn loan_path(loan: &Value, suffix: &str) -> String {
    format!("loans/{}{}", loan["id"].as_str().unwrap(), suffix)
}

#[sqlx::test]
async fn create_loan_starts_in_draft(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let loan = app.create_loan(&user).await;

    assert_eq!("DRAFT", loan["status"]);
    assert_eq!(25000.0, loan["loanAmount"].as_f64().unwrap());
    assert_eq!(36, loan["loanTermMonths"]);
    assert_eq!(user.id.to_string(), loan["createdById"]);
    // The only lender picks it up
    assert_eq!(lender.id.to_string(), loan["loanOfficerId"]);

    let number = loan["loanNumber"].as_str().unwrap();
    assert!(number.starts_with("LOAN-"));
    assert_eq!(20, number.len());

    Ok(())
}

#[sqlx::test]
async fn create_loan_validates_terms(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let mut body = loan_body(&user.email);
    body["amount"] = json!(500);
    body["term"] = json!(18);
    let res = app
        .api(Method::POST, "loans", &user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let errors: Value = res.json().await.unwrap();
    assert_eq!(2, errors["details"].as_array().unwrap().len());

    let mut body = loan_body(&user.email);
    body.as_object_mut().unwrap().remove("purpose");
    let res = app
        .api(Method::POST, "loans", &user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn create_loan_checks_the_program(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let programs: Vec<Value> = app
        .request(Method::GET, "api/loan-programs")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let personal = programs
        .iter()
        .find(|p| p["programCode"] == "PERSONAL-STD")
        .unwrap();

    let mut body = loan_body(&user.email);
    body["loanProgramId"] = personal["id"].clone();
    body["amount"] = json!(60000);
    let res = app
        .api(Method::POST, "loans", &user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    body["loanProgramId"] = json!(9999);
    let res = app
        .api(Method::POST, "loans", &user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    body["loanProgramId"] = personal["id"].clone();
    body["amount"] = json!(20000);
    let res = app
        .api(Method::POST, "loans", &user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    Ok(())
}

#[sqlx::test]
async fn loans_are_private_to_their_owner(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let owner = TestUser::create(&app, UserRole::Borrower).await;
    let other = TestUser::create(&app, UserRole::Borrower).await;
    let underwriter = TestUser::create(&app, UserRole::Underwriter).await;
    let loan = app.create_loan(&owner).await;
    app.create_loan(&other).await;

    let res = app
        .api(Method::GET, &loan_path(&loan, ""), &other)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = app
        .api(Method::GET, &loan_path(&loan, ""), &underwriter)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let detail: Value = res.json().await.unwrap();
    assert_eq!(owner.email, detail["borrower"]["email"]);
    assert_eq!(0, detail["statusHistory"].as_array().unwrap().len());

    let own: Vec<Value> = app
        .api(Method::GET, "loans", &owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, own.len());

    let all: Vec<Value> = app
        .api(Method::GET, "loans", &underwriter)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(2, all.len());

    let res = app
        .api(Method::GET, &format!("loans/{}", uuid::Uuid::new_v4()), &owner)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn borrowers_see_loans_made_for_them(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let borrower = TestUser::create(&app, UserRole::Borrower).await;

    let res = app
        .api(Method::POST, "loans", &lender)
        .json(&loan_body(&borrower.email))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    let loan: Value = res.json().await.unwrap();

    let res = app
        .api(Method::GET, &loan_path(&loan, ""), &borrower)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    Ok(())
}

#[sqlx::test]
async fn list_filters_by_status(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    app.create_loan(&user).await;
    app.api(Method::POST, &loan_path(&loan, "/submit"), &user)
        .send()
        .await
        .unwrap();

    let submitted: Vec<Value> = app
        .api(Method::GET, "loans?status=SUBMITTED", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, submitted.len());
    assert_eq!(loan["id"], submitted[0]["id"]);

    let res = app
        .api(Method::GET, "loans?status=PENDING", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn update_is_only_allowed_before_submission(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;

    let res = app
        .api(Method::PUT, &loan_path(&loan, ""), &user)
        .json(&json!({ "amount": 30000, "purpose": "Bathroom renovation" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let updated: Value = res.json().await.unwrap();
    assert_eq!(30000.0, updated["loanAmount"].as_f64().unwrap());
    assert_eq!("Bathroom renovation", updated["purpose"]);
    assert_eq!(36, updated["loanTermMonths"]);

    let res = app
        .api(Method::PUT, &loan_path(&loan, ""), &user)
        .json(&json!({ "term": 18 }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    app.api(Method::POST, &loan_path(&loan, "/submit"), &user)
        .send()
        .await
        .unwrap();

    let res = app
        .api(Method::PUT, &loan_path(&loan, ""), &user)
        .json(&json!({ "amount": 35000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    Ok(())
}

#[sqlx::test]
async fn closed_program_only_blocks_updates_to_its_terms(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let (program_id,): (i32,) =
        sqlx::query_as("select id from loan_programs where program_code='PERSONAL-STD'")
            .fetch_one(&app.pool)
            .await?;

    let mut body = loan_body(&user.email);
    body["loanProgramId"] = json!(program_id);
    let res = app
        .api(Method::POST, "loans", &user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    let loan: Value = res.json().await.unwrap();

    sqlx::query("update loan_programs set is_active=false where id=$1")
        .bind(program_id)
        .execute(&app.pool)
        .await?;

    let res = app
        .api(Method::PUT, &loan_path(&loan, ""), &user)
        .json(&json!({ "purpose": "Roof repair" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let updated: Value = res.json().await.unwrap();
    assert_eq!("Roof repair", updated["purpose"]);

    let res = app
        .api(Method::PUT, &loan_path(&loan, ""), &user)
        .json(&json!({ "amount": 30000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn submit_records_history_and_notifies_the_officer(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;

    let res = app
        .api(Method::POST, &loan_path(&loan, "/submit"), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let submitted: Value = res.json().await.unwrap();
    assert_eq!("SUBMITTED", submitted["status"]);

    let res = app
        .api(Method::POST, &loan_path(&loan, "/submit"), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let history: Vec<Value> = app
        .api(Method::GET, &loan_path(&loan, "/history"), &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, history.len());
    assert_eq!("DRAFT", history[0]["fromStatus"]);
    assert_eq!("SUBMITTED", history[0]["toStatus"]);

    let notifications: Value = app
        .api(Method::GET, "notifications", &lender)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, notifications["pagination"]["total"]);
    assert_eq!(
        "LOAN_SUBMITTED",
        notifications["data"][0]["notificationType"]
    );

    Ok(())
}

#[sqlx::test]
async fn transitions_follow_the_workflow(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let underwriter = TestUser::create(&app, UserRole::Underwriter).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    app.api(Method::POST, &loan_path(&loan, "/submit"), &user)
        .send()
        .await
        .unwrap();
    let transition = |who: &TestUser, status: &str| {
        app.api(Method::POST, &loan_path(&loan, "/transition"), who)
            .json(&json!({ "status": status, "reason": "Checked" }))
            .send()
    };

    let res = transition(&user, "UNDER_REVIEW").await.unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = transition(&underwriter, "FUNDED").await.unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = transition(&underwriter, "NOT_A_STATUS").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = transition(&underwriter, "UNDER_REVIEW").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let res = transition(&underwriter, "APPROVED").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let status: Value = app
        .api(Method::GET, &loan_path(&loan, "/status"), &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!("APPROVED", status["currentStatus"]);
    assert_eq!(json!(["FUNDED", "REJECTED"]), status["allowedTransitions"]);
    assert_eq!(3, status["history"].as_array().unwrap().len());
    assert_eq!("Checked", status["history"][2]["reason"]);

    // The creator hears about each staff decision
    let notifications: Value = app
        .api(Method::GET, "notifications/unread", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(2, notifications.as_array().unwrap().len());

    Ok(())
}

#[sqlx::test]
async fn delete_is_only_allowed_before_submission(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let draft = app.create_loan(&user).await;
    let submitted = app.create_loan(&user).await;
    app.api(Method::POST, &loan_path(&submitted, "/submit"), &user)
        .send()
        .await
        .unwrap();

    let res = app
        .api(Method::DELETE, &loan_path(&submitted, ""), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = app
        .api(Method::DELETE, &loan_path(&draft, ""), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = app
        .api(Method::GET, &loan_path(&draft, ""), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}
