use chrono::{Duration, Utc};

use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use clarifi::domain::UserRole;

use crate::helpers::{TestApp, TestUser};

async fn create_task(app: &TestApp, staff: &TestUser, body: &Value) -> reqwest::Response {
    app.api(Method::POST, "tasks", staff)
        .json(body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[sqlx::test]
async fn staff_assign_tasks_and_assignees_are_notified(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;

    let res = create_task(
        &app,
        &lender,
        &json!({
            "loanId": loan["id"],
            "taskType": "DOCUMENT_REQUEST",
            "title": "Upload bank statements",
            "assignedToId": user.id,
            "dueDate": (Utc::now() + Duration::days(3)).to_rfc3339(),
            "priority": "high",
        }),
    )
    .await;
    assert_eq!(StatusCode::CREATED, res.status());
    let task: Value = res.json().await.unwrap();
    assert_eq!("PENDING", task["status"]);
    assert_eq!("HIGH", task["priority"]);

    let mine: Value = app
        .api(Method::GET, "tasks/my-tasks", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, mine["pagination"]["total"]);
    assert_eq!(task["id"], mine["data"][0]["id"]);

    let notifications: Vec<Value> = app
        .api(Method::GET, "notifications/unread", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, notifications.len());
    assert_eq!("TASK_ASSIGNED", notifications[0]["notificationType"]);

    Ok(())
}

#[sqlx::test]
async fn create_task_validates_input(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;

    let res = create_task(&app, &user, &json!({ "loanId": loan["id"], "taskType": "X", "title": "Y" })).await;
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = create_task(&app, &lender, &json!({ "loanId": loan["id"], "title": "Y" })).await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = create_task(
        &app,
        &lender,
        &json!({ "loanId": uuid::Uuid::new_v4(), "taskType": "X", "title": "Y" }),
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let res = create_task(
        &app,
        &lender,
        &json!({
            "loanId": loan["id"],
            "taskType": "X",
            "title": "Y",
            "assignedToId": uuid::Uuid::new_v4(),
        }),
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn assignees_update_status(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let other = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    let task: Value = create_task(
        &app,
        &lender,
        &json!({
            "loanId": loan["id"],
            "taskType": "REVIEW",
            "title": "Confirm address",
            "assignedToId": user.id,
        }),
    )
    .await
    .json()
    .await
    .unwrap();
    let status_path = format!("tasks/{}/status", task["id"].as_str().unwrap());
    let update = |who: &TestUser, status: &str| {
        app.api(Method::PATCH, &status_path, who)
            .json(&json!({ "status": status }))
            .send()
    };

    let res = update(&other, "COMPLETED").await.unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = update(&user, "DONE").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = update(&user, "COMPLETED").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let completed: Value = res.json().await.unwrap();
    assert!(completed["completedAt"].is_string());

    // Completed tasks leave the assignee's list
    let mine: Value = app
        .api(Method::GET, "tasks/my-tasks", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(0, mine["pagination"]["total"]);

    let res = update(&lender, "IN_PROGRESS").await.unwrap();
    let reopened: Value = res.json().await.unwrap();
    assert!(reopened["completedAt"].is_null());

    let stats: Value = app
        .api(Method::GET, "tasks/stats", &lender)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, stats["total"]);
    assert_eq!(1, stats["inProgress"]);

    Ok(())
}

#[sqlx::test]
async fn overdue_and_loan_listings(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    for (title, days) in [("Late", -2), ("Upcoming", 2)] {
        create_task(
            &app,
            &lender,
            &json!({
                "loanId": loan["id"],
                "taskType": "FOLLOW_UP",
                "title": title,
                "dueDate": (Utc::now() + Duration::days(days)).to_rfc3339(),
            }),
        )
        .await;
    }

    let overdue: Vec<Value> = app
        .api(Method::GET, "tasks/overdue", &lender)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, overdue.len());
    assert_eq!("Late", overdue[0]["title"]);

    let res = app
        .api(Method::GET, "tasks/overdue", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let loan_tasks_path = format!("tasks/loans/{}", loan["id"].as_str().unwrap());
    let page: Value = app
        .api(Method::GET, &format!("{}?limit=1", loan_tasks_path), &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(2, page["pagination"]["total"]);
    assert_eq!(2, page["pagination"]["pages"]);
    assert_eq!(1, page["data"].as_array().unwrap().len());

    let res = app
        .api(Method::GET, &format!("{}?limit=0", loan_tasks_path), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = app
        .api(
            Method::GET,
            "tasks/my-tasks?page=9223372036854775807&limit=100",
            &user,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn staff_reassign_and_delete_tasks(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let underwriter = TestUser::create(&app, UserRole::Underwriter).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let loan = app.create_loan(&user).await;
    let task: Value = create_task(
        &app,
        &lender,
        &json!({ "loanId": loan["id"], "taskType": "REVIEW", "title": "Underwrite" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let task_path = format!("tasks/{}", task["id"].as_str().unwrap());

    let res = app
        .api(Method::PATCH, &format!("{}/assign", task_path), &lender)
        .json(&json!({ "userId": underwriter.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let assigned: Value = res.json().await.unwrap();
    assert_eq!(underwriter.id.to_string(), assigned["assignedToId"]);

    let res = app
        .api(Method::DELETE, &task_path, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = app
        .api(Method::DELETE, &task_path, &lender)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = app
        .api(Method::PATCH, &format!("{}/assign", task_path), &lender)
        .json(&json!({ "userId": underwriter.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}
