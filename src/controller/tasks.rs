use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, patch, post, web, HttpResponse};

use chrono::{DateTime, Utc};

use serde::Deserialize;
use serde_json::json;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Staff};
use crate::domain::{
    ActivityAction, NotificationKind, Page, PageQuery, TaskPriority, TaskStatus,
};
use crate::error::{Error, Result};
use crate::model::{NewActivity, NewNotification, NewTask, RequestOrigin, WorkflowTask};
use crate::repo::{TasksRepo, UsersRepo};

use super::loans::accessible_loan;
use super::{notify, page_window, record_activity, required};

const DEFAULT_PAGE_SIZE: i64 = 50;

async fn fetch_task(pool: &PgPool, task_id: Uuid) -> Result<WorkflowTask> {
    TasksRepo::fetch_by_id(pool, task_id)
        .await?
        .ok_or(Error::NotFound("Task"))
}

async fn notify_assignee(pool: &PgPool, task: &WorkflowTask, assignee: Uuid) {
    notify(
        pool,
        NewNotification {
            user_id: assignee,
            loan_id: Some(task.loan_id),
            kind: NotificationKind::TaskAssigned,
            subject: format!("New task: {}", task.title),
            body: task
                .description
                .clone()
                .unwrap_or_else(|| format!("You have been assigned the task \"{}\".", task.title)),
        },
    )
    .await;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    loan_id: Option<Uuid>,
    task_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    assigned_to_id: Option<Uuid>,
    due_date: Option<DateTime<Utc>>,
    priority: Option<String>,
}

#[tracing::instrument(name = "Create task", skip(body, pool, origin), fields(user.id = %staff.id))]
#[post("")]
async fn create(
    Staff(staff): Staff,
    body: web::Json<CreateTaskBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();

    let non_blank = |value: Option<String>| {
        value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let (loan_id, task_type, title) = match (
        body.loan_id,
        non_blank(body.task_type),
        non_blank(body.title),
    ) {
        (Some(loan_id), Some(task_type), Some(title)) => (loan_id, task_type, title),
        _ => {
            return Err(Error::validation(
                "Loan id, task type, and title are required",
            ))
        }
    };
    let priority = body
        .priority
        .map(|priority| priority.parse::<TaskPriority>())
        .transpose()
        .map_err(Error::validation)?
        .unwrap_or_default();

    let loan = accessible_loan(pool, &staff, loan_id).await?;
    if let Some(assignee) = body.assigned_to_id {
        UsersRepo::fetch_by_id(pool, assignee)
            .await?
            .ok_or(Error::NotFound("Assigned user"))?;
    }

    let new_task = NewTask {
        loan_id: loan.id,
        task_type,
        title,
        description: non_blank(body.description),
        assigned_to_id: body.assigned_to_id,
        priority,
        due_date: body.due_date,
    };
    let task = TasksRepo::insert(pool, &new_task).await?;

    record_activity(
        pool,
        NewActivity::new(staff.id, ActivityAction::TaskCreated, origin)
            .description(format!("Task \"{}\" created", task.title))
            .resource(task.id)
            .loan(task.loan_id),
    )
    .await;
    if let Some(assignee) = task.assigned_to_id {
        notify_assignee(pool, &task, assignee).await;
    }

    Ok(HttpResponse::Created().json(task))
}

#[tracing::instrument(name = "List my tasks", skip(query, pool), fields(user.id = %user.id))]
#[get("/my-tasks")]
async fn my_tasks(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let window = page_window(&query, DEFAULT_PAGE_SIZE)?;
    let (tasks, total) = TasksRepo::list_for_assignee(pool.get_ref(), user.id, window).await?;

    Ok(HttpResponse::Ok().json(Page::new(tasks, total, window)))
}

#[tracing::instrument(name = "List overdue tasks", skip(pool), fields(user.id = %staff.id))]
#[get("/overdue")]
async fn overdue(Staff(staff): Staff, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let tasks = TasksRepo::list_overdue(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[tracing::instrument(name = "Task statistics", skip(pool), fields(user.id = %staff.id))]
#[get("/stats")]
async fn stats(Staff(staff): Staff, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let counts = TasksRepo::stats(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(counts))
}

#[tracing::instrument(name = "List loan tasks", skip(query, pool), fields(user.id = %user.id))]
#[get("/loans/{loan_id}")]
async fn list_for_loan(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let window = page_window(&query, DEFAULT_PAGE_SIZE)?;
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let (tasks, total) = TasksRepo::list_for_loan(pool, loan.id, window).await?;

    Ok(HttpResponse::Ok().json(Page::new(tasks, total, window)))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    status: Option<String>,
}

#[tracing::instrument(name = "Update task status", skip(body, pool, origin), fields(user.id = %user.id))]
#[patch("/{task_id}/status")]
async fn update_status(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<StatusBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let status: TaskStatus = required(body.into_inner().status, "Status is required")?
        .parse()
        .map_err(Error::validation)?;

    let task = fetch_task(pool, path.into_inner()).await?;
    if !user.is_staff() && task.assigned_to_id != Some(user.id) {
        return Err(Error::Forbidden("Access denied".into()));
    }
    let updated = TasksRepo::update_status(pool, task.id, status)
        .await?
        .ok_or(Error::NotFound("Task"))?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::TaskStatusChanged, origin)
            .description(format!("Task \"{}\" status changed", updated.title))
            .resource(updated.id)
            .loan(updated.loan_id)
            .values(
                Some(json!({ "status": task.status })),
                Some(json!({ "status": updated.status })),
            ),
    )
    .await;

    Ok(HttpResponse::Ok().json(updated))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    user_id: Option<Uuid>,
}

#[tracing::instrument(name = "Assign task", skip(body, pool, origin), fields(user.id = %staff.id))]
#[patch("/{task_id}/assign")]
async fn assign(
    Staff(staff): Staff,
    path: web::Path<Uuid>,
    body: web::Json<AssignBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let assignee = required(body.into_inner().user_id, "User id is required")?;

    let task = fetch_task(pool, path.into_inner()).await?;
    UsersRepo::fetch_by_id(pool, assignee)
        .await?
        .ok_or(Error::NotFound("User"))?;
    let updated = TasksRepo::assign(pool, task.id, assignee)
        .await?
        .ok_or(Error::NotFound("Task"))?;

    record_activity(
        pool,
        NewActivity::new(staff.id, ActivityAction::TaskAssigned, origin)
            .description(format!("Task \"{}\" assigned", updated.title))
            .resource(updated.id)
            .loan(updated.loan_id)
            .values(
                Some(json!({ "assignedToId": task.assigned_to_id })),
                Some(json!({ "assignedToId": updated.assigned_to_id })),
            ),
    )
    .await;
    notify_assignee(pool, &updated, assignee).await;

    Ok(HttpResponse::Ok().json(updated))
}

#[tracing::instrument(name = "Delete task", skip(pool, origin), fields(user.id = %staff.id))]
#[delete("/{task_id}")]
async fn remove(
    Staff(staff): Staff,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let task = fetch_task(pool, path.into_inner()).await?;
    if !TasksRepo::delete(pool, task.id).await? {
        return Err(Error::NotFound("Task"));
    }

    record_activity(
        pool,
        NewActivity::new(staff.id, ActivityAction::TaskDeleted, origin)
            .description(format!("Task \"{}\" deleted", task.title))
            .resource(task.id)
            .loan(task.loan_id),
    )
    .await;

    Ok(HttpResponse::NoContent().finish())
}

/// Workflow task endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/tasks")
        .service(create)
        .service(my_tasks)
        .service(overdue)
        .service(stats)
        .service(list_for_loan)
        .service(update_status)
        .service(assign)
        .service(remove)
}
