use sqlx::{PgExecutor, PgPool};

use uuid::Uuid;

use crate::domain::{Pagination, TaskStatus};
use crate::model::{NewTask, TaskStats, WorkflowTask};

/// Repository for the `workflow_tasks` table
pub struct TasksRepo;

impl TasksRepo {
    #[tracing::instrument("Insert workflow task", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_task: &NewTask,
    ) -> sqlx::Result<WorkflowTask> {
        sqlx::query_as::<_, WorkflowTask>(
            "insert into workflow_tasks(
                loan_id, task_type, title, description, assigned_to_id, priority, due_date
             )
             values ($1, $2, $3, $4, $5, $6, $7)
             returning *",
        )
        .bind(new_task.loan_id)
        .bind(&new_task.task_type)
        .bind(&new_task.title)
        .bind(new_task.description.as_deref())
        .bind(new_task.assigned_to_id)
        .bind(new_task.priority)
        .bind(new_task.due_date)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch workflow task by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<WorkflowTask>> {
        sqlx::query_as::<_, WorkflowTask>("select * from workflow_tasks where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// A page of a loan's tasks, newest first, with the total count
    #[tracing::instrument("Fetch tasks of loan", skip(pool))]
    pub async fn list_for_loan(
        pool: &PgPool,
        loan_id: Uuid,
        window: Pagination,
    ) -> sqlx::Result<(Vec<WorkflowTask>, i64)> {
        let (total,): (i64,) =
            sqlx::query_as("select count(*) from workflow_tasks where loan_id=$1")
                .bind(loan_id)
                .fetch_one(pool)
                .await?;
        let tasks = sqlx::query_as::<_, WorkflowTask>(
            "select * from workflow_tasks where loan_id=$1
             order by created_at desc
             offset $2 limit $3",
        )
        .bind(loan_id)
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(pool)
        .await?;
        Ok((tasks, total))
    }

    /// A page of the open tasks assigned to a user, earliest due date first
    #[tracing::instrument("Fetch tasks of assignee", skip(pool))]
    pub async fn list_for_assignee(
        pool: &PgPool,
        user_id: Uuid,
        window: Pagination,
    ) -> sqlx::Result<(Vec<WorkflowTask>, i64)> {
        let (total,): (i64,) = sqlx::query_as(
            "select count(*) from workflow_tasks
             where assigned_to_id=$1 and status <> 'COMPLETED'",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        let tasks = sqlx::query_as::<_, WorkflowTask>(
            "select * from workflow_tasks
             where assigned_to_id=$1 and status <> 'COMPLETED'
             order by due_date asc nulls last, created_at
             offset $2 limit $3",
        )
        .bind(user_id)
        .bind(window.skip)
        .bind(window.take)
        .fetch_all(pool)
        .await?;
        Ok((tasks, total))
    }

    /// Unfinished tasks whose due date has passed
    #[tracing::instrument("Fetch overdue tasks", skip(executor))]
    pub async fn list_overdue<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<WorkflowTask>> {
        sqlx::query_as::<_, WorkflowTask>(
            "select * from workflow_tasks
             where due_date < now() and status <> 'COMPLETED'
             order by due_date",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Count tasks by status", skip(executor))]
    pub async fn stats<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<TaskStats> {
        let rows: Vec<(TaskStatus, i64)> =
            sqlx::query_as("select status, count(*) from workflow_tasks group by status")
                .fetch_all(executor)
                .await?;

        let mut stats = TaskStats::default();
        for (status, count) in rows {
            stats.total += count;
            match status {
                TaskStatus::Pending => stats.pending = count,
                TaskStatus::InProgress => stats.in_progress = count,
                TaskStatus::Completed => stats.completed = count,
                TaskStatus::Cancelled => stats.cancelled = count,
            }
        }
        Ok(stats)
    }

    /// Set the task status; completion time is kept only while COMPLETED
    #[tracing::instrument("Update task status", skip(executor))]
    pub async fn update_status<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        status: TaskStatus,
    ) -> sqlx::Result<Option<WorkflowTask>> {
        sqlx::query_as::<_, WorkflowTask>(
            "update workflow_tasks
             set status=$2,
                 completed_at=case
                     when $2='COMPLETED'::task_status then coalesce(completed_at, now())
                     else null
                 end
             where id=$1
             returning *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument("Assign task", skip(executor))]
    pub async fn assign<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<WorkflowTask>> {
        sqlx::query_as::<_, WorkflowTask>(
            "update workflow_tasks set assigned_to_id=$2 where id=$1 returning *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument("Delete task", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from workflow_tasks where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
