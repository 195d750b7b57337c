use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::LoanStatus;
use crate::model::StatusHistory;

/// Repository for the append-only `loan_status_history` table
pub struct StatusHistoryRepo;

impl StatusHistoryRepo {
    #[tracing::instrument("Insert status history entry", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        loan_id: Uuid,
        from: LoanStatus,
        to: LoanStatus,
        reason: Option<&str>,
        changed_by_id: Uuid,
    ) -> sqlx::Result<StatusHistory> {
        sqlx::query_as::<_, StatusHistory>(
            "insert into loan_status_history(loan_id, from_status, to_status, reason, changed_by_id)
             values ($1, $2, $3, $4, $5)
             returning *",
        )
        .bind(loan_id)
        .bind(from)
        .bind(to)
        .bind(reason)
        .bind(changed_by_id)
        .fetch_one(executor)
        .await
    }

    /// Every transition of a loan, oldest first
    #[tracing::instrument("Fetch status history of loan", skip(executor))]
    pub async fn list_for_loan<'con>(
        executor: impl PgExecutor<'con>,
        loan_id: Uuid,
    ) -> sqlx::Result<Vec<StatusHistory>> {
        sqlx::query_as::<_, StatusHistory>(
            "select * from loan_status_history where loan_id=$1 order by changed_at, id",
        )
        .bind(loan_id)
        .fetch_all(executor)
        .await
    }
}
