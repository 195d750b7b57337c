use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::LoanStatus;
use crate::model::{LoanApplication, LoanChanges, NewLoan, StatusCount};

/// Repository for the `loan_applications` table
pub struct LoansRepo;

impl LoansRepo {
    #[tracing::instrument("Insert a new loan application", skip(executor, new_loan))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_loan: &NewLoan,
    ) -> sqlx::Result<LoanApplication> {
        sqlx::query_as::<_, LoanApplication>(
            "insert into loan_applications(
                loan_number, created_by_id, borrower_id, program_id, loan_officer_id,
                loan_amount, loan_term_months, purpose, status
             )
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             returning *",
        )
        .bind(&new_loan.loan_number)
        .bind(new_loan.created_by_id)
        .bind(new_loan.borrower_id)
        .bind(new_loan.program_id)
        .bind(new_loan.loan_officer_id)
        .bind(new_loan.amount.value())
        .bind(new_loan.term.months())
        .bind(new_loan.purpose.as_ref())
        .bind(new_loan.status)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch loan application by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<LoanApplication>> {
        sqlx::query_as::<_, LoanApplication>("select * from loan_applications where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Applications the user created, or that were made for their email, newest first
    #[tracing::instrument("Fetch loan applications of user", skip(executor))]
    pub async fn list_for_user<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
        email: &str,
        status: Option<LoanStatus>,
    ) -> sqlx::Result<Vec<LoanApplication>> {
        sqlx::query_as::<_, LoanApplication>(
            "select l.* from loan_applications l
             join borrowers b on b.id=l.borrower_id
             where (l.created_by_id=$1 or b.email=$2)
               and ($3::loan_status is null or l.status=$3)
             order by l.created_at desc",
        )
        .bind(user_id)
        .bind(email)
        .bind(status)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Fetch all loan applications", skip(executor))]
    pub async fn list_all<'con>(
        executor: impl PgExecutor<'con>,
        status: Option<LoanStatus>,
    ) -> sqlx::Result<Vec<LoanApplication>> {
        sqlx::query_as::<_, LoanApplication>(
            "select * from loan_applications
             where ($1::loan_status is null or status=$1)
             order by created_at desc",
        )
        .bind(status)
        .fetch_all(executor)
        .await
    }

    /// Apply `changes` while the application is still editable.
    /// Returns `None` when the application is missing or no longer editable.
    #[tracing::instrument("Update loan application", skip(executor))]
    pub async fn update_editable<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        changes: &LoanChanges,
    ) -> sqlx::Result<Option<LoanApplication>> {
        sqlx::query_as::<_, LoanApplication>(
            "update loan_applications set
                loan_amount=coalesce($2, loan_amount),
                loan_term_months=coalesce($3, loan_term_months),
                purpose=coalesce($4, purpose),
                program_id=coalesce($5, program_id)
             where id=$1 and status in ('LEAD', 'DRAFT')
             returning *",
        )
        .bind(id)
        .bind(changes.amount.map(|a| a.value()))
        .bind(changes.term.map(|t| t.months()))
        .bind(changes.purpose.as_ref().map(AsRef::<str>::as_ref))
        .bind(changes.program_id)
        .fetch_optional(executor)
        .await
    }

    /// Move the application from `from` to `to`.
    /// Returns `None` when its status is no longer `from`.
    #[tracing::instrument("Update loan application status", skip(executor))]
    pub async fn update_status<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        from: LoanStatus,
        to: LoanStatus,
    ) -> sqlx::Result<Option<LoanApplication>> {
        sqlx::query_as::<_, LoanApplication>(
            "update loan_applications set status=$3 where id=$1 and status=$2 returning *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await
    }

    /// Delete the application while it is still editable
    #[tracing::instrument("Delete loan application", skip(executor))]
    pub async fn delete_editable<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "delete from loan_applications where id=$1 and status in ('LEAD', 'DRAFT')",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument("Count loan applications of program", skip(executor))]
    pub async fn count_for_program<'con>(
        executor: impl PgExecutor<'con>,
        program_id: i32,
    ) -> sqlx::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("select count(*) from loan_applications where program_id=$1")
                .bind(program_id)
                .fetch_one(executor)
                .await?;
        Ok(count)
    }

    #[tracing::instrument("Count loan applications of program by status", skip(executor))]
    pub async fn status_counts_for_program<'con>(
        executor: impl PgExecutor<'con>,
        program_id: i32,
    ) -> sqlx::Result<Vec<StatusCount>> {
        sqlx::query_as::<_, StatusCount>(
            "select status, count(*) as count from loan_applications
             where program_id=$1
             group by status
             order by status",
        )
        .bind(program_id)
        .fetch_all(executor)
        .await
    }
}
