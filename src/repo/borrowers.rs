use sqlx::PgExecutor;

use uuid::Uuid;

use crate::model::{Borrower, NewBorrower};

/// Repository for the `borrowers` table
pub struct BorrowersRepo;

impl BorrowersRepo {
    /// Insert a borrower, or return the existing record with the same email unchanged
    #[tracing::instrument("Upsert borrower", skip(executor, new_borrower))]
    pub async fn upsert<'con>(
        executor: impl PgExecutor<'con>,
        new_borrower: &NewBorrower,
    ) -> sqlx::Result<Borrower> {
        sqlx::query_as::<_, Borrower>(
            "insert into borrowers(
                email, first_name, last_name, employment_status,
                employer_name, annual_income, additional_income
             )
             values ($1, $2, $3, $4, $5, $6, $7)
             on conflict (email) do update set email=excluded.email
             returning *",
        )
        .bind(new_borrower.email.as_ref())
        .bind(new_borrower.first_name.as_ref())
        .bind(new_borrower.last_name.as_ref())
        .bind(new_borrower.employment_status)
        .bind(new_borrower.employer_name.as_deref())
        .bind(new_borrower.income.annual)
        .bind(new_borrower.income.additional)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch borrower by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Borrower>> {
        sqlx::query_as::<_, Borrower>("select * from borrowers where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
