use sqlx::PgExecutor;

use crate::model::LoanProgram;

/// Repository for the read-only `loan_programs` catalogue
pub struct ProgramsRepo;

impl ProgramsRepo {
    #[tracing::instrument("Fetch active loan programs", skip(executor))]
    pub async fn list_active<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<LoanProgram>> {
        sqlx::query_as::<_, LoanProgram>(
            "select * from loan_programs where is_active order by program_name",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Fetch active loan programs by category", skip(executor))]
    pub async fn list_by_category<'con>(
        executor: impl PgExecutor<'con>,
        category: &str,
    ) -> sqlx::Result<Vec<LoanProgram>> {
        sqlx::query_as::<_, LoanProgram>(
            "select * from loan_programs
             where is_active and program_category=$1
             order by program_name",
        )
        .bind(category)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument("Fetch loan program by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: i32,
    ) -> sqlx::Result<Option<LoanProgram>> {
        sqlx::query_as::<_, LoanProgram>("select * from loan_programs where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
