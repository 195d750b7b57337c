use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse};

use chrono::{DateTime, Utc};

use rust_decimal::Decimal;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Staff};
use crate::domain::{
    generate_loan_number, ActivityAction, EmailAddress, EmploymentStatus, Income, LoanAmount,
    LoanPurpose, LoanStatus, LoanTerm, NotificationKind, PersonName, UserRole,
};
use crate::error::{Error, Result};
use crate::model::{
    LoanApplication, LoanChanges, LoanDetail, NewActivity, NewBorrower, NewLoan, NewNotification,
    RequestOrigin, StatusHistory,
};
use crate::repo::{
    BorrowersRepo, DocumentsRepo, LoansRepo, ProgramsRepo, StatusHistoryRepo, UsersRepo,
};
use crate::storage::FileStore;

use super::{documents, notify, record_activity, required};

/// Fetch a loan the caller may work on.
/// Staff see every loan; anyone else must have created it or be its borrower.
pub(crate) async fn accessible_loan(
    pool: &PgPool,
    user: &AuthenticatedUser,
    loan_id: Uuid,
) -> Result<LoanApplication> {
    let loan = LoansRepo::fetch_by_id(pool, loan_id)
        .await?
        .ok_or(Error::NotFound("Loan application"))?;

    if user.is_staff() || loan.created_by_id == user.id {
        return Ok(loan);
    }
    let borrower = BorrowersRepo::fetch_by_id(pool, loan.borrower_id).await?;
    match borrower {
        Some(borrower) if borrower.email.eq_ignore_ascii_case(&user.email) => Ok(loan),
        _ => {
            tracing::warn!(user.id = %user.id, loan.id = %loan.id, "Denied access to loan");
            Err(Error::Forbidden("Access denied".into()))
        }
    }
}

/// Move a loan through the workflow, recording the history row in the same transaction
async fn apply_transition(
    pool: &PgPool,
    loan: &LoanApplication,
    target: LoanStatus,
    reason: Option<&str>,
    changed_by: Uuid,
) -> Result<LoanApplication> {
    let target = loan
        .status
        .transition(target)
        .map_err(|e| Error::Conflict(e.to_string()))?;

    let mut tx = pool.begin().await?;
    // Somebody else moved the loan first
    let updated = LoansRepo::update_status(&mut *tx, loan.id, loan.status, target)
        .await?
        .ok_or_else(|| Error::Conflict("Loan status changed concurrently".into()))?;
    StatusHistoryRepo::insert(&mut *tx, loan.id, loan.status, target, reason, changed_by).await?;
    tx.commit().await?;

    Ok(updated)
}

/// Check a requested program exists, is open, and covers the amount and term
async fn check_program(pool: &PgPool, program_id: i32, amount: Decimal, term: i32) -> Result<()> {
    let program = ProgramsRepo::fetch_by_id(pool, program_id)
        .await?
        .ok_or(Error::NotFound("Loan program"))?;
    if !program.is_active {
        return Err(Error::validation("Loan program is not active"));
    }
    program.accepts(amount, term).map_err(Error::validation)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanBody {
    amount: Option<Decimal>,
    term: Option<i32>,
    purpose: Option<String>,
    employment_status: Option<EmploymentStatus>,
    employer_name: Option<String>,
    annual_income: Option<Decimal>,
    additional_income: Option<Decimal>,
    borrower_email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    loan_program_id: Option<i32>,
}

#[tracing::instrument(name = "Create loan application", skip(body, pool, origin), fields(user.id = %user.id))]
#[post("")]
async fn create(
    user: AuthenticatedUser,
    body: web::Json<CreateLoanBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();

    let (amount, term, purpose, employment_status, annual_income, borrower_email) = match (
        body.amount,
        body.term,
        body.purpose,
        body.employment_status,
        body.annual_income,
        body.borrower_email,
    ) {
        (Some(a), Some(t), Some(p), Some(e), Some(i), Some(b)) => (a, t, p, e, i, b),
        _ => return Err(Error::validation("Missing required fields")),
    };

    let mut reasons = Vec::new();
    let amount = LoanAmount::parse(amount).map_err(|e| reasons.push(e)).ok();
    let term = LoanTerm::parse(term).map_err(|e| reasons.push(e)).ok();
    let purpose = LoanPurpose::parse(&purpose).map_err(|e| reasons.push(e)).ok();
    let income = Income::parse(annual_income, body.additional_income)
        .map_err(|e| reasons.push(e))
        .ok();
    let email = borrower_email
        .parse::<EmailAddress>()
        .map_err(|e| reasons.push(e))
        .ok();
    let first_name = body
        .first_name
        .as_deref()
        .unwrap_or("Unknown")
        .parse::<PersonName>()
        .map_err(|e| reasons.push(e))
        .ok();
    let last_name = body
        .last_name
        .as_deref()
        .unwrap_or("User")
        .parse::<PersonName>()
        .map_err(|e| reasons.push(e))
        .ok();

    let (amount, term, purpose, income, email, first_name, last_name) =
        match (amount, term, purpose, income, email, first_name, last_name) {
            (Some(a), Some(t), Some(p), Some(i), Some(e), Some(f), Some(l))
                if reasons.is_empty() =>
            {
                (a, t, p, i, e, f, l)
            }
            _ => return Err(Error::validation_with("Invalid loan application", reasons)),
        };

    if let Some(program_id) = body.loan_program_id {
        check_program(pool, program_id, amount.value(), term.months()).await?;
    }
    let loan_officer_id = UsersRepo::first_with_role(pool, UserRole::Lender).await?;

    let new_borrower = NewBorrower {
        email,
        first_name,
        last_name,
        employment_status,
        employer_name: body.employer_name.filter(|name| !name.trim().is_empty()),
        income,
    };

    let mut tx = pool.begin().await?;
    let borrower = BorrowersRepo::upsert(&mut *tx, &new_borrower).await?;
    let new_loan = NewLoan {
        loan_number: generate_loan_number(Utc::now()),
        created_by_id: user.id,
        borrower_id: borrower.id,
        program_id: body.loan_program_id,
        loan_officer_id,
        amount,
        term,
        purpose,
        status: LoanStatus::Draft,
    };
    let loan = LoansRepo::insert(&mut *tx, &new_loan).await?;
    tx.commit().await?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::LoanCreated, origin)
            .description(format!("Loan {} created", loan.loan_number))
            .resource(loan.id)
            .loan(loan.id)
            .values(
                None,
                Some(json!({ "amount": loan.loan_amount, "term": loan.loan_term_months })),
            ),
    )
    .await;
    tracing::info!(loan.id = %loan.id, loan.number = %loan.loan_number, "Created loan application");

    Ok(HttpResponse::Created().json(loan))
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    status: Option<String>,
}

#[tracing::instrument(name = "List loan applications", skip(query, pool), fields(user.id = %user.id))]
#[get("")]
async fn list(
    user: AuthenticatedUser,
    query: web::Query<StatusFilter>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let status = query
        .into_inner()
        .status
        .map(|status| status.parse::<LoanStatus>())
        .transpose()
        .map_err(Error::validation)?;

    let loans = if user.is_staff() {
        LoansRepo::list_all(pool, status).await?
    } else {
        LoansRepo::list_for_user(pool, user.id, &user.email, status).await?
    };

    Ok(HttpResponse::Ok().json(loans))
}

#[tracing::instrument(name = "Fetch loan application", skip(pool), fields(user.id = %user.id))]
#[get("/{id}")]
async fn detail(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;

    let borrower = BorrowersRepo::fetch_by_id(pool, loan.borrower_id)
        .await?
        .ok_or(Error::NotFound("Borrower"))?;
    let status_history = StatusHistoryRepo::list_for_loan(pool, loan.id).await?;

    Ok(HttpResponse::Ok().json(LoanDetail {
        loan,
        borrower,
        status_history,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoanBody {
    amount: Option<Decimal>,
    term: Option<i32>,
    purpose: Option<String>,
    loan_program_id: Option<i32>,
}

impl UpdateLoanBody {
    fn into_changes(self) -> Result<LoanChanges> {
        let mut reasons = Vec::new();
        let changes = LoanChanges {
            amount: self
                .amount
                .map(LoanAmount::parse)
                .transpose()
                .map_err(|e| reasons.push(e))
                .ok()
                .flatten(),
            term: self
                .term
                .map(LoanTerm::parse)
                .transpose()
                .map_err(|e| reasons.push(e))
                .ok()
                .flatten(),
            purpose: self
                .purpose
                .as_deref()
                .map(LoanPurpose::parse)
                .transpose()
                .map_err(|e| reasons.push(e))
                .ok()
                .flatten(),
            program_id: self.loan_program_id,
        };

        if !reasons.is_empty() {
            return Err(Error::validation_with("Invalid loan update", reasons));
        }
        if changes.is_empty() {
            return Err(Error::validation("No changes provided"));
        }
        Ok(changes)
    }
}

/// Old and new values of every changed field, for the audit log
fn changed_values(before: &LoanApplication, after: &LoanApplication) -> (Value, Value) {
    let mut old = Map::new();
    let mut new = Map::new();
    if before.loan_amount != after.loan_amount {
        old.insert("amount".into(), json!(before.loan_amount));
        new.insert("amount".into(), json!(after.loan_amount));
    }
    if before.loan_term_months != after.loan_term_months {
        old.insert("term".into(), json!(before.loan_term_months));
        new.insert("term".into(), json!(after.loan_term_months));
    }
    if before.purpose != after.purpose {
        old.insert("purpose".into(), json!(before.purpose));
        new.insert("purpose".into(), json!(after.purpose));
    }
    if before.program_id != after.program_id {
        old.insert("loanProgramId".into(), json!(before.program_id));
        new.insert("loanProgramId".into(), json!(after.program_id));
    }
    (Value::Object(old), Value::Object(new))
}

#[tracing::instrument(name = "Update loan application", skip(body, pool, origin), fields(user.id = %user.id))]
#[put("/{id}")]
async fn update(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateLoanBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let not_editable = || Error::Conflict(format!("Cannot update loan in {} status", loan.status));
    if !loan.status.is_editable() {
        return Err(not_editable());
    }

    let changes = body.into_inner().into_changes()?;
    let program_id = changes.program_id.or(loan.program_id);
    if let Some(program_id) = program_id.filter(|_| changes.affects_program_terms()) {
        let amount = changes
            .amount
            .map(|amount| amount.value())
            .unwrap_or(loan.loan_amount);
        let term = changes
            .term
            .map(|term| term.months())
            .unwrap_or(loan.loan_term_months);
        check_program(pool, program_id, amount, term).await?;
    }

    let updated = LoansRepo::update_editable(pool, loan.id, &changes)
        .await?
        .ok_or_else(not_editable)?;

    let (old_values, new_values) = changed_values(&loan, &updated);
    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::LoanUpdated, origin)
            .description(format!("Loan {} updated", updated.loan_number))
            .resource(updated.id)
            .loan(updated.id)
            .values(Some(old_values), Some(new_values)),
    )
    .await;

    Ok(HttpResponse::Ok().json(updated))
}

#[tracing::instrument(name = "Submit loan application", skip(pool, origin), fields(user.id = %user.id))]
#[post("/{id}/submit")]
async fn submit(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;

    let updated = apply_transition(pool, &loan, LoanStatus::Submitted, None, user.id).await?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::LoanSubmitted, origin)
            .description(format!("Loan {} submitted", updated.loan_number))
            .resource(updated.id)
            .loan(updated.id)
            .values(
                Some(json!({ "status": loan.status })),
                Some(json!({ "status": updated.status })),
            ),
    )
    .await;
    if let Some(officer_id) = updated.loan_officer_id {
        notify(
            pool,
            NewNotification {
                user_id: officer_id,
                loan_id: Some(updated.id),
                kind: NotificationKind::LoanSubmitted,
                subject: format!("Loan {} submitted", updated.loan_number),
                body: format!(
                    "Loan application {} has been submitted and is ready for review.",
                    updated.loan_number
                ),
            },
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(updated))
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    status: Option<String>,
    reason: Option<String>,
}

#[tracing::instrument(name = "Transition loan status", skip(body, pool, origin), fields(user.id = %staff.id))]
#[post("/{id}/transition")]
async fn transition(
    Staff(staff): Staff,
    path: web::Path<Uuid>,
    body: web::Json<TransitionBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();
    let target: LoanStatus = required(body.status, "Status is required")?
        .parse()
        .map_err(Error::validation)?;
    let reason = body.reason.filter(|reason| !reason.trim().is_empty());

    let loan = accessible_loan(pool, &staff, path.into_inner()).await?;
    let updated = apply_transition(pool, &loan, target, reason.as_deref(), staff.id).await?;

    record_activity(
        pool,
        NewActivity::new(staff.id, ActivityAction::LoanStatusChanged, origin)
            .description(format!(
                "Loan {} moved from {} to {}",
                updated.loan_number, loan.status, updated.status
            ))
            .resource(updated.id)
            .loan(updated.id)
            .values(
                Some(json!({ "status": loan.status })),
                Some(json!({ "status": updated.status, "reason": reason })),
            ),
    )
    .await;
    notify(
        pool,
        NewNotification {
            user_id: updated.created_by_id,
            loan_id: Some(updated.id),
            kind: NotificationKind::LoanStatusChanged,
            subject: format!("Loan {} is now {}", updated.loan_number, updated.status),
            body: format!(
                "{}.{}",
                updated.status.description(),
                reason
                    .map(|reason| format!(" Reason: {}", reason))
                    .unwrap_or_default()
            ),
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(updated))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusSummary {
    loan_id: Uuid,
    current_status: LoanStatus,
    description: &'static str,
    allowed_transitions: &'static [LoanStatus],
    last_updated: DateTime<Utc>,
    history: Vec<StatusHistory>,
}

#[tracing::instrument(name = "Fetch loan status", skip(pool), fields(user.id = %user.id))]
#[get("/{id}/status")]
async fn status_summary(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let history = StatusHistoryRepo::list_for_loan(pool, loan.id).await?;

    Ok(HttpResponse::Ok().json(StatusSummary {
        loan_id: loan.id,
        current_status: loan.status,
        description: loan.status.description(),
        allowed_transitions: loan.status.allowed_transitions(),
        last_updated: loan.updated_at,
        history,
    }))
}

#[tracing::instrument(name = "Fetch loan status history", skip(pool), fields(user.id = %user.id))]
#[get("/{id}/history")]
async fn list_history(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let history = StatusHistoryRepo::list_for_loan(pool, loan.id).await?;

    Ok(HttpResponse::Ok().json(history))
}

#[tracing::instrument(name = "Delete loan application", skip(pool, store, origin), fields(user.id = %user.id))]
#[delete("/{id}")]
async fn remove(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    store: web::Data<dyn FileStore>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let loan = accessible_loan(pool, &user, path.into_inner()).await?;
    let not_deletable = || Error::Conflict(format!("Cannot delete loan in {} status", loan.status));
    if !loan.status.is_editable() {
        return Err(not_deletable());
    }

    // Rows cascade with the loan, the files do not
    let documents = DocumentsRepo::list_for_loan(pool, loan.id).await?;
    if !LoansRepo::delete_editable(pool, loan.id).await? {
        return Err(not_deletable());
    }
    for document in &documents {
        if let Err(error) = store.remove(&document.file_path).await {
            tracing::warn!(error.cause_chain = ?error, document.id = %document.id, "Failed to remove stored file");
        }
    }

    // The loan row is gone, so only the resource id refers to it
    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::LoanDeleted, origin)
            .description(format!("Loan {} deleted", loan.loan_number))
            .resource(loan.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Loan application deleted successfully" })))
}

/// Loan application endpoints, including the documents attached to a loan
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/loans")
        .service(create)
        .service(list)
        .service(documents::upload)
        .service(documents::list_for_loan)
        .service(detail)
        .service(update)
        .service(submit)
        .service(transition)
        .service(status_summary)
        .service(list_history)
        .service(remove)
}
