use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_balance::{LeaveBalance, LeaveSummary};
use crate::model::leave_request::{
    LeaveDates, LeaveRequest, LeaveStatus, ReviewOutcome, Reviewer, StartDatePolicy, review,
};
use crate::model::role::Role;
use crate::utils::working_days::{format_date, parse_date};
use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlConnection, MySqlPool};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

pub(crate) const LEAVE_COLUMNS: &str = r#"
    id, tenant_id, employee_id, line_manager_id, leave_type_id,
    start_date, duration, resumption_date, reason, status,
    rejection_reason, approval_reason, approval_count, created_at
"#;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ResumptionQuery {
    #[schema(example = "2025-06-06")]
    /// First day of leave, YYYY-MM-DD
    pub start_date: String,
    #[schema(example = 1)]
    /// Working days requested
    pub duration: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct ApplyLeave {
    #[schema(example = 3)]
    pub leave_type_id: u64,
    #[schema(example = "2025-06-06", format = "date")]
    pub start_date: String,
    #[schema(example = 1)]
    pub duration: u32,
    #[schema(example = "Family event")]
    pub reason: String,
    /// Preview value shown by the form. Ignored; the server recomputes it.
    #[schema(example = "2025-06-09", format = "date")]
    pub resumption_date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveDecision {
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    #[schema(example = "Covered by reliever")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub leaves: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
pub(crate) enum FilterValue {
    U64(u64),
    Str(String),
}

/// Accumulates `AND column = ?` clauses with their bind values.
#[derive(Default)]
pub(crate) struct LeaveFilter {
    where_sql: String,
    args: Vec<FilterValue>,
}

impl LeaveFilter {
    pub(crate) fn eq_u64(mut self, column: &str, value: Option<u64>) -> Self {
        if let Some(v) = value {
            self.where_sql.push_str(&format!(" AND {} = ?", column));
            self.args.push(FilterValue::U64(v));
        }
        self
    }

    pub(crate) fn status(mut self, status: Option<LeaveStatus>) -> Self {
        if let Some(s) = status {
            self.where_sql.push_str(" AND status = ?");
            self.args.push(FilterValue::Str(s.to_string()));
        }
        self
    }

    pub(crate) fn raw(mut self, clause: &str) -> Self {
        self.where_sql.push_str(" AND ");
        self.where_sql.push_str(clause);
        self
    }
}

/// Clamped (page, per_page, offset). Pages start at 1, at most 100 rows each.
/// A page past the end saturates the offset and yields no rows.
pub(crate) fn page_bounds(page: Option<u64>, per_page: Option<u64>) -> (u64, u64, u64) {
    let per_page = per_page.unwrap_or(10).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

pub(crate) async fn fetch_page(
    pool: &MySqlPool,
    filter: LeaveFilter,
    page: Option<u64>,
    per_page: Option<u64>,
) -> Result<LeaveListResponse, ApiError> {
    let (page, per_page, offset) = page_bounds(page, per_page);

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests WHERE 1=1{}", filter.where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &filter.args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
        };
    }

    let total = count_q
        .fetch_one(pool)
        .await
        .map_err(ApiError::db("Failed to count leave requests"))?;

    let data_sql = format!(
        "SELECT {} FROM leave_requests WHERE 1=1{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        LEAVE_COLUMNS, filter.where_sql
    );
    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in &filter.args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(s.as_str()),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(ApiError::db("Failed to fetch leave list"))?;

    Ok(LeaveListResponse {
        leaves,
        page,
        per_page,
        total,
    })
}

/// Loads a request by id, locking the row when called inside a transaction.
pub(crate) async fn fetch_leave(
    conn: &mut MySqlConnection,
    leave_id: u64,
    for_update: bool,
) -> Result<LeaveRequest, ApiError> {
    let sql = format!(
        "SELECT {} FROM leave_requests WHERE id = ?{}",
        LEAVE_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );

    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(conn)
        .await
        .map_err(ApiError::db("Failed to fetch leave request"))?
        .ok_or_else(|| ApiError::not_found("Leave request not found"))
}

pub(crate) async fn fetch_balance(
    conn: &mut MySqlConnection,
    tenant_id: u64,
    employee_id: u64,
    leave_type_id: u64,
) -> Result<LeaveBalance, ApiError> {
    sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT lb.employee_id, lb.leave_type_id, lb.balance
        FROM leave_balances lb
        JOIN leave_types lt ON lt.id = lb.leave_type_id
        WHERE lb.employee_id = ?
        AND lb.leave_type_id = ?
        AND lt.tenant_id = ?
        AND lt.is_active = 1
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(leave_type_id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await
    .map_err(ApiError::db("Failed to fetch leave balance"))?
    .ok_or_else(|| ApiError::not_found("Leave type not available for this employee"))
}

/// Fails with 409 when another pending or approved request of the employee
/// overlaps `[start_date, resumption_date)`.
pub(crate) async fn ensure_no_overlap(
    conn: &mut MySqlConnection,
    employee_id: u64,
    dates: &LeaveDates,
    exclude_id: Option<u64>,
) -> Result<(), ApiError> {
    let clashes = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM leave_requests
        WHERE employee_id = ?
        AND status IN ('pending', 'approved')
        AND start_date < ?
        AND ? < resumption_date
        AND id <> ?
        "#,
    )
    .bind(employee_id)
    .bind(dates.resumption_date)
    .bind(dates.start_date)
    .bind(exclude_id.unwrap_or(0))
    .fetch_one(conn)
    .await
    .map_err(ApiError::db("Failed to check overlapping leave"))?;

    if clashes > 0 {
        return Err(ApiError::Conflict(
            "Leave overlaps an existing pending or approved request".into(),
        ));
    }

    Ok(())
}

/// Persists a review decision. The update is conditional on the status and
/// approval count that were reviewed, so two concurrent reviewers cannot both
/// succeed. Final approval deducts the duration from the balance.
pub(crate) async fn record_review(
    pool: &MySqlPool,
    leave_id: u64,
    reviewer: Reviewer,
    decision: &LeaveDecision,
    authorize: impl FnOnce(&LeaveRequest) -> Result<(), ApiError>,
) -> Result<ReviewOutcome, ApiError> {
    let reason = decision.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("Reason is required"));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    let leave = fetch_leave(&mut tx, leave_id, true).await?;
    authorize(&leave)?;

    let outcome = review(leave.status()?, leave.approval_count, reviewer, decision.status)?;

    let reason_column = match decision.status {
        LeaveStatus::Rejected => "rejection_reason",
        _ => "approval_reason",
    };
    let update_sql = format!(
        r#"
        UPDATE leave_requests
        SET status = ?, approval_count = ?, {} = ?
        WHERE id = ?
        AND status = 'pending'
        AND approval_count = ?
        "#,
        reason_column
    );

    let updated = sqlx::query(&update_sql)
        .bind(outcome.status.as_ref())
        .bind(outcome.approval_count)
        .bind(reason)
        .bind(leave_id)
        .bind(leave.approval_count)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db("Failed to update leave status"))?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "Leave request not found or already processed".into(),
        ));
    }

    if outcome.status == LeaveStatus::Approved {
        let deducted = sqlx::query(
            r#"
            UPDATE leave_balances
            SET balance = balance - ?
            WHERE employee_id = ?
            AND leave_type_id = ?
            AND balance >= ?
            "#,
        )
        .bind(leave.duration)
        .bind(leave.employee_id)
        .bind(leave.leave_type_id)
        .bind(leave.duration)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db("Failed to deduct leave balance"))?;

        if deducted.rows_affected() == 0 {
            return Err(ApiError::Conflict(
                "Insufficient leave balance to approve this request".into(),
            ));
        }
    }

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit leave review"))?;

    info!(
        leave_id,
        ?reviewer,
        status = %outcome.status,
        approval_count = outcome.approval_count,
        "Leave request reviewed"
    );

    Ok(outcome)
}

/* =========================
Resumption date preview
========================= */
/// Resumption date for a start date and working-day duration
#[utoipa::path(
    get,
    path = "/api/v1/leave/resumption-date",
    params(ResumptionQuery),
    responses(
        (status = 200, description = "Computed leave dates", body = LeaveDates),
        (status = 400, description = "Invalid date or duration", body = Object, example = json!({
            "message": "Duration must be at least 1 working day"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn resumption_date(
    _auth: AuthUser,
    query: web::Query<ResumptionQuery>,
) -> Result<impl Responder, ApiError> {
    let start_date = parse_date(&query.start_date)?;
    let dates = LeaveDates::plan(start_date, query.duration, StartDatePolicy::AnyDate)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": dates })))
}

/* =========================
Apply for leave (employee)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave/leave-request",
    request_body(
        content = ApplyLeave,
        description = "Leave application",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "data": {
                "id": 1,
                "status": "pending",
                "start_date": "2025-06-06",
                "duration": 1,
                "resumption_date": "2025-06-09",
                "leave_summary": { "balance_before_leave": 20, "balance_after_leave": 19 }
            }
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not available"),
        (status = 409, description = "Overlapping leave")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "apply_leave", skip(auth, pool, payload), fields(user_id = auth.user_id))]
pub async fn apply_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ApplyLeave>,
) -> Result<impl Responder, ApiError> {
    auth.require_employee()?;
    let employee_id = auth.employee_id()?;
    let tenant_id = auth.tenant_id()?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("Reason is required"));
    }

    let today = Local::now().date_naive();
    let start_date = parse_date(&payload.start_date)?;
    let dates = LeaveDates::plan(start_date, payload.duration, StartDatePolicy::NotBefore(today))?;

    if let Some(submitted) = payload.resumption_date.as_deref() {
        if parse_date(submitted).ok() != Some(dates.resumption_date) {
            warn!(
                submitted,
                computed = %format_date(dates.resumption_date),
                "Client resumption date differs from server computation"
            );
        }
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    let balance = fetch_balance(&mut tx, tenant_id, employee_id, payload.leave_type_id).await?;
    let summary: LeaveSummary = balance.summary_for(dates.duration)?;

    ensure_no_overlap(&mut tx, employee_id, &dates, None).await?;

    let line_manager_id = sqlx::query_scalar::<_, Option<u64>>(
        "SELECT line_manager_id FROM employees WHERE id = ? AND tenant_id = ?",
    )
    .bind(employee_id)
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(ApiError::db("Failed to fetch employee"))?
    .ok_or_else(|| ApiError::forbidden("No employee profile"))?;

    // without a line manager the tenant reviews directly
    let approval_count: u32 = if line_manager_id.is_some() { 0 } else { 1 };

    let inserted = sqlx::query::<MySql>(
        r#"
        INSERT INTO leave_requests
            (tenant_id, employee_id, line_manager_id, leave_type_id,
             start_date, duration, resumption_date, reason, status, approval_count)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(tenant_id)
    .bind(employee_id)
    .bind(line_manager_id)
    .bind(payload.leave_type_id)
    .bind(dates.start_date)
    .bind(dates.duration)
    .bind(dates.resumption_date)
    .bind(reason)
    .bind(approval_count)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db("Failed to create leave request"))?;

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit leave request"))?;

    info!(
        leave_id = inserted.last_insert_id(),
        employee_id,
        duration = dates.duration,
        "Leave request submitted"
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave request submitted",
        "data": {
            "id": inserted.last_insert_id(),
            "status": LeaveStatus::Pending,
            "start_date": dates.start_date,
            "duration": dates.duration,
            "resumption_date": dates.resumption_date,
            "leave_summary": summary,
        }
    })))
}

/// The signed-in employee's own requests
#[utoipa::path(
    get,
    path = "/api/v1/leave/leave-request/employee",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn employee_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_employee()?;

    let filter = LeaveFilter::default()
        .eq_u64("employee_id", Some(auth.employee_id()?))
        .status(query.status);

    let page = fetch_page(pool.get_ref(), filter, query.page, query.per_page).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": page })))
}

/// Requests waiting on the signed-in line manager
#[utoipa::path(
    get,
    path = "/api/v1/leave/leave-request/manager",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn manager_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_line_manager()?;

    let filter = LeaveFilter::default()
        .eq_u64("line_manager_id", Some(auth.employee_id()?))
        .status(Some(LeaveStatus::Pending))
        .raw("approval_count = 0");

    let page = fetch_page(pool.get_ref(), filter, query.page, query.per_page).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": page })))
}

/// All requests of the signed-in tenant
#[utoipa::path(
    get,
    path = "/api/v1/leave/leave-request",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn tenant_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_tenant()?;

    let filter = LeaveFilter::default()
        .eq_u64("tenant_id", Some(auth.tenant_id()?))
        .status(query.status);

    let page = fetch_page(pool.get_ref(), filter, query.page, query.per_page).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": page })))
}

/// Who may read a request: its employee, its line manager, its tenant, or a
/// super admin.
fn can_view(auth: &AuthUser, leave: &LeaveRequest) -> bool {
    match auth.role {
        Role::SuperAdmin => true,
        Role::Tenant => auth.tenant_id == Some(leave.tenant_id),
        Role::Employee | Role::LineManager => {
            auth.employee_id.is_some()
                && (auth.employee_id == Some(leave.employee_id)
                    || auth.employee_id == leave.line_manager_id)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/leave-request/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let leave_id = path.into_inner();

    let mut conn = pool
        .acquire()
        .await
        .map_err(ApiError::db("Failed to acquire connection"))?;
    let leave = fetch_leave(&mut conn, leave_id, false).await?;

    // hide existence from other tenants
    if !can_view(&auth, &leave) {
        return Err(ApiError::not_found("Leave request not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": leave })))
}

/* =========================
Approve / reject (line manager, tenant)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/leave-request/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to review")
    ),
    request_body = LeaveDecision,
    responses(
        (status = 200, description = "Decision recorded", body = Object, example = json!({
            "message": "Leave request updated",
            "data": { "status": "pending", "approval_count": 1 }
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already processed or wrong review stage")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<LeaveDecision>,
) -> Result<impl Responder, ApiError> {
    let leave_id = path.into_inner();

    let reviewer = match auth.role {
        Role::LineManager => Reviewer::LineManager,
        Role::Tenant => Reviewer::Tenant,
        _ => return Err(ApiError::forbidden("Line manager/Tenant only")),
    };

    let outcome = record_review(pool.get_ref(), leave_id, reviewer, &payload, |leave| {
        let allowed = match reviewer {
            Reviewer::LineManager => auth.employee_id.is_some() && auth.employee_id == leave.line_manager_id,
            _ => auth.tenant_id == Some(leave.tenant_id),
        };
        if allowed {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to review this leave request"))
        }
    })
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request updated",
        "data": {
            "status": outcome.status,
            "approval_count": outcome.approval_count,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token;
    use crate::config::Config;
    use crate::models::{TokenSubject, TokenType};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use chrono::NaiveDate;

    fn bearer(config: &Config, role: u8) -> (&'static str, String) {
        let subject = TokenSubject {
            user_id: 1,
            username: "ada".into(),
            role,
            tenant_id: Some(7),
            employee_id: Some(1001),
        };
        let (token, _) =
            generate_token(&subject, TokenType::Access, &config.jwt_secret, 60).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    fn leave(employee_id: u64, line_manager_id: Option<u64>, tenant_id: u64) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            tenant_id,
            employee_id,
            line_manager_id,
            leave_type_id: 3,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 6).unwrap(),
            duration: 1,
            resumption_date: NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
            reason: "Family event".into(),
            status: "pending".into(),
            rejection_reason: None,
            approval_reason: None,
            approval_count: 0,
            created_at: None,
        }
    }

    fn user(role: Role, tenant_id: Option<u64>, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "ada".into(),
            role,
            tenant_id,
            employee_id,
        }
    }

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(None, None), (1, 10, 0));
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(page_bounds(Some(3), Some(500)), (3, 100, 200));
    }

    #[test]
    fn huge_page_numbers_saturate_instead_of_overflowing() {
        assert_eq!(page_bounds(Some(u64::MAX), Some(100)), (u64::MAX, 100, u64::MAX));
        assert_eq!(page_bounds(Some(u64::MAX), None), (u64::MAX, 10, u64::MAX));
    }

    #[test]
    fn filter_builds_where_clause_in_order() {
        let filter = LeaveFilter::default()
            .eq_u64("tenant_id", Some(7))
            .eq_u64("employee_id", None)
            .status(Some(LeaveStatus::Pending))
            .raw("approval_count = 0");

        assert_eq!(
            filter.where_sql,
            " AND tenant_id = ? AND status = ? AND approval_count = 0"
        );
        assert_eq!(filter.args.len(), 2);
    }

    #[test]
    fn visibility_follows_ownership() {
        let request = leave(1001, Some(2002), 7);

        assert!(can_view(&user(Role::Employee, Some(7), Some(1001)), &request));
        assert!(can_view(&user(Role::LineManager, Some(7), Some(2002)), &request));
        assert!(can_view(&user(Role::Tenant, Some(7), None), &request));
        assert!(can_view(&user(Role::SuperAdmin, None, None), &request));

        assert!(!can_view(&user(Role::Employee, Some(7), Some(3003)), &request));
        assert!(!can_view(&user(Role::Tenant, Some(8), None), &request));
    }

    #[test]
    fn employees_without_profile_see_nothing() {
        let request = leave(1001, None, 7);
        assert!(!can_view(&user(Role::LineManager, Some(7), None), &request));
    }

    #[actix_web::test]
    async fn preview_computes_resumption_date() {
        let config = Config::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .route("/leave/resumption-date", web::get().to(resumption_date)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/leave/resumption-date?start_date=2025-06-06&duration=1")
            .insert_header(bearer(&config, 3))
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["resumption_date"], "2025-06-09");
        assert_eq!(body["data"]["duration"], 1);
    }

    #[actix_web::test]
    async fn preview_rejects_bad_input() {
        let config = Config::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .route("/leave/resumption-date", web::get().to(resumption_date)),
        )
        .await;

        for uri in [
            "/leave/resumption-date?start_date=2025-06-06&duration=0",
            "/leave/resumption-date?start_date=06/06/2025&duration=1",
        ] {
            let req = actix_test::TestRequest::get()
                .uri(uri)
                .insert_header(bearer(&config, 3))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }

        let req = actix_test::TestRequest::get()
            .uri("/leave/resumption-date?start_date=2025-06-06&duration=1")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn apply_is_for_employees_and_validates_before_touching_the_database() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config.clone()))
                .route("/leave/leave-request", web::post().to(apply_leave)),
        )
        .await;

        let body = serde_json::json!({
            "leave_type_id": 3,
            "start_date": "2000-01-03",
            "duration": 1,
            "reason": "Trip"
        });

        let req = actix_test::TestRequest::post()
            .uri("/leave/leave-request")
            .insert_header(bearer(&config, 2))
            .set_json(&body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // start date in the past
        let req = actix_test::TestRequest::post()
            .uri("/leave/leave-request")
            .insert_header(bearer(&config, 3))
            .set_json(&body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::post()
            .uri("/leave/leave-request")
            .insert_header(bearer(&config, 3))
            .set_json(serde_json::json!({
                "leave_type_id": 3,
                "start_date": "2999-01-03",
                "duration": 1,
                "reason": "   "
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn employees_cannot_review() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config.clone()))
                .route("/leave/leave-request/{id}", web::put().to(review_leave)),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/leave/leave-request/1")
            .insert_header(bearer(&config, 3))
            .set_json(serde_json::json!({ "status": "approved", "reason": "ok" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
