use crate::api::leave_request::{
    LeaveDecision, LeaveFilter, LeaveListResponse, ensure_no_overlap, fetch_balance, fetch_leave,
    fetch_page, record_review,
};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_request::{LeaveDates, LeaveStatus, Reviewer, StartDatePolicy};
use crate::utils::working_days::parse_date;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AdminLeaveQuery {
    #[schema(example = 7)]
    /// Filter by tenant ID
    pub tenant_id: Option<u64>,
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
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

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeaveDate {
    #[schema(example = "2025-06-06", format = "date")]
    pub start_date: String,
    #[schema(example = 3)]
    pub duration: u32,
    /// Preview value shown by the form. Ignored; the server recomputes it.
    #[schema(example = "2025-06-11", format = "date")]
    pub resumption_date: Option<String>,
}

/// Every tenant's leave requests
#[utoipa::path(
    get,
    path = "/api/v1/admin/leave/leave-request",
    params(AdminLeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn admin_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AdminLeaveQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_super_admin()?;

    let filter = LeaveFilter::default()
        .eq_u64("tenant_id", query.tenant_id)
        .eq_u64("employee_id", query.employee_id)
        .status(query.status);

    let page: LeaveListResponse =
        fetch_page(pool.get_ref(), filter, query.page, query.per_page).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": page })))
}

/// Approve or reject at any review stage
#[utoipa::path(
    put,
    path = "/api/v1/admin/leave/leave-request/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to review")
    ),
    request_body = LeaveDecision,
    responses(
        (status = 200, description = "Decision recorded"),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn admin_review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<LeaveDecision>,
) -> Result<impl Responder, ApiError> {
    auth.require_super_admin()?;

    let outcome = record_review(
        pool.get_ref(),
        path.into_inner(),
        Reviewer::SuperAdmin,
        &payload,
        |_| Ok(()),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request updated",
        "data": {
            "status": outcome.status,
            "approval_count": outcome.approval_count,
        }
    })))
}

/* =========================
Edit leave dates (super admin)
========================= */
/// Moves a request to new dates. The resumption date is recomputed, the
/// request goes back to pending, and an already approved duration is
/// returned to the balance.
#[utoipa::path(
    put,
    path = "/api/v1/admin/leave/{leave_id}/date",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to edit")
    ),
    request_body = UpdateLeaveDate,
    responses(
        (status = 200, description = "Leave dates updated", body = Object, example = json!({
            "message": "Leave dates updated successfully",
            "data": {
                "start_date": "2025-06-06",
                "duration": 3,
                "resumption_date": "2025-06-11",
                "status": "pending"
            }
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Overlapping leave")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
#[instrument(name = "update_leave_date", skip(auth, pool, payload), fields(user_id = auth.user_id))]
pub async fn update_leave_date(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateLeaveDate>,
) -> Result<impl Responder, ApiError> {
    auth.require_super_admin()?;

    let leave_id = path.into_inner();

    // corrections to past records are allowed here
    let start_date = parse_date(&payload.start_date)?;
    let dates = LeaveDates::plan(start_date, payload.duration, StartDatePolicy::AnyDate)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    let leave = fetch_leave(&mut tx, leave_id, true).await?;
    let was_approved = leave.status()? == LeaveStatus::Approved;

    if was_approved {
        sqlx::query(
            r#"
            UPDATE leave_balances
            SET balance = balance + ?
            WHERE employee_id = ?
            AND leave_type_id = ?
            "#,
        )
        .bind(leave.duration)
        .bind(leave.employee_id)
        .bind(leave.leave_type_id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db("Failed to refund leave balance"))?;
    }

    let balance = fetch_balance(&mut tx, leave.tenant_id, leave.employee_id, leave.leave_type_id)
        .await?;
    balance.summary_for(dates.duration)?;

    ensure_no_overlap(&mut tx, leave.employee_id, &dates, Some(leave_id)).await?;

    let approval_count: u32 = if leave.line_manager_id.is_some() { 0 } else { 1 };

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET start_date = ?,
            duration = ?,
            resumption_date = ?,
            status = 'pending',
            approval_count = ?,
            approval_reason = NULL,
            rejection_reason = NULL
        WHERE id = ?
        "#,
    )
    .bind(dates.start_date)
    .bind(dates.duration)
    .bind(dates.resumption_date)
    .bind(approval_count)
    .bind(leave_id)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db("Failed to update leave dates"))?;

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit leave date update"))?;

    info!(
        leave_id,
        refunded = was_approved,
        duration = dates.duration,
        "Leave dates updated, status reset to pending"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave dates updated successfully",
        "data": {
            "start_date": dates.start_date,
            "duration": dates.duration,
            "resumption_date": dates.resumption_date,
            "status": LeaveStatus::Pending,
        }
    })))
}
