use crate::api::admin_leave::{AdminLeaveQuery, UpdateLeaveDate};
use crate::api::leave_request::{
    ApplyLeave, LeaveDecision, LeaveListResponse, LeaveQuery, ResumptionQuery,
};
use crate::model::leave_balance::{EmployeeLeaveBalance, LeaveSummary, LeaveTypeRef};
use crate::model::leave_request::{LeaveDates, LeaveRequest, LeaveStatus};
use crate::model::user::SessionProfile;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Desk API",
        version = "1.0.0",
        description = r#"
## Leave Management API

Backend for a multi-tenant leave-management console with four roles:
**super admin**, **tenant** (client), **employee** and **line manager**.

### Key Features
- **Session bootstrap**
  - `GET /auth/me` tells the console who is signed in and where to route them
- **Leave applications**
  - Resumption date preview, apply, own history, balances per leave type
- **Review workflow**
  - Line manager endorsement, then tenant decision; super admin may decide at any stage
- **Date corrections**
  - Super admin edits start date and duration; resumption date is recomputed

### Resumption date
A leave of `n` working days starting on `start_date` resumes on the `n`-th
Monday-to-Friday day strictly after `start_date`. Public holidays are not
considered.

### Security
Every endpoint below is protected with **JWT Bearer authentication**.
Tokens are issued by `POST /auth/login` and rotated by `POST /auth/refresh`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::me,

        crate::api::leave_balance::employee_balances,

        crate::api::leave_request::resumption_date,
        crate::api::leave_request::apply_leave,
        crate::api::leave_request::employee_leaves,
        crate::api::leave_request::manager_leaves,
        crate::api::leave_request::tenant_leaves,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::review_leave,

        crate::api::admin_leave::admin_leaves,
        crate::api::admin_leave::admin_review_leave,
        crate::api::admin_leave::update_leave_date
    ),
    components(
        schemas(
            SessionProfile,
            ResumptionQuery,
            LeaveDates,
            ApplyLeave,
            LeaveSummary,
            LeaveTypeRef,
            EmployeeLeaveBalance,
            LeaveDecision,
            LeaveStatus,
            LeaveQuery,
            LeaveRequest,
            LeaveListResponse,
            AdminLeaveQuery,
            UpdateLeaveDate
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Session", description = "Who am I"),
        (name = "Leave", description = "Leave application and review APIs"),
        (name = "Admin", description = "Super admin leave APIs"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
