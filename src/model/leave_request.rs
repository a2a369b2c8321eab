use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::utils::working_days::compute_resumption_date;

/// Upper bound on a single request: one working year.
pub const MAX_LEAVE_DURATION: u32 = 260;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "tenant_id": 7,
    "employee_id": 1000,
    "line_manager_id": 1001,
    "leave_type_id": 3,
    "start_date": "2025-06-06",
    "duration": 1,
    "resumption_date": "2025-06-09",
    "reason": "Family event",
    "status": "pending",
    "rejection_reason": null,
    "approval_reason": null,
    "approval_count": 0,
    "created_at": "2025-06-01T09:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub tenant_id: u64,
    pub employee_id: u64,
    pub line_manager_id: Option<u64>,
    pub leave_type_id: u64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    /// working days
    pub duration: u32,
    #[schema(format = "date", value_type = String)]
    pub resumption_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub approval_reason: Option<String>,
    pub approval_count: u32,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn status(&self) -> Result<LeaveStatus, ApiError> {
        self.status.parse().map_err(|_| {
            tracing::error!(leave_id = self.id, status = %self.status, "Unknown leave status in database");
            ApiError::Internal
        })
    }
}

/// Whether a start date earlier than today is acceptable.
#[derive(Debug, Clone, Copy)]
pub enum StartDatePolicy {
    NotBefore(NaiveDate),
    AnyDate,
}

/// Start, duration and the server-computed resumption date of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveDates {
    #[schema(example = "2025-06-06", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = 1)]
    pub duration: u32,
    #[schema(example = "2025-06-09", format = "date", value_type = String)]
    pub resumption_date: NaiveDate,
}

impl LeaveDates {
    pub fn plan(
        start_date: NaiveDate,
        duration: u32,
        policy: StartDatePolicy,
    ) -> Result<Self, ApiError> {
        if duration > MAX_LEAVE_DURATION {
            return Err(ApiError::bad_request(format!(
                "Duration cannot exceed {} working days",
                MAX_LEAVE_DURATION
            )));
        }

        if let StartDatePolicy::NotBefore(today) = policy {
            if start_date < today {
                return Err(ApiError::bad_request("start_date cannot be in the past"));
            }
        }

        let resumption_date = compute_resumption_date(start_date, duration)?;

        Ok(Self {
            start_date,
            duration,
            resumption_date,
        })
    }
}

/// Who is acting on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reviewer {
    LineManager,
    Tenant,
    SuperAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub status: LeaveStatus,
    pub approval_count: u32,
}

/// Two-stage review: the line manager endorses first, then the tenant gives the
/// final decision. A super admin may decide at either stage. Any rejection is
/// final.
pub fn review(
    status: LeaveStatus,
    approval_count: u32,
    reviewer: Reviewer,
    decision: LeaveStatus,
) -> Result<ReviewOutcome, ApiError> {
    if status != LeaveStatus::Pending {
        return Err(ApiError::Conflict(
            "Leave request not found or already processed".into(),
        ));
    }

    if decision == LeaveStatus::Pending {
        return Err(ApiError::bad_request(
            "Invalid status. Allowed: approved, rejected",
        ));
    }

    match reviewer {
        Reviewer::LineManager if approval_count > 0 => Err(ApiError::Conflict(
            "Leave request already reviewed by line manager".into(),
        )),
        Reviewer::Tenant if approval_count == 0 => Err(ApiError::Conflict(
            "Leave request is awaiting line manager review".into(),
        )),
        Reviewer::LineManager => Ok(match decision {
            LeaveStatus::Approved => ReviewOutcome {
                status: LeaveStatus::Pending,
                approval_count: 1,
            },
            _ => ReviewOutcome {
                status: LeaveStatus::Rejected,
                approval_count,
            },
        }),
        Reviewer::Tenant | Reviewer::SuperAdmin => Ok(match decision {
            LeaveStatus::Approved => ReviewOutcome {
                status: LeaveStatus::Approved,
                approval_count: approval_count + 1,
            },
            _ => ReviewOutcome {
                status: LeaveStatus::Rejected,
                approval_count,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn plan_computes_resumption_date() {
        let dates = LeaveDates::plan(date("2025-06-06"), 1, StartDatePolicy::AnyDate).unwrap();
        assert_eq!(dates.resumption_date, date("2025-06-09"));
        assert_eq!(dates.duration, 1);
    }

    #[test]
    fn plan_rejects_past_start_when_policy_requires() {
        let today = date("2025-06-10");
        let err = LeaveDates::plan(date("2025-06-09"), 2, StartDatePolicy::NotBefore(today))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        assert!(LeaveDates::plan(today, 2, StartDatePolicy::NotBefore(today)).is_ok());
        assert!(LeaveDates::plan(date("2025-06-09"), 2, StartDatePolicy::AnyDate).is_ok());
    }

    #[test]
    fn plan_rejects_zero_and_oversized_durations() {
        let start = date("2025-06-02");
        assert!(LeaveDates::plan(start, 0, StartDatePolicy::AnyDate).is_err());
        assert!(LeaveDates::plan(start, MAX_LEAVE_DURATION + 1, StartDatePolicy::AnyDate).is_err());
        assert!(LeaveDates::plan(start, MAX_LEAVE_DURATION, StartDatePolicy::AnyDate).is_ok());
    }

    #[test]
    fn line_manager_endorsement_keeps_request_pending() {
        let outcome = review(LeaveStatus::Pending, 0, Reviewer::LineManager, LeaveStatus::Approved)
            .unwrap();
        assert_eq!(outcome.status, LeaveStatus::Pending);
        assert_eq!(outcome.approval_count, 1);

        let outcome = review(LeaveStatus::Pending, 1, Reviewer::Tenant, LeaveStatus::Approved)
            .unwrap();
        assert_eq!(outcome.status, LeaveStatus::Approved);
        assert_eq!(outcome.approval_count, 2);
    }

    #[test]
    fn stages_are_enforced() {
        let err = review(LeaveStatus::Pending, 0, Reviewer::Tenant, LeaveStatus::Approved)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = review(LeaveStatus::Pending, 1, Reviewer::LineManager, LeaveStatus::Rejected)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let outcome = review(LeaveStatus::Pending, 0, Reviewer::SuperAdmin, LeaveStatus::Approved)
            .unwrap();
        assert_eq!(outcome.status, LeaveStatus::Approved);
    }

    #[test]
    fn processed_requests_cannot_be_reviewed_again() {
        for status in [LeaveStatus::Approved, LeaveStatus::Rejected] {
            assert!(review(status, 1, Reviewer::SuperAdmin, LeaveStatus::Rejected).is_err());
        }
    }

    #[test]
    fn pending_is_not_a_decision() {
        let err = review(LeaveStatus::Pending, 0, Reviewer::LineManager, LeaveStatus::Pending)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejection_is_final_at_any_stage() {
        let outcome = review(LeaveStatus::Pending, 0, Reviewer::LineManager, LeaveStatus::Rejected)
            .unwrap();
        assert_eq!(outcome.status, LeaveStatus::Rejected);

        let outcome = review(LeaveStatus::Pending, 1, Reviewer::Tenant, LeaveStatus::Rejected)
            .unwrap();
        assert_eq!(outcome.status, LeaveStatus::Rejected);
        assert_eq!(outcome.approval_count, 1);
    }

    #[test]
    fn status_strings_match_the_database() {
        assert_eq!(LeaveStatus::Approved.as_ref(), "approved");
        assert_eq!("rejected".parse::<LeaveStatus>().unwrap(), LeaveStatus::Rejected);
    }
}
