use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Debug, sqlx::FromRow)]
pub struct LeaveBalance {
    pub employee_id: u64,
    pub leave_type_id: u64,
    /// working days left
    pub balance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveSummary {
    #[schema(example = 20)]
    pub balance_before_leave: u32,
    #[schema(example = 15)]
    pub balance_after_leave: u32,
}

/// One row of the employee dashboard's balance list.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveBalanceRow {
    pub leave_type_id: u64,
    pub leave_type_name: String,
    pub balance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveTypeRef {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Annual leave")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EmployeeLeaveBalance {
    pub leave_type: LeaveTypeRef,
    #[schema(example = 20)]
    pub balance: u32,
}

impl From<LeaveBalanceRow> for EmployeeLeaveBalance {
    fn from(row: LeaveBalanceRow) -> Self {
        Self {
            leave_type: LeaveTypeRef {
                id: row.leave_type_id,
                name: row.leave_type_name,
            },
            balance: row.balance,
        }
    }
}

impl LeaveBalance {
    pub fn summary_for(&self, duration: u32) -> Result<LeaveSummary, ApiError> {
        let balance_after_leave = self.balance.checked_sub(duration).ok_or_else(|| {
            ApiError::bad_request(format!(
                "Insufficient leave balance: {} working day(s) available",
                self.balance
            ))
        })?;

        Ok(LeaveSummary {
            balance_before_leave: self.balance,
            balance_after_leave,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(days: u32) -> LeaveBalance {
        LeaveBalance {
            employee_id: 1,
            leave_type_id: 2,
            balance: days,
        }
    }

    #[test]
    fn summary_subtracts_duration() {
        let summary = balance(20).summary_for(5).unwrap();
        assert_eq!(summary.balance_before_leave, 20);
        assert_eq!(summary.balance_after_leave, 15);
    }

    #[test]
    fn whole_balance_can_be_used() {
        assert_eq!(balance(3).summary_for(3).unwrap().balance_after_leave, 0);
    }

    #[test]
    fn balance_rows_nest_the_leave_type() {
        let entry = EmployeeLeaveBalance::from(LeaveBalanceRow {
            leave_type_id: 3,
            leave_type_name: "Annual leave".into(),
            balance: 12,
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["leave_type"]["id"], 3);
        assert_eq!(json["leave_type"]["name"], "Annual leave");
        assert_eq!(json["balance"], 12);
    }

    #[test]
    fn overdraw_is_rejected() {
        let err = balance(2).summary_for(3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient leave balance: 2 working day(s) available"
        );
    }
}
