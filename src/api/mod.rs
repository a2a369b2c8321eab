pub mod admin_leave;
pub mod leave_balance;
pub mod leave_request;
