use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub tenant_id: Option<u64>,
    pub employee_id: Option<u64>,
}

/// What the console's route guards get back from "who am I".
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "user_id": 12,
    "username": "ada",
    "role": "line_manager",
    "tenant_id": 7,
    "employee_id": 1001,
    "home_path": "/dashboard/employee",
    "login_path": "/login"
}))]
pub struct SessionProfile {
    pub user_id: u64,
    pub username: String,
    #[schema(value_type = String)]
    pub role: String,
    pub tenant_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub home_path: String,
    pub login_path: String,
}
