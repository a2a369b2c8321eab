use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::model::role::Role;
use crate::model::user::SessionProfile;

/// user id => profile served by "who am I".
/// Route guards call it on every navigation, so keep it short-lived.
pub static SESSION_CACHE: Lazy<Cache<u64, SessionProfile>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(300))
        .build()
});

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: u64,
    username: String,
    role_id: u8,
    tenant_id: Option<u64>,
    employee_id: Option<u64>,
}

fn to_profile(row: ProfileRow) -> Option<SessionProfile> {
    let role = Role::from_id(row.role_id)?;

    Some(SessionProfile {
        user_id: row.id,
        username: row.username,
        role: role.to_string(),
        tenant_id: row.tenant_id,
        employee_id: row.employee_id,
        home_path: role.home_path().to_string(),
        login_path: role.login_path().to_string(),
    })
}

async fn load_profile(pool: &MySqlPool, user_id: u64) -> Result<SessionProfile, ApiError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT id, username, role_id, tenant_id, employee_id
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to load session profile"))?;

    row.and_then(to_profile)
        .ok_or_else(|| ApiError::Unauthorized("Session user no longer exists".into()))
}

/// Cached profile for `user_id`, loading it from the database on a miss.
/// Concurrent misses for the same user share a single query.
pub async fn profile(pool: &MySqlPool, user_id: u64) -> Result<SessionProfile, ApiError> {
    SESSION_CACHE
        .try_get_with(user_id, load_profile(pool, user_id))
        .await
        .map_err(|e: Arc<ApiError>| match e.as_ref() {
            ApiError::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            _ => ApiError::Internal,
        })
}

/// Drop a user's cached profile, e.g. on logout.
pub async fn invalidate(user_id: u64) {
    SESSION_CACHE.invalidate(&user_id).await;
    log::debug!("Session profile evicted for user {}", user_id);
}
