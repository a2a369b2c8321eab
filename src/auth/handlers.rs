use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::ApiError,
    model::user::{SessionProfile, User},
    models::{Claims, LoginReqDto, TokenSubject, TokenType},
    utils::session_cache,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, error, info, instrument};

#[derive(Serialize, Deserialize)]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn sign(
    subject: &TokenSubject,
    token_type: TokenType,
    config: &Config,
) -> Result<(String, Claims), ApiError> {
    let ttl = match token_type {
        TokenType::Access => config.access_token_ttl,
        TokenType::Refresh => config.refresh_token_ttl,
    };

    generate_token(subject, token_type, &config.jwt_secret, ttl).map_err(|e| {
        error!(error = %e, user_id = subject.user_id, "Failed to sign token");
        ApiError::Internal
    })
}

async fn store_refresh_token(
    tx: &mut Transaction<'_, MySql>,
    claims: &Claims,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(&mut **tx)
    .await
    .map_err(ApiError::db("Failed to store refresh token"))?;

    Ok(())
}

/// Issues an access/refresh token pair for any of the four roles.
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::bad_request("Username or password required"));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, tenant_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::db("Database error while fetching user"))?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        ApiError::Unauthorized("Invalid credentials".into())
    })?;

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let subject = TokenSubject::from(&db_user);
    let (access_token, _) = sign(&subject, TokenType::Access, &config)?;
    let (refresh_token, refresh_claims) = sign(&subject, TokenType::Refresh, &config)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    store_refresh_token(&mut tx, &refresh_claims).await?;

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit login"))?;

    // non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, role_id = db_user.role_id, "Login successful");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful",
        "data": TokenPair {
            access_token,
            refresh_token,
        }
    })))
}

/// Rotates a refresh token: the presented one is revoked and a new pair issued.
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let token = bearer(&req).ok_or_else(|| ApiError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Refresh token required".into()));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    // conditional update so a token can only be rotated once
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = 1
        WHERE jti = ?
        AND user_id = ?
        AND revoked = 0
        AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .bind(claims.user_id)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db("Failed to revoke refresh token"))?;

    if revoked.rows_affected() == 0 {
        info!(user_id = claims.user_id, "Refresh token unknown, revoked or expired");
        return Err(ApiError::Unauthorized("Refresh token revoked".into()));
    }

    let subject = TokenSubject::from(&claims);
    let (new_refresh_token, new_claims) = sign(&subject, TokenType::Refresh, &config)?;
    store_refresh_token(&mut tx, &new_claims).await?;

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit token rotation"))?;

    let (access_token, _) = sign(&subject, TokenType::Access, &config)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "data": TokenPair {
            access_token,
            refresh_token: new_refresh_token,
        }
    })))
}

/// Revokes the presented refresh token. Always answers 204.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match bearer(&req).and_then(|t| verify_token(t, &config.jwt_secret).ok()) {
        Some(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, user_id = claims.user_id, "Failed to revoke refresh token on logout");
    }

    session_cache::invalidate(claims.user_id).await;

    HttpResponse::NoContent().finish()
}

/// "Who am I" for the console's route guards
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Signed-in user and where to route them", body = SessionProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Session"
)]
pub async fn me(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let profile: SessionProfile = session_cache::profile(pool.get_ref(), auth.user_id).await?;

    // token outlived a role change
    if profile.role != auth.role.to_string() {
        session_cache::invalidate(auth.user_id).await;
        return Err(ApiError::Unauthorized("Session role changed, sign in again".into()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "data": { "user": profile }
    })))
}
