use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The signed-in user, resolved from the bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present for tenant users and employees
    pub tenant_id: Option<u64>,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Validates an `Authorization` header value and builds the user from it.
/// Refresh tokens are not accepted here.
pub fn authenticate(header_value: Option<&str>, secret: &str) -> Result<AuthUser, ApiError> {
    let header_value =
        header_value.ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

    let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("Authorization header must start with Bearer".into())
    })?;

    let claims = verify_token(token, secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        tenant_id: claims.tenant_id,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already resolved by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                tracing::error!("Config missing from app data");
                return ready(Err(ApiError::Internal));
            }
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(authenticate(header, &config.jwt_secret))
    }
}

impl AuthUser {
    pub fn require_super_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Super admin only"))
        }
    }

    pub fn require_tenant(&self) -> Result<(), ApiError> {
        if self.role == Role::Tenant {
            Ok(())
        } else {
            Err(ApiError::forbidden("Tenant only"))
        }
    }

    /// Employees and line managers.
    pub fn require_employee(&self) -> Result<(), ApiError> {
        if self.role.is_employee() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Employee only"))
        }
    }

    pub fn require_line_manager(&self) -> Result<(), ApiError> {
        if self.role == Role::LineManager {
            Ok(())
        } else {
            Err(ApiError::forbidden("Line manager only"))
        }
    }

    pub fn employee_id(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    pub fn tenant_id(&self) -> Result<u64, ApiError> {
        self.tenant_id
            .ok_or_else(|| ApiError::forbidden("No tenant account"))
    }
}
