use crate::auth::auth::authenticate;
use crate::config::Config;
use crate::error::ApiError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Resolves the bearer token once per request and stores the `AuthUser` in the
/// request extensions. Unauthenticated requests never reach a handler.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => Some(v),
            Err(_) => {
                let resp = ApiError::Unauthorized("Invalid Authorization header encoding".into())
                    .error_response();
                return Ok(req.into_response(resp));
            }
        },
        None => None,
    };

    let auth_user = match authenticate(header, &config.jwt_secret) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, path = %req.path(), "Rejected unauthenticated request");
            return Ok(req.into_response(e.error_response()));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
