use crate::{
    api::{admin_leave, leave_balance, leave_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    // both values are non-zero, so finish() cannot fail
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/auth/me").route(web::get().to(handlers::me)))
            .service(
                web::resource("/leave-balance")
                    .route(web::get().to(leave_balance::employee_balances)),
            )
            .service(
                web::scope("/leave")
                    // /leave/resumption-date
                    .service(
                        web::resource("/resumption-date")
                            .route(web::get().to(leave_request::resumption_date)),
                    )
                    // /leave/leave-request
                    .service(
                        web::resource("/leave-request")
                            .route(web::get().to(leave_request::tenant_leaves))
                            .route(web::post().to(leave_request::apply_leave)),
                    )
                    // literal segments before /{id}
                    .service(
                        web::resource("/leave-request/employee")
                            .route(web::get().to(leave_request::employee_leaves)),
                    )
                    .service(
                        web::resource("/leave-request/manager")
                            .route(web::get().to(leave_request::manager_leaves)),
                    )
                    // /leave/leave-request/{id}
                    .service(
                        web::resource("/leave-request/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::put().to(leave_request::review_leave)),
                    ),
            )
            .service(
                web::scope("/admin/leave")
                    // /admin/leave/leave-request
                    .service(
                        web::resource("/leave-request")
                            .route(web::get().to(admin_leave::admin_leaves)),
                    )
                    // /admin/leave/leave-request/{id}
                    .service(
                        web::resource("/leave-request/{id}")
                            .route(web::put().to(admin_leave::admin_review_leave)),
                    )
                    // /admin/leave/{id}/date
                    .service(
                        web::resource("/{id}/date")
                            .route(web::put().to(admin_leave::update_leave_date)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token
//  └─ GET /api/v1/auth/me  → role, home_path, login_path for the route guard

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token;
    use crate::models::{TokenSubject, TokenType};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use sqlx::MySqlPool;

    #[actix_web::test]
    async fn protected_scope_requires_a_token() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let cfg_clone = config.clone();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config.clone()))
                .configure(move |cfg| configure(cfg, cfg_clone.clone())),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/leave/resumption-date?start_date=2025-12-24&duration=3")
            .peer_addr("127.0.0.1:5000".parse().unwrap())
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let subject = TokenSubject {
            user_id: 1,
            username: "ada".into(),
            role: 3,
            tenant_id: Some(7),
            employee_id: Some(1001),
        };
        let (token, _) =
            generate_token(&subject, TokenType::Access, &config.jwt_secret, 60).unwrap();

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/leave/resumption-date?start_date=2025-12-24&duration=3")
            .peer_addr("127.0.0.1:5000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["resumption_date"], "2025-12-29");
    }

    #[test]
    fn zero_rate_still_builds_a_limiter() {
        let _ = build_limiter(0);
        let _ = build_limiter(100_000);
    }
}
