use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_balance::{EmployeeLeaveBalance, LeaveBalanceRow};
use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;

/// Balances of the signed-in employee, one per active leave type of the tenant
#[utoipa::path(
    get,
    path = "/api/v1/leave-balance",
    responses(
        (status = 200, description = "Leave balances per leave type", body = Object, example = json!({
            "data": {
                "leave_balances": [
                    { "leave_type": { "id": 3, "name": "Annual leave" }, "balance": 20 },
                    { "leave_type": { "id": 4, "name": "Sick leave" }, "balance": 10 }
                ]
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn employee_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    auth.require_employee()?;
    let employee_id = auth.employee_id()?;
    let tenant_id = auth.tenant_id()?;

    let rows = sqlx::query_as::<_, LeaveBalanceRow>(
        r#"
        SELECT lb.leave_type_id, lt.name AS leave_type_name, lb.balance
        FROM leave_balances lb
        JOIN leave_types lt ON lt.id = lb.leave_type_id
        WHERE lb.employee_id = ?
        AND lt.tenant_id = ?
        AND lt.is_active = 1
        ORDER BY lt.name
        "#,
    )
    .bind(employee_id)
    .bind(tenant_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch leave balances"))?;

    let leave_balances: Vec<EmployeeLeaveBalance> = rows.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "data": { "leave_balances": leave_balances }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token;
    use crate::config::Config;
    use crate::models::{TokenSubject, TokenType};
    use actix_web::{App, http::StatusCode, test};

    fn bearer(config: &Config, role: u8, employee_id: Option<u64>) -> (&'static str, String) {
        let subject = TokenSubject {
            user_id: 1,
            username: "ada".into(),
            role,
            tenant_id: Some(7),
            employee_id,
        };
        let (token, _) =
            generate_token(&subject, TokenType::Access, &config.jwt_secret, 60).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn balances_are_for_employees_with_a_profile() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config.clone()))
                .route("/leave-balance", web::get().to(employee_balances)),
        )
        .await;

        // tenant account
        let req = test::TestRequest::get()
            .uri("/leave-balance")
            .insert_header(bearer(&config, 2, None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // employee role without an employee record
        let req = test::TestRequest::get()
            .uri("/leave-balance")
            .insert_header(bearer(&config, 3, None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get().uri("/leave-balance").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
