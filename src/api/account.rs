// src/api/account.rs

use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AuthContext;
use crate::error::{AppError, AppResult};
use crate::gate::{check_affordability, Affordability};
use crate::plans::PLANS;
use crate::AppState;

#[get("/me")]
pub async fn me(state: web::Data<AppState>, ctx: AuthContext) -> AppResult<HttpResponse> {
    let account = state.store.ensure_account(ctx.account_id, &ctx.email).await?;
    Ok(HttpResponse::Ok().json(json!({
        "id": account.id,
        "email": account.email,
        "credits": account.credits,
    })))
}

/// Advisory affordability probe for the generation UI.
#[get("/credits")]
pub async fn credits(state: web::Data<AppState>, ctx: AuthContext) -> AppResult<HttpResponse> {
    let affordability = check_affordability(state.store.as_ref(), ctx.account_id, &ctx.email).await?;
    let body = match affordability {
        Affordability::Sufficient { balance } => json!({ "sufficient": true, "credits": balance }),
        Affordability::Insufficient { balance } => {
            json!({ "sufficient": false, "credits": balance })
        }
    };
    Ok(HttpResponse::Ok().json(body))
}

/// Public catalog; registered outside the authenticated scope.
#[get("/api/plans")]
pub async fn plans() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "plans": PLANS }))
}

#[derive(Debug, Deserialize)]
pub struct RechargeQuery {
    pub credits: Option<i32>,
}

/// Local-development top-up, disabled outside dev deployments. Grants credits
/// directly without a payment record.
#[get("/dev/recharge")]
pub async fn dev_recharge(
    state: web::Data<AppState>,
    ctx: AuthContext,
    query: web::Query<RechargeQuery>,
) -> AppResult<HttpResponse> {
    if !state.dev_grant_enabled {
        return Err(AppError::NotFound);
    }
    let granted = query.credits.unwrap_or(10);
    if granted <= 0 {
        return Err(AppError::Validation("credits must be positive".into()));
    }
    state.store.ensure_account(ctx.account_id, &ctx.email).await?;
    let balance = state.store.credit(ctx.account_id, granted).await?;
    Ok(HttpResponse::Ok().json(json!({
        "granted": granted,
        "credits": balance,
    })))
}
