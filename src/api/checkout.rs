// src/api/checkout.rs

use actix_web::{post, web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::AuthContext;
use crate::api::checkout_client::{CreateSessionPayload, SessionMetadata};
use crate::error::{AppError, AppResult};
use crate::plans;
use crate::AppState;

pub const CHECKOUT_PROVIDER: &str = "checkout";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub plan_id: String,
    pub account_id: Uuid,
    pub account_email: String,
}

/// Opens a hosted checkout session for a credit pack. A pending payment
/// record keyed by the session id is written before the redirect, so the
/// completion webhook has something to settle against.
#[utoipa::path(
    post,
    path = "/api/checkout/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created, body carries the redirect url"),
        (status = 400, description = "Unknown plan"),
        (status = 401, description = "Body identity does not match the token"),
    )
)]
#[post("/checkout/session")]
pub async fn create_session(
    state: web::Data<AppState>,
    ctx: AuthContext,
    payload: web::Json<CreateSessionRequest>,
) -> AppResult<HttpResponse> {
    // The body duplicates the caller identity for the provider's benefit;
    // it must agree with the verified token.
    if payload.account_id != ctx.account_id {
        return Err(AppError::Auth);
    }

    let plan = plans::find(&payload.plan_id)
        .ok_or_else(|| AppError::Validation(format!("unknown plan '{}'", payload.plan_id)))?;

    state.store.ensure_account(ctx.account_id, &ctx.email).await?;

    let session = state
        .checkout
        .create_session(CreateSessionPayload {
            amount: plan.amount,
            currency: "CNY".into(),
            product_name: plan.name.into(),
            customer_email: payload.account_email.clone(),
            success_url: format!("{}/payment/success", state.site_url),
            cancel_url: format!("{}/pricing", state.site_url),
            metadata: SessionMetadata {
                account_id: ctx.account_id,
                plan_id: plan.id.into(),
                credits: plan.credits,
            },
        })
        .await?;

    state
        .store
        .create_pending_payment(
            ctx.account_id,
            &plans::amount_string(plan.amount),
            plan.credits,
            CHECKOUT_PROVIDER,
            Some(&session.id),
        )
        .await?;

    info!(
        "checkout: session {} opened for account {} plan {}",
        session.id, ctx.account_id, plan.id
    );
    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.id,
        "url": session.url,
    })))
}
