// src/api/redirect_pay.rs
//
// Redirect-style payment provider (form-encoded callback, MD5 param
// signature). The flow is: the authenticated client pre-creates a pending
// payment, sends the user to the provider with the record's order id as
// `out_trade_no`, and the provider later posts the signed result back here.

use std::collections::HashMap;

use actix_web::{post, web, HttpResponse};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::AuthContext;
use crate::error::{AppError, AppResult};
use crate::settlement::{settle, SettlementEvent};
use crate::signing::verify_redirect_pay_sign;
use crate::AppState;

pub const REDIRECT_PAY_PROVIDER: &str = "redirect_pay";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Decimal amount string, e.g. "5.00".
    pub amount: String,
    pub credits: i32,
}

/// Pre-creates the pending payment the provider callback will settle.
#[post("/payments")]
pub async fn create_payment(
    state: web::Data<AppState>,
    ctx: AuthContext,
    payload: web::Json<CreatePaymentRequest>,
) -> AppResult<HttpResponse> {
    if payload.credits <= 0 {
        return Err(AppError::Validation("credits must be positive".into()));
    }
    if payload.amount.parse::<f64>().map(|a| a <= 0.0).unwrap_or(true) {
        return Err(AppError::Validation("amount must be a positive decimal".into()));
    }

    state.store.ensure_account(ctx.account_id, &ctx.email).await?;
    let record = state
        .store
        .create_pending_payment(
            ctx.account_id,
            &payload.amount,
            payload.credits,
            REDIRECT_PAY_PROVIDER,
            None,
        )
        .await?;

    info!(
        "redirect-pay: pending payment {} for account {}",
        record.id, ctx.account_id
    );
    Ok(HttpResponse::Ok().json(json!({
        "payment_id": record.id,
        "out_trade_no": record.order_id,
        "amount": record.amount,
        "credits": record.credits,
    })))
}

#[derive(Debug, Deserialize)]
struct CallbackParam {
    account_id: Uuid,
    credits: i32,
}

/// Server-to-server notification from the provider. Mounted with its full
/// path outside the authenticated scope; the signature is the only
/// authentication. Non-success statuses are acknowledged and dropped.
#[utoipa::path(
    post,
    path = "/api/payments/redirect/callback",
    responses(
        (status = 200, description = "Notification acknowledged"),
        (status = 400, description = "Signature verification failed"),
    )
)]
#[post("/api/payments/redirect/callback")]
pub async fn redirect_callback(
    state: web::Data<AppState>,
    form: web::Form<HashMap<String, String>>,
) -> AppResult<HttpResponse> {
    let params = form.into_inner();

    if !verify_redirect_pay_sign(&params, &state.redirect_pay_key) {
        return Err(AppError::Verification("bad callback signature".into()));
    }

    let trade_status = params.get("trade_status").map(String::as_str).unwrap_or("");
    if trade_status != "TRADE_SUCCESS" {
        info!("redirect-pay: ignoring callback with status '{trade_status}'");
        return Ok(HttpResponse::Ok().json(json!({ "success": false, "ignored": true })));
    }

    let order_id = params
        .get("out_trade_no")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("missing out_trade_no".into()))?
        .clone();

    let param: CallbackParam = params
        .get("param")
        .ok_or_else(|| AppError::Validation("missing param".into()))
        .and_then(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| AppError::Validation(format!("malformed param: {e}")))
        })?;
    if param.credits <= 0 {
        return Err(AppError::Validation("credits must be positive".into()));
    }

    let amount = params
        .get("money")
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| "0.00".to_string());
    let email = format!("{}@accounts.local", param.account_id);

    let outcome = settle(
        state.store.as_ref(),
        SettlementEvent {
            account_id: param.account_id,
            email,
            credits: param.credits,
            order_id: order_id.clone(),
            amount,
            provider: REDIRECT_PAY_PROVIDER,
            raw: json!(params),
        },
    )
    .await?;

    if let crate::settlement::SettlementOutcome::AlreadyApplied = outcome {
        warn!("redirect-pay: duplicate notification for order {order_id}");
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
