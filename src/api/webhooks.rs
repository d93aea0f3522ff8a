// src/api/webhooks.rs

use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::checkout::CHECKOUT_PROVIDER;
use crate::error::{AppError, AppResult};
use crate::settlement::{settle, SettlementEvent, SettlementOutcome};
use crate::signing::verify_hmac_sha256_hex;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Checkout-Signature";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: CheckoutEventData,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutEventData {
    pub id: String,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub metadata: Option<CheckoutMetadata>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutMetadata {
    pub account_id: Option<String>,
    pub plan_id: Option<String>,
    pub credits: Option<String>,
}

/// Completion webhook from the hosted-checkout provider. Signature is
/// HMAC-SHA256 over the raw body; anything verified but malformed is
/// acknowledged with 200 so the provider stops retrying.
#[utoipa::path(
    post,
    path = "/webhooks/checkout",
    request_body = CheckoutEvent,
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Missing or invalid signature"),
    )
)]
#[post("/webhooks/checkout")]
pub async fn checkout_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    if state.checkout_webhook_secret.is_empty() {
        return Err(AppError::Verification("webhook secret not configured".into()));
    }
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Verification("missing signature header".into()))?;
    if !verify_hmac_sha256_hex(&state.checkout_webhook_secret, &body, signature) {
        return Err(AppError::Verification("signature mismatch".into()));
    }

    let event: CheckoutEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook body: {e}")))?;

    if event.event_type != "checkout.session.completed" {
        info!("webhook: ignoring event type {}", event.event_type);
        return Ok(HttpResponse::Ok().json(json!({ "received": true, "ignored": true })));
    }

    let Some(parsed) = parse_metadata(&event.data) else {
        // A verified event we cannot attribute: log loudly, ack quietly.
        warn!(
            "webhook: session {} completed with unusable metadata, skipping settlement",
            event.data.id
        );
        return Ok(HttpResponse::Ok().json(json!({ "received": true, "ignored": true })));
    };
    let (account_id, credits) = parsed;

    let email = event
        .data
        .customer_email
        .clone()
        .unwrap_or_else(|| format!("{account_id}@accounts.local"));
    let amount = event
        .data
        .amount_total
        .map(crate::plans::amount_string)
        .unwrap_or_else(|| "0.00".to_string());

    let outcome = settle(
        state.store.as_ref(),
        SettlementEvent {
            account_id,
            email,
            credits,
            order_id: event.data.id.clone(),
            amount,
            provider: CHECKOUT_PROVIDER,
            raw: serde_json::from_slice(&body).unwrap_or(json!(null)),
        },
    )
    .await?;

    if outcome == SettlementOutcome::AlreadyApplied {
        info!("webhook: duplicate delivery for session {}", event.data.id);
    }
    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

fn parse_metadata(data: &CheckoutEventData) -> Option<(Uuid, i32)> {
    let metadata = data.metadata.as_ref()?;
    let account_id = metadata.account_id.as_deref()?.parse::<Uuid>().ok()?;
    let credits = metadata.credits.as_deref()?.parse::<i32>().ok()?;
    if credits <= 0 {
        return None;
    }
    Some((account_id, credits))
}
