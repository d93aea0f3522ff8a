// src/api/checkout_client.rs
//
// Minimal client for the hosted-checkout provider. Authorization: bearer
// API key. The session id the provider returns becomes our payment order id,
// and the metadata we attach comes back verbatim on the completion webhook.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("checkout api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<CheckoutError> for AppError {
    fn from(value: CheckoutError) -> Self {
        match value {
            CheckoutError::Http(e) => AppError::Http(e),
            other => AppError::Provider(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSessionPayload {
    pub amount: i64,
    pub currency: String,
    pub product_name: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: SessionMetadata,
}

#[derive(Debug, Serialize)]
pub struct SessionMetadata {
    pub account_id: Uuid,
    pub plan_id: String,
    pub credits: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct CheckoutClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CheckoutClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn create_session(
        &self,
        payload: CreateSessionPayload,
    ) -> Result<CheckoutSession, CheckoutError> {
        let resp = self
            .http
            .post(format!(
                "{}/v1/checkout/sessions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<CheckoutSession>(&body)
            .map_err(|e| CheckoutError::InvalidResponse(format!("{e}; body={body}")))
    }
}
