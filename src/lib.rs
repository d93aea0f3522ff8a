pub mod api;
pub mod completions;
pub mod docs;
pub mod error;
pub mod gate;
pub mod generator;
pub mod ledger;
pub mod models;
pub mod plans;
pub mod settlement;
pub mod signing;

use std::sync::Arc;

use crate::api::checkout_client::CheckoutClient;
use crate::completions::CompletionClient;
use crate::generator::JobRunner;
use crate::ledger::LedgerStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub runner: Arc<dyn JobRunner>,
    pub completions: Arc<CompletionClient>,
    pub checkout: Arc<CheckoutClient>,
    pub jwt_secret: String,
    pub checkout_webhook_secret: String,
    pub redirect_pay_key: String,
    pub site_url: String,
    pub dev_grant_enabled: bool,
}
