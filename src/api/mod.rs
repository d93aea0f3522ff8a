pub mod account;
pub mod auth;
pub mod checkout;
pub mod checkout_client;
pub mod projects;
pub mod redirect_pay;
pub mod webhooks;
