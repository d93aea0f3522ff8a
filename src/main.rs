// src/main.rs
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;

use vibeguide::api::checkout_client::CheckoutClient;
use vibeguide::completions::{CompletionClient, DEFAULT_BASE_URL};
use vibeguide::generator::DocumentGenerator;
use vibeguide::ledger::PgLedger;
use vibeguide::{api, docs, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(docs::ApiDoc::openapi())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET required");

    let checkout_api_key = env::var("CHECKOUT_API_KEY").expect("CHECKOUT_API_KEY required");
    let checkout_base_url =
        env::var("CHECKOUT_BASE_URL").unwrap_or_else(|_| "https://api.checkout.example".into());
    let checkout_webhook_secret =
        env::var("CHECKOUT_WEBHOOK_SECRET").expect("CHECKOUT_WEBHOOK_SECRET required");
    let redirect_pay_key = env::var("REDIRECT_PAY_KEY").expect("REDIRECT_PAY_KEY required");

    let openrouter_api_key = env::var("OPENROUTER_API_KEY").expect("OPENROUTER_API_KEY required");
    let openrouter_base_url =
        env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
    let dev_grant_enabled = env::var("DEV_GRANT_ENABLED")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let generation_timeout = env::var("GENERATION_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);

    let completions = Arc::new(
        CompletionClient::new(openrouter_base_url, openrouter_api_key)
            .with_referer(site_url.clone()),
    );
    let runner = Arc::new(DocumentGenerator::new(
        Arc::clone(&completions),
        Duration::from_secs(generation_timeout),
    ));
    let checkout = Arc::new(CheckoutClient::new(checkout_base_url, checkout_api_key));

    let state = web::Data::new(AppState {
        store: Arc::new(PgLedger::new(pool)),
        runner,
        completions,
        checkout,
        jwt_secret: jwt_secret.clone(),
        checkout_webhook_secret,
        redirect_pay_key,
        site_url,
        dev_grant_enabled,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .route("/api-docs/openapi.json", web::get().to(openapi_json))
            // Public routes (full paths)
            .service(api::account::plans)
            .service(api::webhooks::checkout_webhook)
            .service(api::redirect_pay::redirect_callback)
            // Authenticated API
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtVerify::new(jwt_secret.clone()))
                    .service(api::account::me)
                    .service(api::account::credits)
                    .service(api::account::dev_recharge)
                    .service(api::checkout::create_session)
                    .service(api::redirect_pay::create_payment)
                    .service(api::projects::questions)
                    .service(api::projects::generate)
                    .service(api::projects::save)
                    .service(api::projects::list)
                    .service(api::projects::get_one),
            )
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
