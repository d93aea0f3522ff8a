use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use vibeguide::api;
use vibeguide::ledger::{LedgerStore, MemoryLedger, NEW_ACCOUNT_FREE_CREDITS};
use vibeguide::models::PaymentStatus;

mod support;

macro_rules! protected_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state)
                .service(api::account::plans)
                .service(
                    web::scope("/api")
                        .wrap(api::auth::JwtVerify::new(support::JWT_SECRET))
                        .service(api::account::me)
                        .service(api::account::credits)
                        .service(api::account::dev_recharge)
                        .service(api::checkout::create_session)
                        .service(api::redirect_pay::create_payment)
                        .service(api::projects::save)
                        .service(api::projects::list)
                        .service(api::projects::get_one),
                ),
        )
        .await
    };
}

#[actix_web::test]
async fn me_creates_the_account_with_the_free_grant() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let account_id = Uuid::new_v4();
    let req = TestRequest::get()
        .uri("/api/me")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "dev@example.com");
    assert_eq!(body["credits"], NEW_ACCOUNT_FREE_CREDITS);
}

#[actix_web::test]
async fn credits_reports_affordability() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let account_id = Uuid::new_v4();
    let req = TestRequest::get()
        .uri("/api/credits")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["sufficient"], true);
    assert_eq!(body["credits"], NEW_ACCOUNT_FREE_CREDITS);

    store
        .debit(account_id, NEW_ACCOUNT_FREE_CREDITS)
        .await
        .unwrap();
    let req = TestRequest::get()
        .uri("/api/credits")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["sufficient"], false);
    assert_eq!(body["credits"], 0);
}

#[actix_web::test]
async fn checkout_session_leaves_a_pending_record_keyed_by_session_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/checkout/sessions");
            then.status(200).json_body(json!({
                "id": "cs_mock_1",
                "url": "https://pay.example/cs_mock_1"
            }));
        })
        .await;

    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(
        support::StateBuilder::new(Arc::clone(&store))
            .checkout_base(server.base_url())
            .build(),
    );
    let app = protected_app!(state);

    let account_id = Uuid::new_v4();
    let req = TestRequest::post()
        .uri("/api/checkout/session")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .set_json(json!({
            "plan_id": "pro",
            "account_id": account_id,
            "account_email": "dev@example.com"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["session_id"], "cs_mock_1");
    assert_eq!(body["url"], "https://pay.example/cs_mock_1");
    mock.assert_async().await;

    let record = store
        .find_payment_by_order_id("cs_mock_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
    assert_eq!(record.credits, 12);
    assert_eq!(record.amount, "5.00");

    // Pending records grant nothing until the webhook lands.
    let account = store.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.credits, NEW_ACCOUNT_FREE_CREDITS);
}

#[actix_web::test]
async fn checkout_session_rejects_identity_mismatch() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let req = TestRequest::post()
        .uri("/api/checkout/session")
        .insert_header(support::bearer(Uuid::new_v4(), "dev@example.com"))
        .set_json(json!({
            "plan_id": "pro",
            "account_id": Uuid::new_v4(),
            "account_email": "dev@example.com"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn checkout_session_rejects_unknown_plan() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let account_id = Uuid::new_v4();
    let req = TestRequest::post()
        .uri("/api/checkout/session")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .set_json(json!({
            "plan_id": "enterprise",
            "account_id": account_id,
            "account_email": "dev@example.com"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn redirect_payment_precreate_assigns_out_trade_no() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let account_id = Uuid::new_v4();
    let req = TestRequest::post()
        .uri("/api/payments")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .set_json(json!({ "amount": "5.00", "credits": 12 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;

    let out_trade_no = body["out_trade_no"].as_str().unwrap();
    assert_eq!(body["payment_id"], out_trade_no);
    let record = store
        .find_payment_by_order_id(out_trade_no)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn dev_recharge_is_gated_behind_the_flag() {
    let store = Arc::new(MemoryLedger::new());
    let account_id = Uuid::new_v4();

    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);
    let req = TestRequest::get()
        .uri("/api/dev/recharge?credits=10")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let state = web::Data::new(
        support::StateBuilder::new(Arc::clone(&store))
            .dev_grant(true)
            .build(),
    );
    let app = protected_app!(state);
    let req = TestRequest::get()
        .uri("/api/dev/recharge?credits=10")
        .insert_header(support::bearer(account_id, "dev@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["credits"], NEW_ACCOUNT_FREE_CREDITS + 10);
}

#[actix_web::test]
async fn plans_catalog_is_public() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let req = TestRequest::get().uri("/api/plans").to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["id"], "starter");
    assert_eq!(plans[1]["credits"], 12);
}

#[actix_web::test]
async fn saving_a_draft_then_updating_it_keeps_one_project() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let owner = Uuid::new_v4();
    let req = TestRequest::post()
        .uri("/api/projects")
        .insert_header(support::bearer(owner, "dev@example.com"))
        .set_json(json!({
            "step1_data": "A small checklist app for field technicians"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Untitled project");
    assert_eq!(body["status"], "draft");
    // Description falls back to the step-one text.
    assert_eq!(body["description"], "A small checklist app for field technicians");
    let project_id = body["id"].as_str().unwrap().to_string();

    let req = TestRequest::post()
        .uri("/api/projects")
        .insert_header(support::bearer(owner, "dev@example.com"))
        .set_json(json!({
            "project_id": project_id,
            "title": "Checklist app",
            "step1_data": "A small checklist app for field technicians",
            "step2_data": "Web only",
            "status": "completed"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"].as_str().unwrap(), project_id);
    assert_eq!(body["title"], "Checklist app");
    assert_eq!(body["status"], "completed");

    assert_eq!(store.list_projects(owner).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn saving_with_a_bogus_status_is_rejected() {
    let store = Arc::new(MemoryLedger::new());
    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let req = TestRequest::post()
        .uri("/api/projects")
        .insert_header(support::bearer(Uuid::new_v4(), "dev@example.com"))
        .set_json(json!({ "status": "archived" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn projects_are_listed_and_fetched_per_owner() {
    let store = Arc::new(MemoryLedger::new());
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let draft = vibeguide::models::ProjectDraft {
        title: "Checklist app".to_string(),
        description: "A small checklist app".to_string(),
        step1_data: Some("A small checklist app".to_string()),
        step2_data: Some("Web only".to_string()),
        documents: Some(json!({ "prd": "# PRD" })),
        status: "completed".to_string(),
    };
    let project = store.insert_project(owner, &draft).await.unwrap();

    let state = web::Data::new(support::StateBuilder::new(Arc::clone(&store)).build());
    let app = protected_app!(state);

    let req = TestRequest::get()
        .uri("/api/projects")
        .insert_header(support::bearer(owner, "dev@example.com"))
        .to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);

    let req = TestRequest::get()
        .uri(&format!("/api/projects/{}", project.id))
        .insert_header(support::bearer(owner, "dev@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["documents"]["prd"], "# PRD");

    // Someone else's token sees neither the listing entry nor the project.
    let req = TestRequest::get()
        .uri(&format!("/api/projects/{}", project.id))
        .insert_header(support::bearer(stranger, "other@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
