use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::checkout::create_session,
        crate::api::webhooks::checkout_webhook,
        crate::api::redirect_pay::redirect_callback,
        crate::api::projects::generate
    ),
    components(
        schemas(
            crate::api::checkout::CreateSessionRequest,
            crate::api::webhooks::CheckoutEvent,
            crate::api::webhooks::CheckoutEventData,
            crate::api::webhooks::CheckoutMetadata,
            crate::api::redirect_pay::CreatePaymentRequest,
            crate::api::projects::QuestionsRequest,
            crate::api::projects::GenerateRequest
        )
    ),
    tags(
        (name = "payments", description = "Credit pack purchases"),
        (name = "webhooks", description = "Payment provider callbacks"),
        (name = "projects", description = "Document bundle generation")
    )
)]
pub struct ApiDoc;
