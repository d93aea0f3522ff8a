// src/api/projects.rs

use actix_web::{get, post, web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::AuthContext;
use crate::error::{AppError, AppResult};
use crate::gate;
use crate::generator::{generate_questions, GenerationJob};
use crate::models::ProjectDraft;
use crate::AppState;

const MIN_DESCRIPTION_CHARS: usize = 20;

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuestionsRequest {
    pub description: String,
}

/// Step two: turn the raw idea into clarification questions. Free of charge;
/// only the final bundle generation costs a credit.
#[post("/projects/questions")]
pub async fn questions(
    state: web::Data<AppState>,
    _ctx: AuthContext,
    payload: web::Json<QuestionsRequest>,
) -> AppResult<HttpResponse> {
    let description = payload.description.trim();
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "description must be at least {MIN_DESCRIPTION_CHARS} characters"
        )));
    }
    let questions = generate_questions(state.completions.as_ref(), description).await?;
    Ok(HttpResponse::Ok().json(json!({ "questions": questions })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Existing draft to attach the bundle to; a fresh project otherwise.
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    /// Project description from step one.
    pub step1: String,
    /// Answered clarification questions from step two.
    pub step2: String,
}

/// Step three: generate the five-document bundle. One credit, debited only
/// after the bundle exists; the finished project is persisted before the
/// response goes out.
#[utoipa::path(
    post,
    path = "/api/projects/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Bundle generated and saved"),
        (status = 402, description = "Balance is empty, recharge needed"),
        (status = 502, description = "Completion provider out of quota"),
    )
)]
#[post("/projects/generate")]
pub async fn generate(
    state: web::Data<AppState>,
    ctx: AuthContext,
    payload: web::Json<GenerateRequest>,
) -> AppResult<HttpResponse> {
    let step1 = payload.step1.trim();
    let step2 = payload.step2.trim();
    if step1.is_empty() || step2.is_empty() {
        return Err(AppError::Validation(
            "both project description and answers are required".into(),
        ));
    }

    let job = GenerationJob {
        account_id: ctx.account_id,
        email: ctx.email.clone(),
        step1: step1.to_string(),
        step2: step2.to_string(),
    };
    let result = gate::spend(state.store.as_ref(), state.runner.as_ref(), &job).await?;

    let draft = ProjectDraft {
        title: payload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled project")
            .to_string(),
        description: truncate_chars(step1, 100),
        step1_data: Some(step1.to_string()),
        step2_data: Some(step2.to_string()),
        documents: Some(result.documents.to_value()),
        status: "completed".to_string(),
    };

    let project = match payload.project_id {
        Some(id) => state.store.update_project(id, ctx.account_id, &draft).await?,
        None => state.store.insert_project(ctx.account_id, &draft).await?,
    };

    info!(
        "projects: bundle generated for project {} (account {})",
        project.id, ctx.account_id
    );
    Ok(HttpResponse::Ok().json(json!({
        "project_id": project.id,
        "documents": result.documents.to_value(),
        "credits": result.balance,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveProjectRequest {
    /// Update this project when present; insert a fresh one otherwise.
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub step1_data: Option<String>,
    pub step2_data: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub documents: Option<serde_json::Value>,
    pub status: Option<String>,
}

/// Saves a draft (or a finished bundle the client already holds) without
/// touching the balance.
#[post("/projects")]
pub async fn save(
    state: web::Data<AppState>,
    ctx: AuthContext,
    payload: web::Json<SaveProjectRequest>,
) -> AppResult<HttpResponse> {
    let payload = payload.into_inner();
    let status = payload.status.unwrap_or_else(|| "draft".to_string());
    if status != "draft" && status != "completed" {
        return Err(AppError::Validation(format!("unknown status '{status}'")));
    }

    let description = payload
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| {
            payload
                .step1_data
                .as_deref()
                .map(|s| truncate_chars(s.trim(), 100))
        })
        .unwrap_or_default();
    let draft = ProjectDraft {
        title: payload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled project")
            .to_string(),
        description,
        step1_data: payload.step1_data,
        step2_data: payload.step2_data,
        documents: payload.documents,
        status,
    };

    let project = match payload.project_id {
        Some(id) => state.store.update_project(id, ctx.account_id, &draft).await?,
        None => state.store.insert_project(ctx.account_id, &draft).await?,
    };
    Ok(HttpResponse::Ok().json(project))
}

#[get("/projects")]
pub async fn list(state: web::Data<AppState>, ctx: AuthContext) -> AppResult<HttpResponse> {
    let projects = state.store.list_projects(ctx.account_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "projects": projects })))
}

#[get("/projects/{id}")]
pub async fn get_one(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = state
        .store
        .get_project(path.into_inner(), ctx.account_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(project))
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncation_is_char_safe() {
        let cn = "需求".repeat(80);
        let cut = truncate_chars(&cn, 100);
        assert_eq!(cut.chars().count(), 100);
        assert!(cn.starts_with(&cut));
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
