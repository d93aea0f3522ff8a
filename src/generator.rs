// src/generator.rs
//
// Five-document bundle generation. Each document kind is produced by one
// completion call; the five calls fan out concurrently with a per-task
// timeout. A slow or failed task degrades to a placeholder so a bundle is
// always complete; a provider quota failure aborts the whole job instead,
// since every remaining task would fail the same way.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use log::{error, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::completions::{CompletionClient, CompletionError};
use crate::error::{AppError, AppResult};

pub struct DocumentKind {
    pub id: &'static str,
    pub title: &'static str,
    brief: &'static str,
}

pub const DOCUMENT_KINDS: [DocumentKind; 5] = [
    DocumentKind {
        id: "user_journey",
        title: "User Journey Map",
        brief: "Walk through the personas, their goals, and each stage of their journey, \
                including pain points and touchpoints.",
    },
    DocumentKind {
        id: "prd",
        title: "Product Requirements Document",
        brief: "Cover product overview, target users, feature list with priorities, and \
                acceptance criteria for the MVP.",
    },
    DocumentKind {
        id: "frontend_design",
        title: "Front-End Design Document",
        brief: "Describe the page structure, component breakdown, state management, and \
                visual style guidelines.",
    },
    DocumentKind {
        id: "backend_design",
        title: "Back-End Design Document",
        brief: "Describe the API surface, service layering, authentication flow, and \
                third-party integrations.",
    },
    DocumentKind {
        id: "database_design",
        title: "Database Design Document",
        brief: "List the tables, columns, relationships, and indexes, with a short note \
                on each design choice.",
    },
];

fn prompt_for(kind: &DocumentKind, step1: &str, step2: &str) -> String {
    format!(
        "You are a senior product consultant. Based on the project details below, \
         write a complete \"{title}\" in Markdown, in the same language as the \
         project description. {brief}\n\n\
         ## Project description\n{step1}\n\n\
         ## Requirement clarifications\n{step2}\n\n\
         Output only the document body, starting with a top-level heading.",
        title = kind.title,
        brief = kind.brief,
    )
}

fn placeholder_for(kind: &DocumentKind) -> String {
    format!("# {}\n\nGeneration failed, please retry.", kind.title)
}

#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub account_id: Uuid,
    pub email: String,
    /// Project description collected in step one.
    pub step1: String,
    /// Answered clarification questions from step two.
    pub step2: String,
}

/// The finished bundle, keyed by document kind id.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub documents: BTreeMap<String, String>,
}

impl DocumentSet {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.documents).unwrap_or(Value::Null)
    }
}

#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &GenerationJob) -> AppResult<DocumentSet>;
}

pub struct DocumentGenerator {
    client: Arc<CompletionClient>,
    task_timeout: Duration,
}

impl DocumentGenerator {
    pub fn new(client: Arc<CompletionClient>, task_timeout: Duration) -> Self {
        Self {
            client,
            task_timeout,
        }
    }
}

enum TaskOutcome {
    Text(String),
    Degraded,
    Quota,
}

#[async_trait]
impl JobRunner for DocumentGenerator {
    async fn run(&self, job: &GenerationJob) -> AppResult<DocumentSet> {
        let tasks = DOCUMENT_KINDS.iter().map(|kind| {
            let client = Arc::clone(&self.client);
            let prompt = prompt_for(kind, &job.step1, &job.step2);
            let timeout = self.task_timeout;
            async move {
                match tokio::time::timeout(timeout, client.chat(&prompt)).await {
                    Ok(Ok(text)) => (kind, TaskOutcome::Text(text)),
                    Ok(Err(CompletionError::Quota)) => (kind, TaskOutcome::Quota),
                    Ok(Err(err)) => {
                        error!("generator: {} failed: {err}", kind.id);
                        (kind, TaskOutcome::Degraded)
                    }
                    Err(_) => {
                        warn!(
                            "generator: {} timed out after {:?}",
                            kind.id, timeout
                        );
                        (kind, TaskOutcome::Degraded)
                    }
                }
            }
        });

        let mut set = DocumentSet::default();
        for (kind, outcome) in join_all(tasks).await {
            match outcome {
                TaskOutcome::Text(text) => {
                    set.documents.insert(kind.id.to_string(), text);
                }
                TaskOutcome::Degraded => {
                    set.documents
                        .insert(kind.id.to_string(), placeholder_for(kind));
                }
                TaskOutcome::Quota => return Err(AppError::UpstreamExhausted),
            }
        }
        Ok(set)
    }
}

/// Turns a raw project description into clarification questions, one per line.
pub async fn generate_questions(
    client: &CompletionClient,
    description: &str,
) -> AppResult<Vec<String>> {
    let prompt = format!(
        "You are a senior product consultant. A user describes a project idea below. \
         Ask 3 to 5 concise clarification questions that would let you write a full \
         set of design documents. Reply in the same language as the description, one \
         question per line, with no numbering and no extra commentary.\n\n{description}"
    );
    let answer = match client.chat(&prompt).await {
        Ok(answer) => answer,
        Err(CompletionError::Quota) => return Err(AppError::UpstreamExhausted),
        Err(err) => return Err(AppError::Provider(err.to_string())),
    };
    let questions: Vec<String> = answer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if questions.is_empty() {
        return Err(AppError::Provider(
            "completion produced no questions".into(),
        ));
    }
    Ok(questions)
}
