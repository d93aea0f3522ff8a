#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use vibeguide::api::auth::Claims;
use vibeguide::api::checkout_client::CheckoutClient;
use vibeguide::completions::CompletionClient;
use vibeguide::error::{AppError, AppResult};
use vibeguide::generator::{
    DocumentGenerator, DocumentSet, GenerationJob, JobRunner, DOCUMENT_KINDS,
};
use vibeguide::ledger::MemoryLedger;
use vibeguide::AppState;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const REDIRECT_PAY_KEY: &str = "test-merchant-key";

/// How a [`FakeRunner`] should behave when invoked.
pub enum RunnerMode {
    Succeed,
    Fail,
    Exhausted,
}

/// Scripted generation backend: counts invocations so tests can assert the
/// gate short-circuited (or didn't).
pub struct FakeRunner {
    mode: RunnerMode,
    calls: AtomicUsize,
}

impl FakeRunner {
    pub fn new(mode: RunnerMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobRunner for FakeRunner {
    async fn run(&self, _job: &GenerationJob) -> AppResult<DocumentSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            RunnerMode::Succeed => {
                let mut set = DocumentSet::default();
                for kind in &DOCUMENT_KINDS {
                    set.documents
                        .insert(kind.id.to_string(), format!("# {}", kind.title));
                }
                Ok(set)
            }
            RunnerMode::Fail => Err(AppError::Provider("scripted failure".into())),
            RunnerMode::Exhausted => Err(AppError::UpstreamExhausted),
        }
    }
}

pub struct StateBuilder {
    store: Arc<MemoryLedger>,
    runner: Arc<dyn JobRunner>,
    completions_base: String,
    checkout_base: String,
    dev_grant_enabled: bool,
    task_timeout: Duration,
    real_generator: bool,
}

impl StateBuilder {
    pub fn new(store: Arc<MemoryLedger>) -> Self {
        Self {
            store,
            runner: FakeRunner::new(RunnerMode::Succeed),
            completions_base: "http://127.0.0.1:1".to_string(),
            checkout_base: "http://127.0.0.1:1".to_string(),
            dev_grant_enabled: false,
            task_timeout: Duration::from_secs(5),
            real_generator: false,
        }
    }

    pub fn runner(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Point the completion client at a mock server and route generation
    /// through the real fan-out instead of a scripted runner.
    pub fn completions_base(mut self, base: impl Into<String>) -> Self {
        self.completions_base = base.into();
        self.real_generator = true;
        self
    }

    pub fn checkout_base(mut self, base: impl Into<String>) -> Self {
        self.checkout_base = base.into();
        self
    }

    pub fn dev_grant(mut self, enabled: bool) -> Self {
        self.dev_grant_enabled = enabled;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn build(self) -> AppState {
        let completions = Arc::new(CompletionClient::new(self.completions_base, "test-key"));
        let runner: Arc<dyn JobRunner> = if self.real_generator {
            Arc::new(DocumentGenerator::new(
                Arc::clone(&completions),
                self.task_timeout,
            ))
        } else {
            self.runner
        };
        AppState {
            store: self.store,
            runner,
            completions,
            checkout: Arc::new(CheckoutClient::new(self.checkout_base, "test-key")),
            jwt_secret: JWT_SECRET.to_string(),
            checkout_webhook_secret: WEBHOOK_SECRET.to_string(),
            redirect_pay_key: REDIRECT_PAY_KEY.to_string(),
            site_url: "http://localhost:3000".to_string(),
            dev_grant_enabled: self.dev_grant_enabled,
        }
    }
}

pub fn auth_token(account_id: Uuid, email: &str) -> String {
    let claims = Claims {
        sub: account_id.to_string(),
        email: Some(email.to_string()),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode test token")
}

pub fn bearer(account_id: Uuid, email: &str) -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", auth_token(account_id, email)),
    )
}
