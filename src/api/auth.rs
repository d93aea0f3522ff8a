// src/api/auth.rs

use actix_web::body::MessageBody;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::task::{Context, Poll};
use uuid::Uuid;

use crate::error::AppError;

/// Token claims issued by the identity frontend. `sub` carries the account
/// uuid; the email claim is optional and falls back to a synthetic address.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: usize,
}

/// Verified caller identity, inserted into request extensions by
/// `JwtVerify` and pulled out by handlers via the extractor impl.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub email: String,
}

impl FromRequest for AuthContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthContext>()
                .cloned()
                .ok_or_else(|| AppError::Auth.into()),
        )
    }
}

/// Middleware that:
/// - takes `Authorization: Bearer <jwt>`
/// - validates the JWT against the configured secret
/// - puts an `AuthContext` into `req.extensions_mut()`
pub struct JwtVerify {
    secret: Rc<String>,
}

impl JwtVerify {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Rc::new(secret.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtVerify
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtVerifyInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtVerifyInner {
            service,
            secret: Rc::clone(&self.secret),
        }))
    }
}

pub struct JwtVerifyInner<S> {
    service: S,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for JwtVerifyInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth_header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        let Some(token) = auth_header.strip_prefix("Bearer ") else {
            return Box::pin(async move { Err(AppError::Auth.into()) });
        };

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        );

        let claims = match decoded {
            Ok(data) => data.claims,
            Err(_) => return Box::pin(async move { Err(AppError::Auth.into()) }),
        };

        let Ok(account_id) = claims.sub.parse::<Uuid>() else {
            return Box::pin(async move { Err(AppError::Auth.into()) });
        };
        let email = claims
            .email
            .unwrap_or_else(|| format!("{account_id}@accounts.local"));

        req.extensions_mut()
            .insert(AuthContext { account_id, email });
        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}
