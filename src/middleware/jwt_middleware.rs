/// JWT Authentication Middleware
///
/// Validates access tokens from the `accessToken` cookie (with an
/// `Authorization: Bearer` fallback) and injects the claims into request
/// extensions for route handlers. Partial tokens from a pending 2FA
/// handshake are rejected here; only the 2FA continuation endpoint, which
/// sits outside this middleware, accepts them.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::validate_access_token;
use crate::configuration::JwtSettings;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// JWT middleware for protecting routes
///
/// Must be applied to routes that require a fully authenticated session.
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

/// Pull the access token from the cookie, falling back to the Bearer header
fn extract_access_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

fn reject<B>(req: ServiceRequest, message: &'static str, code: &'static str) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
where
    B: 'static,
{
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": message,
        "code": code
    }));
    drop(req);
    Box::pin(async move {
        Err(actix_web::error::InternalError::from_response(message, response).into())
    })
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match extract_access_token(&req) {
            Some(token) => token,
            None => {
                tracing::warn!("Missing access token cookie and Authorization header");
                return reject(req, "Missing access token", "UNAUTHORIZED");
            }
        };

        match validate_access_token(&token, &self.jwt_config) {
            Ok(claims) if !claims.is_authenticated => {
                tracing::warn!(
                    user_id = %claims.sub,
                    "Partial token presented to a protected route"
                );
                reject(req, "Two-factor authentication not completed", "TWO_FA_PENDING")
            }
            Ok(claims) => {
                req.extensions_mut().insert(claims.clone());

                tracing::debug!(
                    user_id = %claims.sub,
                    email = %claims.email,
                    "JWT validated successfully"
                );

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!("JWT validation failed: {}", e);
                reject(req, "Invalid or expired token", "TOKEN_INVALID")
            }
        }
    }
}
