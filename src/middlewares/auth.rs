use crate::config::InternalConfig;
use crate::entities::users;
use crate::error::AppError;
use crate::services::SessionService;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::rc::Rc;

/// Internal tokens may not outlive this span.
const MAX_INTERNAL_TOKEN_SECS: i64 = 6 * 3600;
const INTERNAL_SUBJECT: &str = "coreservice-accounts";

/// Endpoints reachable without a session.
const PUBLIC_PATHS: &[(&str, &str)] = &[
    ("POST", "/auth/signup"),
    ("POST", "/auth/login/phone"),
    ("POST", "/auth/login/kakao"),
    ("GET", "/methods/phone/verify"),
    ("POST", "/methods/phone/verify"),
    ("POST", "/methods/kakao/info"),
];

/// The authenticated caller, injected into request extensions.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: users::Model,
    pub session_id: String,
}

impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let current = req.extensions().get::<CurrentUser>().cloned();
        ready(current.ok_or_else(|| AppError::RequiredLogin.into()))
    }
}

#[derive(Debug, Deserialize)]
struct InternalClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct Auth {
    sessions: SessionService,
    internal: InternalConfig,
}

impl Auth {
    pub fn new(sessions: SessionService, internal: InternalConfig) -> Self {
        Self { sessions, internal }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
            internal: self.internal.clone(),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
    sessions: SessionService,
    internal: InternalConfig,
}

fn bearer_token(req: &ServiceRequest) -> Result<String, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::RequiredLogin)?;
    header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(AppError::RequiredLogin)
}

fn verify_internal_token(token: &str, config: &InternalConfig) -> Result<(), AppError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);
    validation.validate_aud = false;

    let data = decode::<InternalClaims>(
        token,
        &DecodingKey::from_secret(config.secret_key.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredAccessKey,
        _ => AppError::RequiredAccessKey,
    })?;

    if data.claims.sub != INTERNAL_SUBJECT {
        return Err(AppError::PermissionDenied);
    }
    if data.claims.exp - data.claims.iat > MAX_INTERNAL_TOKEN_SECS {
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

fn is_public(method: &str, path: &str) -> bool {
    PUBLIC_PATHS
        .iter()
        .any(|(m, p)| *m == method && *p == path)
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let sessions = self.sessions.clone();
        let internal = self.internal.clone();

        Box::pin(async move {
            let method = req.method().as_str().to_string();
            let path = req.path().to_string();

            // CORS preflights carry no credentials.
            if method == "OPTIONS" || is_public(&method, &path) {
                return service.call(req).await;
            }

            if path.starts_with("/internal") {
                let token = bearer_token(&req).map_err(|_| AppError::RequiredAccessKey)?;
                verify_internal_token(&token, &internal)?;
                return service.call(req).await;
            }

            let token = bearer_token(&req)?;
            let (user, session) = sessions.get_user_by_session(&token).await?;
            req.extensions_mut().insert(CurrentUser {
                user,
                session_id: session.session_id,
            });
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn config() -> InternalConfig {
        InternalConfig {
            secret_key: "test-secret".into(),
            issuer: "coreservice".into(),
        }
    }

    fn sign(sub: &str, iat: i64, exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": sub, "iss": "coreservice", "iat": iat, "exp": exp }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn accepts_a_valid_internal_token() {
        let now = Utc::now().timestamp();
        let token = sign(INTERNAL_SUBJECT, now, now + 3600);
        assert!(verify_internal_token(&token, &config()).is_ok());
    }

    #[test]
    fn rejects_wrong_subject() {
        let now = Utc::now().timestamp();
        let token = sign("someone-else", now, now + 3600);
        let err = verify_internal_token(&token, &config()).unwrap_err();
        assert_eq!(err.opcode(), 103);
    }

    #[test]
    fn rejects_overlong_lifetime() {
        let now = Utc::now().timestamp();
        let token = sign(INTERNAL_SUBJECT, now, now + 7 * 3600);
        let err = verify_internal_token(&token, &config()).unwrap_err();
        assert_eq!(err.opcode(), 103);
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now().timestamp();
        let token = sign(INTERNAL_SUBJECT, now - 7200, now - 3600);
        let err = verify_internal_token(&token, &config()).unwrap_err();
        assert_eq!(err.opcode(), 102);
    }

    #[test]
    fn public_path_table() {
        assert!(is_public("POST", "/auth/signup"));
        assert!(is_public("POST", "/methods/phone/verify"));
        assert!(!is_public("GET", "/auth"));
        assert!(!is_public("GET", "/internal/users"));
    }
}
