/// Bearer-token authentication middleware for Axum
///
/// Validates the access token from the `Authorization: Bearer <token>` header
/// and inserts an [`AuthContext`] into the request extensions. Handlers then
/// extract it with `Extension<AuthContext>`.
///
/// Authentication only establishes *who* is calling. What they may do is
/// decided per request by [`crate::auth::authorization::Policy`].
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use tracker_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     auth.user_id.to_string()
/// }
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(create_jwt_middleware("secret".to_string())));
/// ```

use std::future::Future;
use std::pin::Pin;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Authorization header is not a bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
            _ => AuthError::InvalidToken(format!("Invalid token: {}", err)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Extracts the bearer token from a request's `Authorization` header
pub fn bearer_token(req: &Request) -> Result<&str, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// JWT authentication middleware
///
/// # Errors
///
/// - 401 if the header is missing, or the token is invalid or expired
/// - 400 if the header is not a bearer token
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&req)?;
    let claims = validate_access_token(token, &secret)?;

    req.extensions_mut().insert(AuthContext::new(claims.sub));

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure for `axum::middleware::from_fn`
///
/// Takes the secret by value so the layer owns it and stays `'static`.
pub fn create_jwt_middleware(
    secret: String,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token_pair;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::Service as _;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    /// Router built from a borrowed secret that does not outlive this call
    fn whoami_app(secret: &str) -> Router {
        async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
            auth.user_id.to_string()
        }

        Router::new()
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn(create_jwt_middleware(secret.to_string())))
    }

    fn request_with_header(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/v1/projects");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = request_with_header(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");

        let req = request_with_header(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&req), Err(AuthError::InvalidFormat(_))));

        let req = request_with_header(None);
        assert!(matches!(bearer_token(&req), Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert_eq!(AuthError::from(JwtError::Expired).to_string(), "Token expired");
        assert_eq!(AuthError::from(JwtError::InvalidIssuer).to_string(), "Invalid token issuer");
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::InvalidToken("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_layer_owns_secret() {
        let mut app = {
            let secret = SECRET.to_string();
            whoami_app(&secret)
        };
        let user_id = Uuid::new_v4();
        let (access, _) = issue_token_pair(user_id, SECRET).unwrap();

        let req = axum::http::Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {}", access))
            .body(Body::empty())
            .unwrap();
        let response = app.call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, user_id.to_string().as_bytes());

        let req = axum::http::Request::builder().uri("/whoami").body(Body::empty()).unwrap();
        let response = app.call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
