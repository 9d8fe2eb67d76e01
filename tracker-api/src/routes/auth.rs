/// Account endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create an account and log in
/// - `POST /v1/auth/login` - Exchange username and password for tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
/// - `GET /v1/auth/me` - The caller's account, groups and permissions
///
/// New accounts belong to no group; an administrator assigns roles.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tracker_shared::{
    auth::{jwt, middleware::AuthContext, password, principal::Principal},
    models::user::{CreateUser, User},
};
use uuid::Uuid;
use validator::Validate;

/// Field name used for errors that involve more than one field
pub const NON_FIELD: &str = "__all__";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "This field is required"))]
    pub password: String,

    #[validate(length(min = 1, message = "This field is required"))]
    pub password_confirm: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

impl RegisterRequest {
    /// Field rules plus the cross-field rules
    pub fn check(&self) -> Result<(), ApiError> {
        let mut details = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => validation_details(&errors),
        };

        if !is_valid_username(&self.username) && !self.username.is_empty() {
            details.push(ValidationErrorDetail::new(
                "username",
                "Username may contain only letters, digits and @/./+/-/_",
            ));
        }

        if !self.password.is_empty()
            && !self.password_confirm.is_empty()
            && self.password != self.password_confirm
        {
            details.push(ValidationErrorDetail::new(NON_FIELD, "Passwords do not match!"));
        }

        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            details.push(ValidationErrorDetail::new(
                NON_FIELD,
                "At least one of the fields (first_name, last_name) must be filled.",
            ));
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(details))
        }
    }
}

/// Letters, digits and `@ . + - _`
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "This field is required"))]
    pub password: String,
}

/// Tokens handed out on register and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    pub token_type: &'static str,
}

impl TokenResponse {
    fn issue(user_id: Uuid, secret: &str) -> ApiResult<Self> {
        let (access_token, refresh_token) = jwt::issue_token_pair(user_id, secret)?;

        Ok(Self {
            user_id,
            access_token,
            refresh_token,
            token_type: "Bearer",
        })
    }
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// The caller's account with roles and effective permissions
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,

    pub full_name: String,

    /// Sorted group names
    pub groups: Vec<String>,

    /// Sorted permission codenames
    pub permissions: Vec<String>,
}

/// Register a new user and log them in
///
/// # Errors
///
/// - `422 Unprocessable Entity`: field or cross-field validation failed
/// - `409 Conflict`: username already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.check()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            password_hash,
        },
    )
    .await?;

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(TokenResponse::issue(user.id, state.jwt_secret())?)))
}

/// Log in with username and password
///
/// Unknown usernames and wrong passwords produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(username = %req.username, "Login rejected: wrong password");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse::issue(user.id, state.jwt_secret())?))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Current user, groups and effective permissions
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;
    let principal = Principal::load(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let mut groups: Vec<String> = principal.groups.into_iter().collect();
    groups.sort();

    let mut permissions: Vec<String> = principal
        .permissions
        .iter()
        .map(|p| p.codename().to_string())
        .collect();
    permissions.sort();

    Ok(Json(MeResponse {
        full_name: user.full_name(),
        user,
        groups,
        permissions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            password_confirm: "s3cret-pass".to_string(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
        }
    }

    fn messages(err: ApiError) -> Vec<(String, String)> {
        match err {
            ApiError::ValidationError(details) => {
                details.into_iter().map(|d| (d.field, d.message)).collect()
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(request().check().is_ok());
    }

    #[test]
    fn test_password_mismatch() {
        let req = RegisterRequest {
            password_confirm: "different".to_string(),
            ..request()
        };

        let errors = messages(req.check().unwrap_err());
        assert_eq!(errors, vec![(NON_FIELD.to_string(), "Passwords do not match!".to_string())]);
    }

    #[test]
    fn test_name_required() {
        let req = RegisterRequest {
            first_name: "  ".to_string(),
            last_name: String::new(),
            ..request()
        };

        let errors = messages(req.check().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.starts_with("At least one of the fields"));

        let req = RegisterRequest {
            first_name: String::new(),
            last_name: "Smith".to_string(),
            ..request()
        };
        assert!(req.check().is_ok());
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let req = RegisterRequest {
            username: String::new(),
            email: String::new(),
            password: String::new(),
            password_confirm: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        };

        let fields: Vec<String> = messages(req.check().unwrap_err())
            .into_iter()
            .map(|(field, _)| field)
            .collect();

        for field in ["username", "email", "password", "password_confirm", NON_FIELD] {
            assert!(fields.iter().any(|f| f == field), "missing {}", field);
        }
    }

    #[test]
    fn test_username_characters() {
        assert!(is_valid_username("alice.smith+qa@corp"));
        assert!(is_valid_username("bob_2"));
        assert!(!is_valid_username("bob smith"));
        assert!(!is_valid_username("bob/smith"));
        assert!(!is_valid_username(""));
    }
}
