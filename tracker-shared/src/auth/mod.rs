/// Authentication and authorization
///
/// # Modules
///
/// - [`authorization`]: the role/permission/membership policy for projects and issues
/// - [`principal`]: per-request identity and membership snapshots loaded from the database
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: access/refresh token generation and validation
/// - [`middleware`]: bearer-token authentication for Axum
///
/// # Example
///
/// ```no_run
/// use tracker_shared::auth::jwt::{issue_token_pair, validate_access_token};
/// use tracker_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let (access, _refresh) = issue_token_pair(Uuid::new_v4(), "secret-key")?;
/// let claims = validate_access_token(&access, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod principal;
