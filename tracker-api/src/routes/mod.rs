/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh and the current user
/// - `projects`: Projects, project members and project-scoped issue creation
/// - `issues`: Issue create, read, update and delete

pub mod auth;
pub mod health;
pub mod issues;
pub mod projects;
