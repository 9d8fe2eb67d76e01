/// Database models
///
/// Each model owns its queries as associated async functions taking a
/// `&PgPool`.
///
/// # Models
///
/// - `user`: registered accounts
/// - `group`: role groups and permission grants
/// - `project`: projects and their member sets
/// - `issue`: issues owned by a project

pub mod group;
pub mod issue;
pub mod project;
pub mod user;
