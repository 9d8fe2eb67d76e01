/// Issue endpoints
///
/// # Endpoints
///
/// - `POST /v1/issues` - Create an issue in the project named by `project_id`
/// - `GET /v1/issues/:id` - Fetch an issue
/// - `PUT /v1/issues/:id` - Update an issue (its project cannot change)
/// - `DELETE /v1/issues/:id` - Delete an issue
///
/// Update and delete are authorized against the issue's owning project.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracker_shared::{
    auth::{
        authorization::{Action, Target},
        middleware::AuthContext,
    },
    models::{
        issue::{CreateIssue, Issue, IssueStatus, UpdateIssue},
        project::Project,
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::authorize,
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Longest accepted type tag
pub const MAX_TYPE_LEN: usize = 50;

/// Create/update request body
#[derive(Debug, Deserialize, Validate)]
pub struct IssueRequest {
    /// Required on `POST /v1/issues`; elsewhere must match the issue's project
    #[serde(default)]
    pub project_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Summary must be 1 to 200 characters"))]
    pub summary: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Defaults to `new` on create and to the current status on update
    #[serde(default)]
    pub status: Option<IssueStatus>,

    #[serde(default)]
    pub types: Vec<String>,
}

impl IssueRequest {
    /// Field rules, a non-blank summary and per-tag checks
    pub fn check(&self) -> ApiResult<()> {
        self.validate()?;

        if self.summary.trim().is_empty() {
            return Err(ApiError::invalid("summary", "This field is required"));
        }

        for tag in &self.types {
            let tag = tag.trim();
            if tag.is_empty() || tag.len() > MAX_TYPE_LEN {
                return Err(ApiError::invalid(
                    "types",
                    format!("Each type must be 1 to {} characters", MAX_TYPE_LEN),
                ));
            }
        }

        Ok(())
    }

    /// Trimmed description, `None` if blank
    pub fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }

    /// Trimmed tags with duplicates removed, in request order
    pub fn normalized_types(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.types
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

async fn find_issue(state: &AppState, id: Uuid) -> ApiResult<Issue> {
    Issue::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Issue not found".to_string()))
}

/// Create an issue in the project given in the body
///
/// # Errors
///
/// - `422 Unprocessable Entity`: `project_id` missing or not a project
pub async fn create_issue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<IssueRequest>,
) -> ApiResult<(StatusCode, Json<Issue>)> {
    let project_id = req
        .project_id
        .ok_or_else(|| ApiError::invalid("project_id", "This field is required"))?;

    if !Project::exists(&state.db, project_id).await? {
        return Err(ApiError::invalid("project_id", "Project does not exist"));
    }

    authorize(&state, auth.user_id, Action::CreateIssue, Target::Project(project_id)).await?;
    req.check()?;

    let issue = Issue::create(
        &state.db,
        CreateIssue {
            project_id,
            summary: req.summary.trim().to_string(),
            description: req.description(),
            status: req.status.unwrap_or_default(),
            types: req.normalized_types(),
        },
    )
    .await?;

    tracing::info!(issue_id = %issue.id, %project_id, created_by = %auth.user_id, "Issue created");

    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn get_issue(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Issue>> {
    Ok(Json(find_issue(&state, id).await?))
}

/// Update an issue's summary, description, status and types
pub async fn update_issue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<IssueRequest>,
) -> ApiResult<Json<Issue>> {
    let existing = find_issue(&state, id).await?;
    let target = Target::Issue {
        issue_id: existing.id,
        project_id: existing.project_id,
    };
    authorize(&state, auth.user_id, Action::UpdateIssue, target).await?;
    req.check()?;

    if req.project_id.is_some_and(|project_id| project_id != existing.project_id) {
        return Err(ApiError::invalid("project_id", "An issue cannot be moved to another project"));
    }

    let issue = Issue::update(
        &state.db,
        id,
        UpdateIssue {
            summary: req.summary.trim().to_string(),
            description: req.description(),
            status: req.status.unwrap_or(existing.status),
            types: req.normalized_types(),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Issue not found".to_string()))?;

    tracing::info!(issue_id = %id, updated_by = %auth.user_id, "Issue updated");

    Ok(Json(issue))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = find_issue(&state, id).await?;
    let target = Target::Issue {
        issue_id: existing.id,
        project_id: existing.project_id,
    };
    authorize(&state, auth.user_id, Action::DeleteIssue, target).await?;

    if !Issue::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Issue not found".to_string()));
    }

    tracing::info!(issue_id = %id, project_id = %existing.project_id, deleted_by = %auth.user_id, "Issue deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(types: &[&str]) -> IssueRequest {
        IssueRequest {
            project_id: None,
            summary: "Crash on save".to_string(),
            description: None,
            status: None,
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_types_normalized() {
        let req = request(&[" bug", "bug", "ui ", "task"]);
        assert!(req.check().is_ok());
        assert_eq!(req.normalized_types(), vec!["bug", "ui", "task"]);
    }

    #[test]
    fn test_blank_type_rejected() {
        assert!(matches!(request(&["bug", " "]).check(), Err(ApiError::ValidationError(_))));

        let long = "x".repeat(MAX_TYPE_LEN + 1);
        assert!(request(&[long.as_str()]).check().is_err());
    }

    #[test]
    fn test_empty_summary_rejected() {
        let req = IssueRequest {
            summary: String::new(),
            ..request(&[])
        };
        assert!(req.check().is_err());
    }

    #[test]
    fn test_whitespace_summary_rejected() {
        let req: IssueRequest = serde_json::from_str(r#"{"summary": "   "}"#).unwrap();

        match req.check() {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details[0].field, "summary");
                assert_eq!(details[0].message, "This field is required");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_body_deserialization_defaults() {
        let req: IssueRequest = serde_json::from_str(r#"{"summary": "Typo"}"#).unwrap();
        assert!(req.project_id.is_none());
        assert!(req.status.is_none());
        assert!(req.types.is_empty());

        let req: IssueRequest =
            serde_json::from_str(r#"{"summary": "Typo", "status": "in_progress", "types": ["docs"]}"#).unwrap();
        assert_eq!(req.status, Some(IssueStatus::InProgress));
    }
}
