/// Project endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - All projects, earliest start date first
/// - `POST /v1/projects` - Create a project (creator becomes a member)
/// - `GET /v1/projects/:id` - Project with member IDs and issues
/// - `PUT /v1/projects/:id` - Update a project
/// - `DELETE /v1/projects/:id` - Delete a project and its issues
/// - `PUT /v1/projects/:id/users` - Replace the member set
/// - `POST /v1/projects/:id/issues` - Create an issue in this project
///
/// Lookups happen before authorization: a missing project is a 404 for everyone.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracker_shared::{
    auth::{
        authorization::{Action, Target},
        middleware::AuthContext,
    },
    models::{
        issue::{CreateIssue, Issue},
        project::{CreateProject, Project, UpdateProject},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::authorize,
    app::AppState,
    error::{ApiError, ApiResult},
    routes::issues::IssueRequest,
};

/// Create/update request body
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub start_date: NaiveDate,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ProjectRequest {
    /// Field rules, a non-blank name and `end_date >= start_date`
    pub fn check(&self) -> ApiResult<()> {
        self.validate()?;

        if self.name.trim().is_empty() {
            return Err(ApiError::invalid("name", "This field is required"));
        }

        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(ApiError::invalid("end_date", "End date cannot be before start date"));
            }
        }

        Ok(())
    }

    fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

/// Member replacement request body
#[derive(Debug, Deserialize)]
pub struct ProjectUsersRequest {
    pub user_ids: Vec<Uuid>,
}

impl ProjectUsersRequest {
    /// IDs in request order with duplicates removed
    pub fn unique_ids(&self) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.user_ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }
}

/// Member set after replacement
#[derive(Debug, Serialize)]
pub struct ProjectUsersResponse {
    pub project_id: Uuid,
    pub user_ids: Vec<Uuid>,
}

/// Project with its members and issues
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,

    pub member_ids: Vec<Uuid>,

    pub issues: Vec<Issue>,
}

async fn find_project(state: &AppState, id: Uuid) -> ApiResult<Project> {
    Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(Project::list(&state.db).await?))
}

/// Create a project; the caller becomes its first member
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    authorize(&state, auth.user_id, Action::CreateProject, Target::Global).await?;
    req.check()?;

    let project = Project::create_with_creator(
        &state.db,
        CreateProject {
            description: req.description(),
            name: req.name.trim().to_string(),
            start_date: req.start_date,
            end_date: req.end_date,
        },
        auth.user_id,
    )
    .await?;

    tracing::info!(project_id = %project.id, created_by = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    let project = find_project(&state, id).await?;
    let member_ids = Project::member_user_ids(&state.db, id).await?;
    let issues = Issue::list_by_project(&state.db, id).await?;

    Ok(Json(ProjectDetail {
        project,
        member_ids,
        issues,
    }))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<Project>> {
    find_project(&state, id).await?;
    authorize(&state, auth.user_id, Action::UpdateProject, Target::Project(id)).await?;
    req.check()?;

    let project = Project::update(
        &state.db,
        id,
        UpdateProject {
            description: req.description(),
            name: req.name.trim().to_string(),
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %id, updated_by = %auth.user_id, "Project updated");

    Ok(Json(project))
}

/// Delete a project together with its issues
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    find_project(&state, id).await?;
    authorize(&state, auth.user_id, Action::DeleteProject, Target::Project(id)).await?;

    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %id, deleted_by = %auth.user_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Replace the project's member set
///
/// Requires the manage-project-users permission and existing membership.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: one or more IDs are not users
pub async fn set_project_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectUsersRequest>,
) -> ApiResult<Json<ProjectUsersResponse>> {
    find_project(&state, id).await?;
    authorize(&state, auth.user_id, Action::ManageProjectUsers, Target::Project(id)).await?;

    let user_ids = req.unique_ids();
    let missing = User::missing_ids(&state.db, &user_ids).await?;
    if !missing.is_empty() {
        let missing: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        return Err(ApiError::invalid(
            "user_ids",
            format!("Unknown users: {}", missing.join(", ")),
        ));
    }

    let user_ids = Project::set_members(&state.db, id, &user_ids).await?;

    tracing::info!(
        project_id = %id,
        members = user_ids.len(),
        changed_by = %auth.user_id,
        "Project members replaced"
    );

    Ok(Json(ProjectUsersResponse {
        project_id: id,
        user_ids,
    }))
}

/// Create an issue in the project named by the path
///
/// A `project_id` in the body, if any, must match the path.
pub async fn create_project_issue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<IssueRequest>,
) -> ApiResult<(StatusCode, Json<Issue>)> {
    find_project(&state, id).await?;
    authorize(&state, auth.user_id, Action::CreateIssue, Target::Project(id)).await?;
    req.check()?;

    if req.project_id.is_some_and(|body_id| body_id != id) {
        return Err(ApiError::invalid("project_id", "Does not match the project in the URL"));
    }

    let issue = Issue::create(
        &state.db,
        CreateIssue {
            project_id: id,
            summary: req.summary.trim().to_string(),
            description: req.description(),
            status: req.status.unwrap_or_default(),
            types: req.normalized_types(),
        },
    )
    .await?;

    tracing::info!(issue_id = %issue.id, project_id = %id, created_by = %auth.user_id, "Issue created");

    Ok((StatusCode::CREATED, Json(issue)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: Option<&str>) -> ProjectRequest {
        ProjectRequest {
            name: "Apollo".to_string(),
            description: Some("  ".to_string()),
            start_date: start.parse().unwrap(),
            end_date: end.map(|e| e.parse().unwrap()),
        }
    }

    #[test]
    fn test_end_date_not_before_start() {
        assert!(request("2025-01-01", None).check().is_ok());
        assert!(request("2025-01-01", Some("2025-01-01")).check().is_ok());

        match request("2025-01-02", Some("2025-01-01")).check() {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "end_date"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blank_name_rejected() {
        let req = ProjectRequest {
            name: String::new(),
            ..request("2025-01-01", None)
        };
        assert!(matches!(req.check(), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_whitespace_name_rejected() {
        let req: ProjectRequest =
            serde_json::from_str(r#"{"name": "  ", "start_date": "2025-01-01"}"#).unwrap();

        match req.check() {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details[0].field, "name");
                assert_eq!(details[0].message, "This field is required");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blank_description_dropped() {
        assert_eq!(request("2025-01-01", None).description(), None);
    }

    #[test]
    fn test_unique_ids_keep_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let req = ProjectUsersRequest {
            user_ids: vec![a, b, a, b],
        };
        assert_eq!(req.unique_ids(), vec![a, b]);
    }
}
