/// Issues belonging to a project
///
/// # Schema
///
/// ```sql
/// CREATE TYPE issue_status AS ENUM ('new', 'in_progress', 'done');
///
/// CREATE TABLE issues (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     summary VARCHAR(200) NOT NULL,
///     description TEXT,
///     status issue_status NOT NULL DEFAULT 'new',
///     types TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `project_id` is fixed at creation. [`UpdateIssue`] has no field for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Workflow state of an issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    New,
    InProgress,
    Done,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::New => "new",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Issue {
    pub id: Uuid,

    /// Owning project; authorization checks membership here
    pub project_id: Uuid,

    pub summary: String,
    pub description: Option<String>,
    pub status: IssueStatus,

    /// Type tags such as "bug" or "task"; may be empty
    pub types: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an issue
#[derive(Debug, Clone)]
pub struct CreateIssue {
    pub project_id: Uuid,
    pub summary: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub types: Vec<String>,
}

/// Replacement values for an issue's editable fields
#[derive(Debug, Clone)]
pub struct UpdateIssue {
    pub summary: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub types: Vec<String>,
}

impl Issue {
    /// Inserts an issue
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if the project does not exist
    pub async fn create(pool: &PgPool, data: CreateIssue) -> Result<Self, sqlx::Error> {
        let issue = sqlx::query_as::<_, Issue>(
            r#"
            INSERT INTO issues (project_id, summary, description, status, types)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, summary, description, status, types, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.summary)
        .bind(data.description)
        .bind(data.status)
        .bind(data.types)
        .fetch_one(pool)
        .await?;

        Ok(issue)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let issue = sqlx::query_as::<_, Issue>(
            r#"
            SELECT id, project_id, summary, description, status, types, created_at, updated_at
            FROM issues
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(issue)
    }

    /// Issues of one project, newest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let issues = sqlx::query_as::<_, Issue>(
            r#"
            SELECT id, project_id, summary, description, status, types, created_at, updated_at
            FROM issues
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(issues)
    }

    /// Overwrites the editable fields, leaving `project_id` alone
    ///
    /// Returns None if the issue does not exist
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateIssue) -> Result<Option<Self>, sqlx::Error> {
        let issue = sqlx::query_as::<_, Issue>(
            r#"
            UPDATE issues
            SET summary = $2, description = $3, status = $4, types = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, summary, description, status, types, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.summary)
        .bind(data.description)
        .bind(data.status)
        .bind(data.types)
        .fetch_optional(pool)
        .await?;

        Ok(issue)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
