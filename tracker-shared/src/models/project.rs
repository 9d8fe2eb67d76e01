/// Projects and project membership
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(200) NOT NULL,
///     description TEXT,
///     start_date DATE NOT NULL,
///     end_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// Deleting a project removes its memberships and issues through the
/// `ON DELETE CASCADE` foreign keys.
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use tracker_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, creator: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create_with_creator(&pool, CreateProject {
///     name: "Apollo".to_string(),
///     description: None,
///     start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
///     end_date: None,
/// }, creator).await?;
///
/// assert!(Project::member_user_ids(&pool, project.id).await?.contains(&creator));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Replacement values for a project's editable fields
#[derive(Debug, Clone)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Project {
    /// Inserts a project and makes `creator_id` its first member
    ///
    /// Both rows are written in one transaction, so a project never exists
    /// without its creator as a member.
    ///
    /// # Errors
    ///
    /// Returns an error if either insert fails; nothing is persisted in that case
    pub async fn create_with_creator(
        pool: &PgPool,
        data: CreateProject,
        creator_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, start_date, end_date, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
            .bind(project.id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, start_date, end_date, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(exists)
    }

    /// All projects, earliest start date first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, start_date, end_date, created_at, updated_at
            FROM projects
            ORDER BY start_date, name
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Overwrites the editable fields
    ///
    /// Returns None if the project does not exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, start_date = $4, end_date = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, start_date, end_date, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Deletes a project together with its issues and memberships
    ///
    /// Returns false if the project did not exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// IDs of the project's members, in the order they were added
    pub async fn member_user_ids(pool: &PgPool, project_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM project_members
            WHERE project_id = $1
            ORDER BY added_at, user_id
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Replaces the member set with exactly `user_ids`
    ///
    /// Runs in one transaction. Existing members that stay keep their
    /// original `added_at`.
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if any ID is not a user; the member
    /// set is left unchanged in that case
    pub async fn set_members(
        pool: &PgPool,
        project_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM project_members
            WHERE project_id = $1 AND NOT (user_id = ANY($2))
            "#,
        )
        .bind(project_id)
        .bind(user_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id)
            SELECT $1, candidate FROM UNNEST($2::uuid[]) AS candidate
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_ids)
        .execute(&mut *tx)
        .await?;

        let members: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM project_members
            WHERE project_id = $1
            ORDER BY added_at, user_id
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(members)
    }
}
