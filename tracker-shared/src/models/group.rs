/// Role groups and permission grants
///
/// A user's effective permissions are the union of the codenames granted to
/// the user directly and those granted to any of the user's groups.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (id UUID PRIMARY KEY, name VARCHAR(150) NOT NULL UNIQUE);
/// CREATE TABLE user_groups (user_id UUID, group_id UUID, PRIMARY KEY (user_id, group_id));
/// CREATE TABLE group_permissions (group_id UUID, codename VARCHAR(100), PRIMARY KEY (group_id, codename));
/// CREATE TABLE user_permissions (user_id UUID, codename VARCHAR(100), PRIMARY KEY (user_id, codename));
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A named group of users, e.g. "Project Manager"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
}

impl Group {
    /// Finds a group by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let group = sqlx::query_as::<_, Group>("SELECT id, name FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(group)
    }

    /// Adds a user to a group; adding twice is a no-op
    pub async fn add_user(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Removes a user from a group
    ///
    /// Returns false if the user was not in the group
    pub async fn remove_user(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Names of every group the user belongs to
    pub async fn names_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT g.name
            FROM groups g
            INNER JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(names)
    }

    /// Permission codenames the user holds directly or through any group
    pub async fn permission_codenames_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let codenames: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT codename FROM user_permissions WHERE user_id = $1
            UNION
            SELECT gp.codename
            FROM group_permissions gp
            INNER JOIN user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(codenames)
    }

    /// Grants a permission codename directly to a user
    pub async fn grant_user_permission(
        pool: &PgPool,
        user_id: Uuid,
        codename: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, codename)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(codename)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Revokes a directly granted permission
    ///
    /// Permissions inherited through groups are unaffected.
    pub async fn revoke_user_permission(
        pool: &PgPool,
        user_id: Uuid,
        codename: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND codename = $2")
            .bind(user_id)
            .bind(codename)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Codenames granted to this group
    pub async fn permission_codenames(pool: &PgPool, group_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        let codenames: Vec<String> = sqlx::query_scalar(
            "SELECT codename FROM group_permissions WHERE group_id = $1 ORDER BY codename",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(codenames)
    }
}
