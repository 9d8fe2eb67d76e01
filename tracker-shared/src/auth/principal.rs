/// Per-request snapshots of identity and membership data
///
/// [`Principal`] and [`ProjectMembers`] are loaded from PostgreSQL at the start
/// of a request and handed to the authorization policy, which only sees them
/// through the [`Identity`] and [`ProjectDirectory`] traits.
///
/// # Example
///
/// ```no_run
/// use tracker_shared::auth::authorization::{Action, Policy, Target};
/// use tracker_shared::auth::principal::{Principal, ProjectMembers};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, project_id: Uuid) -> Result<(), sqlx::Error> {
/// let principal = Principal::load(&pool, user_id).await?.expect("user exists");
/// let members = ProjectMembers::load(&pool, project_id).await?.expect("project exists");
///
/// let allowed = Policy::default().authorize(
///     &principal,
///     &members,
///     Action::UpdateProject,
///     Target::Project(project_id),
/// );
/// # Ok(())
/// # }
/// ```

use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::authorization::{Identity, Permission, ProjectDirectory};
use crate::models::group::Group;
use crate::models::project::Project;
use crate::models::user::User;

/// A user's groups and effective permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// User ID
    pub user_id: Uuid,

    /// Group names, e.g. "Team Lead"
    pub groups: HashSet<String>,

    /// Union of direct and group-granted permissions
    pub permissions: HashSet<Permission>,
}

impl Principal {
    /// Creates a principal with no groups and no permissions
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            groups: HashSet::new(),
            permissions: HashSet::new(),
        }
    }

    pub fn with_group(mut self, name: impl Into<String>) -> Self {
        self.groups.insert(name.into());
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Loads a principal from the identity store
    ///
    /// Returns `None` if the user does not exist. Permission codenames the
    /// tracker does not know are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn load(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        if User::find_by_id(pool, user_id).await?.is_none() {
            return Ok(None);
        }

        let groups = Group::names_for_user(pool, user_id).await?;
        let codenames = Group::permission_codenames_for_user(pool, user_id).await?;

        let permissions = codenames
            .iter()
            .filter_map(|codename| match codename.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(_) => {
                    tracing::warn!(%user_id, codename = %codename, "Ignoring unknown permission");
                    None
                }
            })
            .collect();

        Ok(Some(Self {
            user_id,
            groups: groups.into_iter().collect(),
            permissions,
        }))
    }
}

impl Identity for Principal {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn group_names(&self) -> &HashSet<String> {
        &self.groups
    }

    fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Member set of a single project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMembers {
    /// Project ID
    pub project_id: Uuid,

    /// Member user IDs
    pub user_ids: HashSet<Uuid>,
}

impl ProjectMembers {
    pub fn new(project_id: Uuid, user_ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            project_id,
            user_ids: user_ids.into_iter().collect(),
        }
    }

    /// Loads a project's member set
    ///
    /// Returns `None` if the project does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn load(pool: &PgPool, project_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        if !Project::exists(pool, project_id).await? {
            return Ok(None);
        }

        let user_ids = Project::member_user_ids(pool, project_id).await?;
        Ok(Some(Self::new(project_id, user_ids)))
    }
}

impl ProjectDirectory for ProjectMembers {
    fn member_user_ids(&self, project_id: Uuid) -> Option<&HashSet<Uuid>> {
        (self.project_id == project_id).then_some(&self.user_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::{is_member, Role};

    #[test]
    fn test_principal_builder() {
        let user_id = Uuid::new_v4();
        let principal = Principal::new(user_id)
            .with_group("Developer")
            .with_permission(Permission::AddIssue);

        assert_eq!(principal.user_id(), user_id);
        assert!(principal.has_role(Role::Developer));
        assert!(!principal.has_role(Role::TeamLead));
        assert!(principal.has_permission(Permission::AddIssue));
        assert!(!principal.has_permission(Permission::ChangeIssue));
    }

    #[test]
    fn test_project_members_scoped_to_own_project() {
        let user_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let members = ProjectMembers::new(project_id, [user_id]);

        assert!(is_member(&members, user_id, project_id));
        assert!(!is_member(&members, Uuid::new_v4(), project_id));
        assert!(!is_member(&members, user_id, Uuid::new_v4()));
    }
}
