/// Authorization policy for projects and issues
///
/// This module decides, for a given (user, action, target) triple, whether the
/// action is permitted. It is pure: identity and membership data are passed in
/// through the [`Identity`] and [`ProjectDirectory`] capabilities, and nothing
/// here touches the database.
///
/// # Decision Steps
///
/// 1. **Role resolution**: the user's groups are looked up in the
///    [`PermissionTable`] to find the permission the action requires. No
///    qualifying role means the request is denied.
/// 2. **Permission grant**: the user must actually hold that permission.
/// 3. **Project membership**: scoped actions require membership of the target
///    project. Issue actions resolve through the issue's owning project.
///
/// # Example
///
/// ```
/// use std::collections::{HashMap, HashSet};
/// use tracker_shared::auth::authorization::{Action, Permission, Policy, Role, Target};
/// use tracker_shared::auth::principal::Principal;
/// use uuid::Uuid;
///
/// let alice = Principal::new(Uuid::new_v4())
///     .with_group(Role::ProjectManager.group_name())
///     .with_permission(Permission::AddIssue);
///
/// let project_id = Uuid::new_v4();
/// let mut projects: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
/// projects.insert(project_id, HashSet::from([alice.user_id]));
///
/// let policy = Policy::default();
/// assert!(policy.authorize(&alice, &projects, Action::CreateIssue, Target::Project(project_id)));
/// ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for authorization checks
///
/// Every variant is a denial; the variant records why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// None of the user's roles maps the action to a permission
    #[error("No role grants {0}")]
    NoQualifyingRole(Action),

    /// The role maps to a permission the user does not hold
    #[error("Missing permission: {0}")]
    MissingPermission(Permission),

    /// A project-scoped action was requested without a project or issue
    #[error("{0} requires a project or issue target")]
    MissingTarget(Action),

    /// User is not a member of the target project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),
}

/// Roles conferred by group membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates and owns projects
    ProjectManager,

    /// Manages project members and issues
    TeamLead,

    /// Works on issues
    Developer,
}

impl Role {
    /// Roles in the order the resolver checks them
    pub const ALL: [Role; 3] = [Role::ProjectManager, Role::TeamLead, Role::Developer];

    /// Name of the identity-store group that confers this role
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::ProjectManager => "Project Manager",
            Role::TeamLead => "Team Lead",
            Role::Developer => "Developer",
        }
    }

    /// Maps a group name back to its role, if it is one
    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.group_name() == name)
    }
}

/// Actions subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateIssue,
    UpdateIssue,
    DeleteIssue,
    CreateProject,
    UpdateProject,
    DeleteProject,
    ManageProjectUsers,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::CreateIssue,
        Action::UpdateIssue,
        Action::DeleteIssue,
        Action::CreateProject,
        Action::UpdateProject,
        Action::DeleteProject,
        Action::ManageProjectUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateIssue => "create-issue",
            Action::UpdateIssue => "update-issue",
            Action::DeleteIssue => "delete-issue",
            Action::CreateProject => "create-project",
            Action::UpdateProject => "update-project",
            Action::DeleteProject => "delete-project",
            Action::ManageProjectUsers => "manage-project-users",
        }
    }

    /// Whether the action applies to an existing project (directly or through an issue)
    ///
    /// Only project creation is unscoped.
    pub fn is_scoped(&self) -> bool {
        !matches!(self, Action::CreateProject)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic permission flags held by users, directly or through groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AddIssue,
    ChangeIssue,
    DeleteIssue,
    AddProject,
    ChangeProject,
    DeleteProject,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::AddIssue,
        Permission::ChangeIssue,
        Permission::DeleteIssue,
        Permission::AddProject,
        Permission::ChangeProject,
        Permission::DeleteProject,
    ];

    /// Codename as stored in the identity store
    pub fn codename(&self) -> &'static str {
        match self {
            Permission::AddIssue => "add_issue",
            Permission::ChangeIssue => "change_issue",
            Permission::DeleteIssue => "delete_issue",
            Permission::AddProject => "add_project",
            Permission::ChangeProject => "change_project",
            Permission::DeleteProject => "delete_project",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.codename() == s)
            .ok_or_else(|| format!("Unknown permission codename: {}", s))
    }
}

/// What an action is performed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No existing object (project creation)
    Global,

    /// A project, by ID
    Project(Uuid),

    /// An issue and the project that owns it
    Issue { issue_id: Uuid, project_id: Uuid },
}

impl Target {
    /// Project whose membership governs this target
    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            Target::Global => None,
            Target::Project(project_id) => Some(*project_id),
            Target::Issue { project_id, .. } => Some(*project_id),
        }
    }
}

/// Read-only view of the identity store for one user
pub trait Identity {
    /// ID of the user being authorized
    fn user_id(&self) -> Uuid;

    /// Names of the groups the user belongs to
    fn group_names(&self) -> &HashSet<String>;

    /// Whether the user holds a permission, directly or through a group
    fn has_permission(&self, permission: Permission) -> bool;

    /// Whether the user belongs to the group conferring `role`
    fn has_role(&self, role: Role) -> bool {
        self.group_names().contains(role.group_name())
    }
}

/// Read-only view of project membership
pub trait ProjectDirectory {
    /// Member user IDs of a project, or `None` if the project is unknown
    fn member_user_ids(&self, project_id: Uuid) -> Option<&HashSet<Uuid>>;
}

impl ProjectDirectory for HashMap<Uuid, HashSet<Uuid>> {
    fn member_user_ids(&self, project_id: Uuid) -> Option<&HashSet<Uuid>> {
        self.get(&project_id)
    }
}

/// A directory with no projects, for unscoped actions
impl ProjectDirectory for () {
    fn member_user_ids(&self, _project_id: Uuid) -> Option<&HashSet<Uuid>> {
        None
    }
}

/// Checks whether a user is a member of a project
///
/// An unknown project has no members.
pub fn is_member(directory: &impl ProjectDirectory, user_id: Uuid, project_id: Uuid) -> bool {
    directory
        .member_user_ids(project_id)
        .map_or(false, |members| members.contains(&user_id))
}

/// Role → action → permission mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    rules: HashMap<Role, HashMap<Action, Permission>>,
}

impl PermissionTable {
    /// Creates a table with no rules (every action denied)
    pub fn empty() -> Self {
        Self::default()
    }

    /// The tracker's standard role table
    ///
    /// | Action               | Project Manager | Team Lead      | Developer    |
    /// |----------------------|-----------------|----------------|--------------|
    /// | create-issue         | add_issue       | add_issue      | add_issue    |
    /// | update-issue         | change_issue    | change_issue   | change_issue |
    /// | delete-issue         | delete_issue    | delete_issue   |              |
    /// | create-project       | add_project     |                |              |
    /// | update-project       | change_project  |                |              |
    /// | delete-project       | delete_project  |                |              |
    /// | manage-project-users | change_project  | change_project |              |
    pub fn standard() -> Self {
        Self::empty()
            .grant(Role::ProjectManager, Action::CreateIssue, Permission::AddIssue)
            .grant(Role::ProjectManager, Action::UpdateIssue, Permission::ChangeIssue)
            .grant(Role::ProjectManager, Action::DeleteIssue, Permission::DeleteIssue)
            .grant(Role::ProjectManager, Action::CreateProject, Permission::AddProject)
            .grant(Role::ProjectManager, Action::UpdateProject, Permission::ChangeProject)
            .grant(Role::ProjectManager, Action::DeleteProject, Permission::DeleteProject)
            .grant(Role::ProjectManager, Action::ManageProjectUsers, Permission::ChangeProject)
            .grant(Role::TeamLead, Action::CreateIssue, Permission::AddIssue)
            .grant(Role::TeamLead, Action::UpdateIssue, Permission::ChangeIssue)
            .grant(Role::TeamLead, Action::DeleteIssue, Permission::DeleteIssue)
            .grant(Role::TeamLead, Action::ManageProjectUsers, Permission::ChangeProject)
            .grant(Role::Developer, Action::CreateIssue, Permission::AddIssue)
            .grant(Role::Developer, Action::UpdateIssue, Permission::ChangeIssue)
    }

    /// Adds (or replaces) the permission a role needs for an action
    pub fn grant(mut self, role: Role, action: Action, permission: Permission) -> Self {
        self.rules.entry(role).or_default().insert(action, permission);
        self
    }

    /// Permission a role needs for an action, if the role may attempt it at all
    pub fn lookup(&self, role: Role, action: Action) -> Option<Permission> {
        self.rules.get(&role)?.get(&action).copied()
    }

    /// Permission the user needs for an action
    ///
    /// Roles are checked in [`Role::ALL`] order and the first mapping wins.
    /// `None` means no role of the user qualifies.
    pub fn required_permission(&self, identity: &impl Identity, action: Action) -> Option<Permission> {
        Role::ALL
            .into_iter()
            .filter(|role| identity.has_role(*role))
            .find_map(|role| self.lookup(role, action))
    }
}

/// Authorization policy
///
/// Holds the role table and the project-deletion rule. Cheap to clone and
/// meant to be shared through application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    table: PermissionTable,
    manager_delete_override: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(PermissionTable::standard())
    }
}

impl Policy {
    /// Creates a strict policy over `table`
    pub fn new(table: PermissionTable) -> Self {
        Self {
            table,
            manager_delete_override: false,
        }
    }

    /// Lets Project Managers delete projects they are not members of
    ///
    /// The permission check still applies. Off by default.
    pub fn with_manager_delete_override(mut self, enabled: bool) -> Self {
        self.manager_delete_override = enabled;
        self
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Permission the user needs for an action (see [`PermissionTable::required_permission`])
    pub fn required_permission(&self, identity: &impl Identity, action: Action) -> Option<Permission> {
        self.table.required_permission(identity, action)
    }

    /// Evaluates a request and reports why it was denied
    ///
    /// # Errors
    ///
    /// - `AuthzError::NoQualifyingRole` if no role of the user maps the action
    /// - `AuthzError::MissingPermission` if the user lacks the mapped permission
    /// - `AuthzError::MissingTarget` if a scoped action has no project or issue
    /// - `AuthzError::NotMember` if the user is not in the target project
    pub fn evaluate(
        &self,
        identity: &impl Identity,
        directory: &impl ProjectDirectory,
        action: Action,
        target: Target,
    ) -> Result<(), AuthzError> {
        let permission = self
            .required_permission(identity, action)
            .ok_or(AuthzError::NoQualifyingRole(action))?;

        if !identity.has_permission(permission) {
            return Err(AuthzError::MissingPermission(permission));
        }

        if !action.is_scoped() {
            return Ok(());
        }

        let project_id = target.project_id().ok_or(AuthzError::MissingTarget(action))?;

        if action == Action::DeleteProject
            && self.manager_delete_override
            && identity.has_role(Role::ProjectManager)
        {
            return Ok(());
        }

        if !is_member(directory, identity.user_id(), project_id) {
            return Err(AuthzError::NotMember(project_id));
        }

        Ok(())
    }

    /// Decides whether the user may perform `action` on `target`
    pub fn authorize(
        &self,
        identity: &impl Identity,
        directory: &impl ProjectDirectory,
        action: Action,
        target: Target,
    ) -> bool {
        self.evaluate(identity, directory, action, target).is_ok()
    }
}
