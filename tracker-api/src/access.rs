/// Per-request authorization
///
/// Loads the caller's [`Principal`] and, for scoped actions, the target
/// project's member set, then asks the configured
/// [`Policy`](tracker_shared::auth::authorization::Policy). Denials are
/// logged with their reason and returned as a 403 with a fixed message.
///
/// Handlers resolve the target first so a missing project or issue is a 404
/// regardless of who asks.

use tracker_shared::auth::{
    authorization::{Action, Target},
    principal::{Principal, ProjectMembers},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Returns the caller's principal if `action` on `target` is allowed
///
/// # Errors
///
/// - `401` if the authenticated user no longer exists
/// - `404` if the target project disappeared since the handler looked it up
/// - `403` if the policy denies the request
pub async fn authorize(
    state: &AppState,
    user_id: Uuid,
    action: Action,
    target: Target,
) -> ApiResult<Principal> {
    let principal = Principal::load(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let decision = match target.project_id() {
        Some(project_id) if action.is_scoped() => {
            let members = ProjectMembers::load(&state.db, project_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
            state.policy.evaluate(&principal, &members, action, target)
        }
        _ => state.policy.evaluate(&principal, &(), action, target),
    };

    decision.map_err(|reason| {
        tracing::warn!(%user_id, action = %action, reason = %reason, "Access denied");
        ApiError::from(reason)
    })?;

    Ok(principal)
}
