use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::user::{UpdateUser, User, UserProfile};
use crate::database::models::ADMIN_ROLES;
use crate::database::{Repository, StoreQuery};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::organization_service::OrganizationService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub organization_id: Option<Uuid>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Administration of other accounts (admin+ only, within scope)
pub struct UserService<'a> {
    state: &'a AppState,
    users: Repository<User>,
}

impl<'a> UserService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            users: state.repo(),
        }
    }

    pub async fn list(&self, auth: &AuthUser, query: UserListQuery) -> Result<Vec<UserProfile>, ApiError> {
        auth.require(ADMIN_ROLES)?;
        let scope = OrganizationService::new(self.state).scope_for(&auth.user).await?;
        let ids = match query.organization_id {
            Some(id) => Some(scope.narrow(id)?),
            None => scope.ids(),
        };

        let mut store_query = StoreQuery::new().scoped(ids).page(query.limit, query.offset);
        if let Some(role) = query.role {
            store_query = store_query.filter("role", role);
        }
        if let Some(status) = query.status {
            store_query = store_query.filter("status", status);
        }

        let users = self.users.select_any(&store_query).await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// A user inside the caller's scope; anything else is a 404
    async fn visible(&self, auth: &AuthUser, id: Uuid) -> Result<User, ApiError> {
        auth.require(ADMIN_ROLES)?;
        let scope = OrganizationService::new(self.state).scope_for(&auth.user).await?;
        match self.users.select_one(id).await? {
            Some(user) if user.id == auth.id() || scope.contains(user.organization_id) => Ok(user),
            _ => Err(ApiError::not_found("User not found")),
        }
    }

    pub async fn get(&self, auth: &AuthUser, id: Uuid) -> Result<UserProfile, ApiError> {
        let user = self.visible(auth, id).await?;
        Ok(UserProfile::from(&user))
    }

    pub async fn update(&self, auth: &AuthUser, id: Uuid, input: UpdateUser) -> Result<UserProfile, ApiError> {
        let current = self.visible(auth, id).await?;
        if let Some(organization_id) = input.organization_id {
            if current.organization_id != Some(organization_id) {
                OrganizationService::new(self.state)
                    .ensure_writable(auth, organization_id)
                    .await?;
            }
        }

        let actor = auth.role();
        let is_self = id == auth.id();
        // Permission checks run against the stored copy on every attempt
        let user = self
            .users
            .modify(id, |user: &mut User| -> Result<(), ApiError> {
                if !is_self && !actor.can_grant(user.role) {
                    return Err(ApiError::forbidden("You cannot modify a user with a higher role"));
                }

                if let Some(role) = input.role {
                    if is_self && role != user.role {
                        return Err(ApiError::forbidden("You cannot change your own role"));
                    }
                    if !actor.can_grant(role) {
                        return Err(ApiError::forbidden(format!("You cannot assign the {} role", role.as_str())));
                    }
                    user.role = role;
                }

                if let Some(status) = input.status {
                    if is_self && status != user.status {
                        return Err(ApiError::forbidden("You cannot change your own status"));
                    }
                    user.status = status;
                }

                if let Some(organization_id) = input.organization_id {
                    user.organization_id = Some(organization_id);
                }

                user.apply_contact(input.name.clone(), input.phone.clone(), input.address.clone())?;
                user.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        tracing::info!("User {} updated by {}", user.email, auth.user.email);
        Ok(UserProfile::from(&user))
    }

    pub async fn delete(&self, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let user = self.visible(auth, id).await?;
        if user.id == auth.id() {
            return Err(ApiError::forbidden("You cannot delete your own account"));
        }
        if !auth.role().can_grant(user.role) {
            return Err(ApiError::forbidden("You cannot delete a user with a higher role"));
        }
        self.users.delete(id).await?;
        tracing::info!("User {} deleted by {}", user.email, auth.user.email);
        Ok(())
    }
}
