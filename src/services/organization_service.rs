use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::database::models::organization::{
    CreateOrganization, Organization, OrganizationType, UpdateOrganization,
};
use crate::database::models::user::{Role, User};
use crate::database::models::ADMIN_ROLES;
use crate::database::{Repository, StoreQuery};
use crate::error::{ApiError, FieldErrors};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// The organizations a user may see
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    All,
    Organizations(HashSet<Uuid>),
}

impl Scope {
    pub fn contains(&self, organization_id: Option<Uuid>) -> bool {
        match self {
            Scope::All => true,
            Scope::Organizations(ids) => organization_id.map_or(false, |id| ids.contains(&id)),
        }
    }

    /// Store filter for this scope; `None` means unrestricted
    pub fn ids(&self) -> Option<Vec<Uuid>> {
        match self {
            Scope::All => None,
            Scope::Organizations(ids) => Some(ids.iter().copied().collect()),
        }
    }

    /// Narrow to one organization, which must already be visible
    pub fn narrow(&self, organization_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        if self.contains(Some(organization_id)) {
            Ok(vec![organization_id])
        } else {
            Err(ApiError::not_found("Organization not found"))
        }
    }
}

/// `root` and every organization below it
pub fn descendants(root: Uuid, organizations: &[Organization]) -> HashSet<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for org in organizations {
        if let Some(parent) = org.parent_id {
            children.entry(parent).or_default().push(org.id);
        }
    }

    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().copied());
            }
        }
    }
    seen
}

pub struct OrganizationService {
    organizations: Repository<Organization>,
    users: Repository<User>,
}

impl OrganizationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            organizations: state.repo(),
            users: state.repo(),
        }
    }

    /// Super admins see everything; everyone else sees their organization and
    /// its descendants (nothing when they have no organization)
    pub async fn scope_for(&self, user: &User) -> Result<Scope, ApiError> {
        if user.role == Role::SuperAdmin {
            return Ok(Scope::All);
        }
        let Some(root) = user.organization_id else {
            return Ok(Scope::Organizations(HashSet::new()));
        };
        let all = self.organizations.select_any(&StoreQuery::new()).await?;
        Ok(Scope::Organizations(descendants(root, &all)))
    }

    pub async fn list(
        &self,
        auth: &AuthUser,
        org_type: Option<OrganizationType>,
        parent_id: Option<Uuid>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Organization>, ApiError> {
        let scope = self.scope_for(&auth.user).await?;
        let mut query = StoreQuery::new().scoped(scope.ids()).page(limit, offset);
        if let Some(org_type) = org_type {
            query = query.filter("type", format!("{:?}", org_type));
        }
        if let Some(parent_id) = parent_id {
            query = query.filter("parent_id", parent_id.to_string());
        }
        Ok(self.organizations.select_any(&query).await?)
    }

    /// Fetch an organization visible to `auth`; anything else is a 404
    pub async fn get(&self, auth: &AuthUser, id: Uuid) -> Result<Organization, ApiError> {
        let scope = self.scope_for(&auth.user).await?;
        if !scope.contains(Some(id)) {
            return Err(ApiError::not_found("Organization not found"));
        }
        Ok(self.organizations.select_404(id).await?)
    }

    pub async fn children(&self, auth: &AuthUser, id: Uuid) -> Result<Vec<Organization>, ApiError> {
        let parent = self.get(auth, id).await?;
        let query = StoreQuery::new().filter("parent_id", parent.id.to_string());
        Ok(self.organizations.select_any(&query).await?)
    }

    pub async fn create(&self, auth: &AuthUser, input: CreateOrganization) -> Result<Organization, ApiError> {
        auth.require(ADMIN_ROLES)?;

        let parent = match input.parent_id {
            Some(parent_id) => self.organizations.select_one(parent_id).await?,
            None => None,
        };

        // New organizations hang under something the caller administers; only a
        // super admin can add a root council
        let scope = self.scope_for(&auth.user).await?;
        match &parent {
            Some(parent) if !scope.contains(Some(parent.id)) => {
                return Err(ApiError::forbidden("Parent organization is outside your scope"));
            }
            None if input.parent_id.is_none() && scope != Scope::All => {
                return Err(ApiError::forbidden("Only a super admin can create a top-level organization"));
            }
            _ => {}
        }

        let organization = Organization::build(input, parent.as_ref())?;
        self.organizations.create(&organization).await?;
        tracing::info!(
            "Organization {} ({:?}) created by {}",
            organization.name,
            organization.org_type,
            auth.user.email
        );
        Ok(organization)
    }

    pub async fn update(&self, auth: &AuthUser, id: Uuid, input: UpdateOrganization) -> Result<Organization, ApiError> {
        auth.require(ADMIN_ROLES)?;
        let mut organization = self.get(auth, id).await?;
        organization.apply(input)?;
        self.organizations.update(&organization).await?;
        Ok(organization)
    }

    /// Refuses while child organizations or members still point at it
    pub async fn delete(&self, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        auth.require(ADMIN_ROLES)?;
        let organization = self.get(auth, id).await?;

        if auth.organization_id() == Some(organization.id) && auth.role() != Role::SuperAdmin {
            return Err(ApiError::forbidden("You cannot delete your own organization"));
        }

        let children = self
            .organizations
            .select_any(&StoreQuery::new().filter("parent_id", id.to_string()).page(Some(1), None))
            .await?;
        if !children.is_empty() {
            return Err(ApiError::conflict("Organization still has child organizations"));
        }

        let members = self
            .users
            .select_any(&StoreQuery::new().scoped(Some(vec![id])).page(Some(1), None))
            .await?;
        if !members.is_empty() {
            return Err(ApiError::conflict("Organization still has members"));
        }

        self.organizations.delete(id).await?;
        tracing::info!("Organization {} deleted by {}", organization.name, auth.user.email);
        Ok(())
    }

    /// 403 unless `organization_id` exists and is inside the caller's scope
    pub async fn ensure_writable(&self, auth: &AuthUser, organization_id: Uuid) -> Result<Organization, ApiError> {
        let scope = self.scope_for(&auth.user).await?;
        if !scope.contains(Some(organization_id)) {
            return Err(ApiError::forbidden("Organization is outside your scope"));
        }
        self.organizations
            .select_one(organization_id)
            .await?
            .ok_or_else(|| {
                let mut errors = FieldErrors::new();
                errors.add("organization_id", "Organization does not exist");
                errors.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn org(id: Uuid, parent: Option<Uuid>, org_type: OrganizationType) -> Organization {
        let now = Utc::now();
        Organization {
            id,
            name: format!("{:?}", org_type),
            org_type,
            parent_id: parent,
            address: None,
            phone: None,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn descendants_walk_the_tree() {
        let (gcc, dcc, lcc, lc, other_dcc) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let all = vec![
            org(gcc, None, OrganizationType::GCC),
            org(dcc, Some(gcc), OrganizationType::DCC),
            org(lcc, Some(dcc), OrganizationType::LCC),
            org(lc, Some(lcc), OrganizationType::LC),
            org(other_dcc, Some(gcc), OrganizationType::DCC),
        ];

        let under_dcc = descendants(dcc, &all);
        assert_eq!(under_dcc, HashSet::from([dcc, lcc, lc]));
        assert_eq!(descendants(gcc, &all).len(), 5);
        assert_eq!(descendants(lc, &all), HashSet::from([lc]));
    }

    #[test]
    fn scope_membership() {
        let id = Uuid::new_v4();
        let scope = Scope::Organizations(HashSet::from([id]));
        assert!(scope.contains(Some(id)));
        assert!(!scope.contains(Some(Uuid::new_v4())));
        assert!(!scope.contains(None));
        assert!(Scope::All.contains(None));
        assert!(scope.narrow(Uuid::new_v4()).is_err());
    }
}
