use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{optional_email, optional_phone, optional_text, Entity};
use crate::error::FieldErrors;

/// ECWA council tiers, from the General Church Council down to a Local Church
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganizationType {
    GCC,
    DCC,
    LCC,
    LC,
}

impl OrganizationType {
    /// The tier a parent must belong to; `None` for the root tier
    pub fn parent_type(self) -> Option<OrganizationType> {
        match self {
            OrganizationType::GCC => None,
            OrganizationType::DCC => Some(OrganizationType::GCC),
            OrganizationType::LCC => Some(OrganizationType::DCC),
            OrganizationType::LC => Some(OrganizationType::LCC),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrganizationType::GCC => "General Church Council",
            OrganizationType::DCC => "District Church Council",
            OrganizationType::LCC => "Local Church Council",
            OrganizationType::LC => "Local Church",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    pub parent_id: Option<Uuid>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Organization {
    const KIND: &'static str = "organizations";
    const LABEL: &'static str = "Organization";

    fn id(&self) -> Uuid {
        self.id
    }

    // An organization is inside a scope when the scope contains the organization itself
    fn organization_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrganization {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub parent_id: Option<Uuid>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Organization {
    /// Build a new organization. `parent` is the record `input.parent_id`
    /// resolved to, or `None` when no parent was given or it does not exist.
    pub fn build(input: CreateOrganization, parent: Option<&Organization>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.require_text("name", input.name);
        let org_type = errors.require("type", input.org_type);
        let email = optional_email(&mut errors, "email", input.email);
        let phone = optional_phone(&mut errors, "phone", input.phone);

        if let Some(org_type) = org_type {
            match (org_type.parent_type(), input.parent_id, parent) {
                (None, Some(_), _) => errors.add("parent_id", "A GCC cannot have a parent organization"),
                (Some(expected), None, _) => errors.add(
                    "parent_id",
                    format!("A {:?} must have a {:?} parent", org_type, expected),
                ),
                (Some(_), Some(_), None) => errors.add("parent_id", "Parent organization does not exist"),
                (Some(expected), Some(_), Some(parent)) if parent.org_type != expected => errors.add(
                    "parent_id",
                    format!("A {:?} must have a {:?} parent, not {:?}", org_type, expected, parent.org_type),
                ),
                _ => {}
            }
        }

        let (Some(name), Some(org_type), true) = (name, org_type, errors.is_empty()) else {
            return Err(errors);
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            org_type,
            parent_id: input.parent_id,
            address: optional_text(input.address),
            phone,
            email,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, input: UpdateOrganization) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = input.name.map(|n| errors.require_text("name", Some(n)));
        let email = input.email.map(|e| optional_email(&mut errors, "email", Some(e)));
        let phone = input.phone.map(|p| optional_phone(&mut errors, "phone", Some(p)));
        errors.into_result()?;

        if let Some(Some(name)) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if input.address.is_some() {
            self.address = optional_text(input.address);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}
