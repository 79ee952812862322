use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use super::{optional_email, optional_phone, optional_text, Entity, NewRecord, Resource, ADMIN_ROLES, ALL_ROLES};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveStatus {
    Active,
    Inactive,
}

/// A church agency (women's fellowship, youth, evangelism, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub leader_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: ActiveStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAgency {
    pub organization_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub leader_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<ActiveStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAgency {
    pub name: Option<String>,
    pub description: Option<String>,
    pub leader_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<ActiveStatus>,
}

impl Entity for Agency {
    const KIND: &'static str = "agencies";
    const LABEL: &'static str = "Agency";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl Resource for Agency {
    type Create = CreateAgency;
    type Update = UpdateAgency;

    const READ_ROLES: &'static [Role] = ALL_ROLES;
    const WRITE_ROLES: &'static [Role] = ADMIN_ROLES;
    const FILTERS: &'static [&'static str] = &["status"];

    fn requested_organization(input: &CreateAgency) -> Option<Uuid> {
        input.organization_id
    }

    fn build(input: CreateAgency, ctx: NewRecord) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.require_text("name", input.name);
        let phone = optional_phone(&mut errors, "phone", input.phone);
        let email = optional_email(&mut errors, "email", input.email);

        let (Some(name), true) = (name, errors.is_empty()) else {
            return Err(errors);
        };

        Ok(Self {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            name,
            description: optional_text(input.description),
            leader_name: optional_text(input.leader_name),
            phone,
            email,
            status: input.status.unwrap_or(ActiveStatus::Active),
            created_by: ctx.created_by,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn apply(&mut self, input: UpdateAgency, now: DateTime<Utc>) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = input.name.map(|n| errors.require_text("name", Some(n)));
        let phone = input.phone.map(|p| optional_phone(&mut errors, "phone", Some(p)));
        let email = input.email.map(|e| optional_email(&mut errors, "email", Some(e)));
        errors.into_result()?;

        if let Some(Some(name)) = name {
            self.name = name;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if input.description.is_some() {
            self.description = optional_text(input.description);
        }
        if input.leader_name.is_some() {
            self.leader_name = optional_text(input.leader_name);
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }
}
