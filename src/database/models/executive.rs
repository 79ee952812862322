use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agency::ActiveStatus;
use super::user::Role;
use super::{optional_email, optional_phone, Entity, NewRecord, Resource, ADMIN_ROLES, ALL_ROLES};
use crate::error::FieldErrors;

/// An office holder of an organization (chairman, secretary, treasurer, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Executive {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub position: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub status: ActiveStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateExecutive {
    pub organization_id: Option<Uuid>,
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub status: Option<ActiveStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExecutive {
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub status: Option<ActiveStatus>,
}

fn check_term(errors: &mut FieldErrors, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.add("term_end", "Term end must not be before term start");
        }
    }
}

impl Entity for Executive {
    const KIND: &'static str = "executives";
    const LABEL: &'static str = "Executive";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl Resource for Executive {
    type Create = CreateExecutive;
    type Update = UpdateExecutive;

    const READ_ROLES: &'static [Role] = ALL_ROLES;
    const WRITE_ROLES: &'static [Role] = ADMIN_ROLES;
    const FILTERS: &'static [&'static str] = &["status", "position"];

    fn requested_organization(input: &CreateExecutive) -> Option<Uuid> {
        input.organization_id
    }

    fn build(input: CreateExecutive, ctx: NewRecord) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.require_text("name", input.name);
        let position = errors.require_text("position", input.position);
        let email = optional_email(&mut errors, "email", input.email);
        let phone = optional_phone(&mut errors, "phone", input.phone);
        check_term(&mut errors, input.term_start, input.term_end);

        let (Some(name), Some(position), true) = (name, position, errors.is_empty()) else {
            return Err(errors);
        };

        Ok(Self {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            name,
            position,
            email,
            phone,
            term_start: input.term_start,
            term_end: input.term_end,
            status: input.status.unwrap_or(ActiveStatus::Active),
            created_by: ctx.created_by,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn apply(&mut self, input: UpdateExecutive, now: DateTime<Utc>) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = input.name.map(|n| errors.require_text("name", Some(n)));
        let position = input.position.map(|p| errors.require_text("position", Some(p)));
        let email = input.email.map(|e| optional_email(&mut errors, "email", Some(e)));
        let phone = input.phone.map(|p| optional_phone(&mut errors, "phone", Some(p)));
        let term_start = input.term_start.or(self.term_start);
        let term_end = input.term_end.or(self.term_end);
        check_term(&mut errors, term_start, term_end);
        errors.into_result()?;

        if let Some(Some(name)) = name {
            self.name = name;
        }
        if let Some(Some(position)) = position {
            self.position = position;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.term_start = term_start;
        self.term_end = term_end;
        self.updated_at = now;
        Ok(())
    }
}
