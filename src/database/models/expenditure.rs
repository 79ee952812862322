use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::review::{Review, Reviewable};
use super::user::Role;
use super::{optional_text, positive_amount, Entity, NewRecord, Resource, FINANCE_ROLES};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expenditure {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub payee: Option<String>,
    pub date: NaiveDate,
    pub requested_by: Uuid,
    #[serde(flatten)]
    pub review: Review,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateExpenditure {
    pub organization_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub payee: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenditure {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub payee: Option<String>,
    pub date: Option<NaiveDate>,
}

impl Entity for Expenditure {
    const KIND: &'static str = "expenditures";
    const LABEL: &'static str = "Expenditure";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl Reviewable for Expenditure {
    fn review(&self) -> &Review {
        &self.review
    }

    fn review_mut(&mut self) -> &mut Review {
        &mut self.review
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Resource for Expenditure {
    type Create = CreateExpenditure;
    type Update = UpdateExpenditure;

    const READ_ROLES: &'static [Role] = FINANCE_ROLES;
    const WRITE_ROLES: &'static [Role] = FINANCE_ROLES;
    const FILTERS: &'static [&'static str] = &["status", "category"];

    fn requested_organization(input: &CreateExpenditure) -> Option<Uuid> {
        input.organization_id
    }

    fn build(input: CreateExpenditure, ctx: NewRecord) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let amount = positive_amount(&mut errors, "amount", input.amount);
        let category = errors.require_text("category", input.category);

        let (Some(amount), Some(category), true) = (amount, category, errors.is_empty()) else {
            return Err(errors);
        };

        Ok(Self {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            amount,
            category,
            description: optional_text(input.description),
            payee: optional_text(input.payee),
            date: input.date.unwrap_or_else(|| ctx.now.date_naive()),
            requested_by: ctx.created_by,
            review: Review::default(),
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn apply(&mut self, input: UpdateExpenditure, now: DateTime<Utc>) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let amount = input.amount.map(|a| positive_amount(&mut errors, "amount", Some(a)));
        let category = input.category.map(|c| errors.require_text("category", Some(c)));
        errors.into_result()?;

        if let Some(Some(amount)) = amount {
            self.amount = amount;
        }
        if let Some(Some(category)) = category {
            self.category = category;
        }
        if input.description.is_some() {
            self.description = optional_text(input.description);
        }
        if input.payee.is_some() {
            self.payee = optional_text(input.payee);
        }
        if let Some(date) = input.date {
            self.date = date;
        }
        self.updated_at = now;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), String> {
        if self.review.is_pending() {
            Ok(())
        } else {
            Err(format!("Expenditure has been {} and can no longer be changed", self.review.status.as_str()))
        }
    }
}
