use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::review::{Review, Reviewable};
use super::user::Role;
use super::{optional_text, positive_amount, Entity, NewRecord, Resource, FINANCE_ROLES};
use crate::error::FieldErrors;

/// Money received by an organization (tithes, offerings, donations, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub amount: Decimal,
    pub category: String,
    pub source: Option<String>,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub recorded_by: Uuid,
    #[serde(flatten)]
    pub review: Review,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateIncome {
    pub organization_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateIncome {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub reference: Option<String>,
}

impl Entity for Income {
    const KIND: &'static str = "income";
    const LABEL: &'static str = "Income record";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl Reviewable for Income {
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

impl Resource for Income {
    type Create = CreateIncome;
    type Update = UpdateIncome;

    const READ_ROLES: &'static [Role] = FINANCE_ROLES;
    const WRITE_ROLES: &'static [Role] = FINANCE_ROLES;
    const FILTERS: &'static [&'static str] = &["status", "category"];

    fn requested_organization(input: &CreateIncome) -> Option<Uuid> {
        input.organization_id
    }

    fn build(input: CreateIncome, ctx: NewRecord) -> Result<Self, FieldErrors> {
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
            source: optional_text(input.source),
            description: optional_text(input.description),
            date: input.date.unwrap_or_else(|| ctx.now.date_naive()),
            reference: optional_text(input.reference),
            recorded_by: ctx.created_by,
            review: Review::default(),
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn apply(&mut self, input: UpdateIncome, now: DateTime<Utc>) -> Result<(), FieldErrors> {
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
        if input.source.is_some() {
            self.source = optional_text(input.source);
        }
        if input.description.is_some() {
            self.description = optional_text(input.description);
        }
        if let Some(date) = input.date {
            self.date = date;
        }
        if input.reference.is_some() {
            self.reference = optional_text(input.reference);
        }
        self.updated_at = now;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), String> {
        if self.review.is_pending() {
            Ok(())
        } else {
            Err(format!("Income record has been {} and can no longer be changed", self.review.status.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::review::ReviewStatus;

    fn ctx() -> NewRecord {
        NewRecord {
            organization_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            now: Utc::now(),
        }
    }

    #[test]
    fn new_income_is_pending_and_serializes_flat() {
        let income = Income::build(
            CreateIncome {
                amount: Some(Decimal::new(250_000, 2)),
                category: Some("tithe".into()),
                ..Default::default()
            },
            ctx(),
        )
        .unwrap();
        let json = serde_json::to_value(&income).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["amount"], "2500.00");
        assert!(json.get("review").is_none());
    }

    #[test]
    fn reviewed_income_is_immutable() {
        let mut income = Income::build(
            CreateIncome {
                amount: Some(Decimal::ONE),
                category: Some("offering".into()),
                ..Default::default()
            },
            ctx(),
        )
        .unwrap();
        assert!(income.ensure_mutable().is_ok());
        income
            .review
            .decide(ReviewStatus::Approved, Uuid::new_v4(), None, Utc::now())
            .unwrap();
        assert!(income.ensure_mutable().is_err());
    }
}
