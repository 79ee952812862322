use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use super::{non_negative, optional_text, Entity, NewRecord, Resource, FINANCE_ROLES};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryStatus {
    Pending,
    Paid,
}

/// Monthly salary record for a church worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salary {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_name: String,
    pub user_id: Option<Uuid>,
    pub position: Option<String>,
    /// `YYYY-MM`
    pub month: String,
    pub basic_salary: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
    pub net_salary: Decimal,
    pub status: SalaryStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSalary {
    pub organization_id: Option<Uuid>,
    pub employee_name: Option<String>,
    pub user_id: Option<Uuid>,
    pub position: Option<String>,
    pub month: Option<String>,
    pub basic_salary: Option<Decimal>,
    pub allowances: Option<Decimal>,
    pub deductions: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSalary {
    pub employee_name: Option<String>,
    pub position: Option<String>,
    pub month: Option<String>,
    pub basic_salary: Option<Decimal>,
    pub allowances: Option<Decimal>,
    pub deductions: Option<Decimal>,
}

pub fn validate_month(value: &str) -> Result<String, &'static str> {
    let value = value.trim();
    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
        .ok()
        .filter(|_| value.len() == 7)
        .map(|_| value.to_string())
        .ok_or("Month must be formatted as YYYY-MM")
}

fn month(errors: &mut FieldErrors, value: Option<String>) -> Option<String> {
    let value = errors.require_text("month", value)?;
    match validate_month(&value) {
        Ok(month) => Some(month),
        Err(msg) => {
            errors.add("month", msg);
            None
        }
    }
}

/// basic + allowances - deductions, which must not go negative
fn net_salary(errors: &mut FieldErrors, basic: Decimal, allowances: Decimal, deductions: Decimal) -> Decimal {
    let Some(net) = basic.checked_add(allowances).and_then(|gross| gross.checked_sub(deductions)) else {
        errors.add("basic_salary", "Salary amounts are too large");
        return Decimal::ZERO;
    };
    if net < Decimal::ZERO {
        errors.add("deductions", "Deductions exceed basic salary plus allowances");
    }
    net
}

impl Salary {
    pub fn is_paid(&self) -> bool {
        self.status == SalaryStatus::Paid
    }

    pub fn mark_paid(&mut self, by: Uuid, now: DateTime<Utc>) -> Result<(), String> {
        if self.is_paid() {
            return Err("Salary has already been paid".to_string());
        }
        self.status = SalaryStatus::Paid;
        self.paid_at = Some(now);
        self.paid_by = Some(by);
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Salary {
    const KIND: &'static str = "salaries";
    const LABEL: &'static str = "Salary record";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl Resource for Salary {
    type Create = CreateSalary;
    type Update = UpdateSalary;

    const READ_ROLES: &'static [Role] = FINANCE_ROLES;
    const WRITE_ROLES: &'static [Role] = FINANCE_ROLES;
    const FILTERS: &'static [&'static str] = &["status", "month"];

    fn requested_organization(input: &CreateSalary) -> Option<Uuid> {
        input.organization_id
    }

    fn build(input: CreateSalary, ctx: NewRecord) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let employee_name = errors.require_text("employee_name", input.employee_name);
        let month = month(&mut errors, input.month);
        let basic = errors
            .require("basic_salary", input.basic_salary)
            .map(|b| non_negative(&mut errors, "basic_salary", b));
        let allowances = non_negative(&mut errors, "allowances", input.allowances.unwrap_or(Decimal::ZERO));
        let deductions = non_negative(&mut errors, "deductions", input.deductions.unwrap_or(Decimal::ZERO));
        let net = basic.map(|b| net_salary(&mut errors, b, allowances, deductions));

        let (Some(employee_name), Some(month), Some(basic), Some(net), true) =
            (employee_name, month, basic, net, errors.is_empty())
        else {
            return Err(errors);
        };

        Ok(Self {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            employee_name,
            user_id: input.user_id,
            position: optional_text(input.position),
            month,
            basic_salary: basic,
            allowances,
            deductions,
            net_salary: net,
            status: SalaryStatus::Pending,
            paid_at: None,
            paid_by: None,
            created_by: ctx.created_by,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn apply(&mut self, input: UpdateSalary, now: DateTime<Utc>) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let employee_name = input.employee_name.map(|n| errors.require_text("employee_name", Some(n)));
        let new_month = input.month.map(|m| month(&mut errors, Some(m)));
        let basic = non_negative(&mut errors, "basic_salary", input.basic_salary.unwrap_or(self.basic_salary));
        let allowances = non_negative(&mut errors, "allowances", input.allowances.unwrap_or(self.allowances));
        let deductions = non_negative(&mut errors, "deductions", input.deductions.unwrap_or(self.deductions));
        let net = net_salary(&mut errors, basic, allowances, deductions);
        errors.into_result()?;

        if let Some(Some(employee_name)) = employee_name {
            self.employee_name = employee_name;
        }
        if let Some(Some(month)) = new_month {
            self.month = month;
        }
        if input.position.is_some() {
            self.position = optional_text(input.position);
        }
        self.basic_salary = basic;
        self.allowances = allowances;
        self.deductions = deductions;
        self.net_salary = net;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), String> {
        if self.is_paid() {
            Err("Salary has been paid and can no longer be changed".to_string())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NewRecord {
        NewRecord {
            organization_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            now: Utc::now(),
        }
    }

    fn input(deductions: i64) -> CreateSalary {
        CreateSalary {
            employee_name: Some("Deborah Yakubu".into()),
            month: Some("2024-03".into()),
            basic_salary: Some(Decimal::new(80_000, 0)),
            allowances: Some(Decimal::new(15_000, 0)),
            deductions: Some(Decimal::new(deductions, 0)),
            ..Default::default()
        }
    }

    #[test]
    fn net_salary_is_derived() {
        let salary = Salary::build(input(5_000), ctx()).unwrap();
        assert_eq!(salary.net_salary, Decimal::new(90_000, 0));
    }

    #[test]
    fn negative_net_is_rejected() {
        let err = Salary::build(input(100_000), ctx()).unwrap_err();
        assert!(err.contains("deductions"));
    }

    #[test]
    fn oversized_amounts_are_field_errors() {
        let mut huge = input(0);
        huge.basic_salary = Some(Decimal::MAX);
        huge.allowances = Some(Decimal::ONE);
        let err = Salary::build(huge, ctx()).unwrap_err();
        assert!(err.contains("basic_salary"));

        let mut salary = Salary::build(input(0), ctx()).unwrap();
        let err = salary
            .apply(
                UpdateSalary {
                    basic_salary: Some(Decimal::MAX),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(err.contains("basic_salary"));
        assert_eq!(salary.basic_salary, Decimal::new(80_000, 0));
    }

    #[test]
    fn month_format() {
        assert!(validate_month("2024-12").is_ok());
        assert!(validate_month("2024-13").is_err());
        assert!(validate_month("2024-1").is_err());
        assert!(validate_month("March 2024").is_err());
    }

    #[test]
    fn update_recomputes_net_and_paid_is_final() {
        let mut salary = Salary::build(input(0), ctx()).unwrap();
        salary
            .apply(
                UpdateSalary {
                    deductions: Some(Decimal::new(20_000, 0)),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(salary.net_salary, Decimal::new(75_000, 0));

        salary.mark_paid(Uuid::new_v4(), Utc::now()).unwrap();
        assert!(salary.ensure_mutable().is_err());
        assert!(salary.mark_paid(Uuid::new_v4(), Utc::now()).is_err());
    }
}
