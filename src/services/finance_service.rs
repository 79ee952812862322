use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::models::bank_account::{AccountStatus, BankAccount};
use crate::database::models::expenditure::Expenditure;
use crate::database::models::income::Income;
use crate::database::models::review::ReviewStatus;
use crate::database::models::salary::{Salary, SalaryStatus};
use crate::database::models::FINANCE_ROLES;
use crate::database::StoreQuery;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::organization_service::OrganizationService;
use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewTotals {
    pub approved: Decimal,
    pub pending: Decimal,
    pub rejected: Decimal,
    pub count: usize,
}

fn accumulate(total: &mut Decimal, amount: Decimal) -> Result<(), ApiError> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| ApiError::internal_server_error("Finance totals overflowed"))?;
    Ok(())
}

impl ReviewTotals {
    fn add(&mut self, status: ReviewStatus, amount: Decimal) -> Result<(), ApiError> {
        let total = match status {
            ReviewStatus::Approved => &mut self.approved,
            ReviewStatus::Pending => &mut self.pending,
            ReviewStatus::Rejected => &mut self.rejected,
        };
        accumulate(total, amount)?;
        self.count += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalaryTotals {
    pub pending: Decimal,
    pub paid: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinanceSummary {
    pub organization_id: Option<Uuid>,
    pub income: ReviewTotals,
    pub expenditure: ReviewTotals,
    /// Approved income minus approved expenditure
    pub net: Decimal,
    /// Active account balances keyed by currency
    pub bank_balances: BTreeMap<String, Decimal>,
    pub salaries: SalaryTotals,
}

pub fn summarize(
    income: &[Income],
    expenditures: &[Expenditure],
    accounts: &[BankAccount],
    salaries: &[Salary],
) -> Result<FinanceSummary, ApiError> {
    let mut summary = FinanceSummary::default();

    for record in income {
        summary.income.add(record.review.status, record.amount)?;
    }
    for record in expenditures {
        summary.expenditure.add(record.review.status, record.amount)?;
    }
    summary.net = summary
        .income
        .approved
        .checked_sub(summary.expenditure.approved)
        .ok_or_else(|| ApiError::internal_server_error("Finance totals overflowed"))?;

    for account in accounts.iter().filter(|a| a.status == AccountStatus::Active) {
        let balance = summary
            .bank_balances
            .entry(account.currency.clone())
            .or_insert(Decimal::ZERO);
        accumulate(balance, account.balance)?;
    }

    for salary in salaries {
        let total = match salary.status {
            SalaryStatus::Pending => &mut summary.salaries.pending,
            SalaryStatus::Paid => &mut summary.salaries.paid,
        };
        accumulate(total, salary.net_salary)?;
        summary.salaries.count += 1;
    }

    Ok(summary)
}

/// Totals over the caller's scope, optionally narrowed to one organization
pub async fn summary(state: &AppState, auth: &AuthUser, organization_id: Option<Uuid>) -> Result<FinanceSummary, ApiError> {
    auth.require(FINANCE_ROLES)?;

    let scope = OrganizationService::new(state).scope_for(&auth.user).await?;
    let ids = match organization_id {
        Some(id) => Some(scope.narrow(id)?),
        None => scope.ids(),
    };
    let query = StoreQuery::new().scoped(ids);

    let income = state.repo::<Income>().select_any(&query).await?;
    let expenditures = state.repo::<Expenditure>().select_any(&query).await?;
    let accounts = state.repo::<BankAccount>().select_any(&query).await?;
    let salaries = state.repo::<Salary>().select_any(&query).await?;

    let mut summary = summarize(&income, &expenditures, &accounts, &salaries)?;
    summary.organization_id = organization_id;
    Ok(summary)
}
