use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use super::{non_negative, Entity, NewRecord, Resource, FINANCE_ROLES};
use crate::error::FieldErrors;

pub const DEFAULT_CURRENCY: &str = "NGN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Savings,
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub currency: String,
    pub status: AccountStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBankAccount {
    pub organization_id: Option<Uuid>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub account_type: Option<AccountType>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBankAccount {
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub account_type: Option<AccountType>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<AccountStatus>,
}

fn account_number(errors: &mut FieldErrors, value: Option<String>) -> Option<String> {
    let number = errors.require_text("account_number", value)?;
    if !number.chars().all(|c| c.is_ascii_digit()) || !(6..=20).contains(&number.len()) {
        errors.add("account_number", "Account number must be 6 to 20 digits");
        return None;
    }
    Some(number)
}

fn currency(errors: &mut FieldErrors, value: String) -> Option<String> {
    let code = value.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.add("currency", "Currency must be a three-letter ISO code");
        return None;
    }
    Some(code)
}

impl Entity for BankAccount {
    const KIND: &'static str = "bank_accounts";
    const LABEL: &'static str = "Bank account";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl Resource for BankAccount {
    type Create = CreateBankAccount;
    type Update = UpdateBankAccount;

    const READ_ROLES: &'static [Role] = FINANCE_ROLES;
    const WRITE_ROLES: &'static [Role] = FINANCE_ROLES;
    const FILTERS: &'static [&'static str] = &["status", "account_type", "currency"];

    fn requested_organization(input: &CreateBankAccount) -> Option<Uuid> {
        input.organization_id
    }

    fn build(input: CreateBankAccount, ctx: NewRecord) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let bank_name = errors.require_text("bank_name", input.bank_name);
        let account_name = errors.require_text("account_name", input.account_name);
        let number = account_number(&mut errors, input.account_number);
        let account_type = errors.require("account_type", input.account_type);
        let balance = non_negative(&mut errors, "balance", input.balance.unwrap_or(Decimal::ZERO));
        let code = currency(&mut errors, input.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()));

        let (Some(bank_name), Some(account_name), Some(number), Some(account_type), Some(code), true) =
            (bank_name, account_name, number, account_type, code, errors.is_empty())
        else {
            return Err(errors);
        };

        Ok(Self {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            bank_name,
            account_name,
            account_number: number,
            account_type,
            balance,
            currency: code,
            status: AccountStatus::Active,
            created_by: ctx.created_by,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn apply(&mut self, input: UpdateBankAccount, now: DateTime<Utc>) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let bank_name = input.bank_name.map(|n| errors.require_text("bank_name", Some(n)));
        let account_name = input.account_name.map(|n| errors.require_text("account_name", Some(n)));
        let number = input.account_number.map(|n| account_number(&mut errors, Some(n)));
        let balance = input.balance.map(|b| non_negative(&mut errors, "balance", b));
        let code = input.currency.map(|c| currency(&mut errors, c));
        errors.into_result()?;

        if let Some(Some(bank_name)) = bank_name {
            self.bank_name = bank_name;
        }
        if let Some(Some(account_name)) = account_name {
            self.account_name = account_name;
        }
        if let Some(Some(number)) = number {
            self.account_number = number;
        }
        if let Some(account_type) = input.account_type {
            self.account_type = account_type;
        }
        if let Some(balance) = balance {
            self.balance = balance;
        }
        if let Some(Some(code)) = code {
            self.currency = code;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
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

    fn input() -> CreateBankAccount {
        CreateBankAccount {
            bank_name: Some("First Bank".into()),
            account_name: Some("ECWA LCC Jos".into()),
            account_number: Some("0123456789".into()),
            account_type: Some(AccountType::Current),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_naira_with_zero_balance() {
        let account = BankAccount::build(input(), ctx()).unwrap();
        assert_eq!(account.currency, "NGN");
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.status, AccountStatus::Active);
    }

    #[test]
    fn rejects_negative_balance_and_bad_currency() {
        let err = BankAccount::build(
            CreateBankAccount {
                balance: Some(Decimal::new(-1, 0)),
                currency: Some("NAIRA".into()),
                account_number: Some("12-34".into()),
                ..input()
            },
            ctx(),
        )
        .unwrap_err();
        assert!(err.contains("balance"));
        assert!(err.contains("currency"));
        assert!(err.contains("account_number"));
    }
}
