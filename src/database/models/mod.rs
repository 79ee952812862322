pub mod agency;
pub mod bank_account;
pub mod executive;
pub mod expenditure;
pub mod income;
pub mod invite;
pub mod organization;
pub mod review;
pub mod salary;
pub mod user;
pub mod verification;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::FieldErrors;
use user::Role;

/// A record kind persisted through `Repository<T>`
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage namespace
    const KIND: &'static str;
    /// Human label used in messages ("Bank account not found")
    const LABEL: &'static str;
    const CONFLICT_MESSAGE: &'static str = "Record already exists";

    fn id(&self) -> Uuid;

    /// Organization the record belongs to, used for access scoping
    fn organization_id(&self) -> Option<Uuid>;

    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Context for records created through the generic CRUD handlers
#[derive(Debug, Clone, Copy)]
pub struct NewRecord {
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub now: DateTime<Utc>,
}

/// An organization-owned entity exposed through the generic CRUD endpoints
pub trait Resource: Entity {
    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;

    const READ_ROLES: &'static [Role];
    const WRITE_ROLES: &'static [Role];

    /// Query-string fields accepted as list filters
    const FILTERS: &'static [&'static str] = &[];

    fn requested_organization(input: &Self::Create) -> Option<Uuid>;

    fn build(input: Self::Create, ctx: NewRecord) -> Result<Self, FieldErrors>;

    fn apply(&mut self, input: Self::Update, now: DateTime<Utc>) -> Result<(), FieldErrors>;

    /// Refuse edits once a record is settled (e.g. approved or paid)
    fn ensure_mutable(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Roles that manage finance records
pub const FINANCE_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::FinancialSecretary];

/// Administrators only
pub const ADMIN_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin];

/// Every authenticated role
pub const ALL_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::FinancialSecretary, Role::Member];

/// Validate and normalize an email address (trimmed, lowercased)
pub fn validate_email_format(email: &str) -> Result<String, &'static str> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err("Email cannot be empty");
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err("Invalid email format");
    }
    let domain = parts[1];
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format");
    }

    Ok(email)
}

pub fn validate_phone_format(phone: &str) -> Result<String, &'static str> {
    let phone = phone.trim();
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if !allowed || !(7..=15).contains(&digits) {
        return Err("Invalid phone number");
    }
    Ok(phone.to_string())
}

/// Optional email field: blank is treated as absent
pub(crate) fn optional_email(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => match validate_email_format(&v) {
            Ok(email) => Some(email),
            Err(msg) => {
                errors.add(field, msg);
                None
            }
        },
        None => None,
    }
}

pub(crate) fn optional_phone(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => match validate_phone_format(&v) {
            Ok(phone) => Some(phone),
            Err(msg) => {
                errors.add(field, msg);
                None
            }
        },
        None => None,
    }
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Largest amount accepted on any money field (one quadrillion). Sums of
/// capped amounts stay far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

const MAX_AMOUNT_MESSAGE: &str = "Amount must not exceed 1000000000000000";

/// Required amount that must be strictly positive
pub(crate) fn positive_amount(errors: &mut FieldErrors, field: &str, value: Option<Decimal>) -> Option<Decimal> {
    let amount = errors.require(field, value)?;
    if amount <= Decimal::ZERO {
        errors.add(field, "Amount must be greater than zero");
        return None;
    }
    if amount > MAX_AMOUNT {
        errors.add(field, MAX_AMOUNT_MESSAGE);
        return None;
    }
    Some(amount)
}

pub(crate) fn non_negative(errors: &mut FieldErrors, field: &str, value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        errors.add(field, "Must not be negative");
    } else if value > MAX_AMOUNT {
        errors.add(field, MAX_AMOUNT_MESSAGE);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(validate_email_format(" Pastor@ECWA.org ").unwrap(), "pastor@ecwa.org");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "no-at-sign.org", "a@b", "@ecwa.org", "a@@ecwa.org", "a b@ecwa.org", "a@.org"] {
            assert!(validate_email_format(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn phone_numbers() {
        assert_eq!(validate_phone_format("+234 803 123 4567").unwrap(), "+234 803 123 4567");
        assert!(validate_phone_format("12").is_err());
        assert!(validate_phone_format("0803-CALL-NOW").is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        let mut errors = FieldErrors::new();
        assert_eq!(positive_amount(&mut errors, "amount", Some(Decimal::ZERO)), None);
        assert!(errors.contains("amount"));

        let mut errors = FieldErrors::new();
        assert_eq!(positive_amount(&mut errors, "amount", None), None);
        assert!(errors.contains("amount"));

        let mut errors = FieldErrors::new();
        assert_eq!(positive_amount(&mut errors, "amount", Some(Decimal::new(1050, 2))), Some(Decimal::new(1050, 2)));
        assert!(errors.is_empty());
    }

    #[test]
    fn amounts_are_capped() {
        assert_eq!(MAX_AMOUNT, Decimal::new(1_000_000_000_000_000, 0));

        let mut errors = FieldErrors::new();
        assert_eq!(positive_amount(&mut errors, "amount", Some(MAX_AMOUNT)), Some(MAX_AMOUNT));
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        assert_eq!(positive_amount(&mut errors, "amount", Some(Decimal::MAX)), None);
        assert!(errors.contains("amount"));

        let mut errors = FieldErrors::new();
        non_negative(&mut errors, "balance", MAX_AMOUNT + Decimal::ONE);
        assert!(errors.contains("balance"));
    }
}
