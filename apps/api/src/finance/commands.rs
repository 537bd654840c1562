use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::dates;
use crate::errors::AppError;
use crate::models::finance::{FinanceCategory, FinanceKind, PaymentMethod};
use crate::visitors::commands::non_blank;

/// NUMERIC(12, 2) upper bound.
const MAX_AMOUNT: i64 = 9_999_999_999;

/// Request body for POST /api/finances.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateFinance {
    pub kind: FinanceKind,
    pub category: FinanceCategory,
    pub amount: Decimal,
    /// ISO 4217 code; the configured default when omitted.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub donor_name: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    /// Defaults to the time of the request.
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl CreateFinance {
    pub fn validate(mut self, default_currency: &str) -> Result<Self, AppError> {
        validate_amount(self.amount)?;
        self.currency = Some(normalize_currency(
            self.currency.as_deref().unwrap_or(default_currency),
        )?);
        self.description = non_blank(self.description);
        self.donor_name = non_blank(self.donor_name);
        self.reference = non_blank(self.reference);
        Ok(self)
    }
}

/// Request body for PUT /api/finances/:id. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateFinance {
    #[serde(default)]
    pub kind: Option<FinanceKind>,
    #[serde(default)]
    pub category: Option<FinanceCategory>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl UpdateFinance {
    pub fn validate(mut self) -> Result<Self, AppError> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        self.currency = self.currency.as_deref().map(normalize_currency).transpose()?;
        self.description = non_blank(self.description);
        self.donor_name = non_blank(self.donor_name);
        self.reference = non_blank(self.reference);
        Ok(self)
    }
}

fn validate_amount(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("amount must be greater than zero".to_string()));
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::Validation(
            "amount must have at most two decimal places".to_string(),
        ));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(AppError::Validation("amount is too large".to_string()));
    }
    Ok(())
}

fn normalize_currency(raw: &str) -> Result<String, AppError> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "'{raw}' is not a three-letter currency code"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn create(json: &str) -> Result<CreateFinance, AppError> {
        serde_json::from_str::<CreateFinance>(json)
            .map_err(|e| AppError::Validation(e.to_string()))?
            .validate("USD")
    }

    #[test]
    fn test_currency_defaults_and_normalizes() {
        let f = create(r#"{"kind":"income","category":"tithe","amount":"150.50","paymentMethod":"cash"}"#)
            .unwrap();
        assert_eq!(f.currency.as_deref(), Some("USD"));
        assert_eq!(f.amount, Decimal::from_str("150.50").unwrap());

        let f = create(
            r#"{"kind":"income","category":"offering","amount":20,"currency":"ghs","paymentMethod":"mobile_money"}"#,
        )
        .unwrap();
        assert_eq!(f.currency.as_deref(), Some("GHS"));
    }

    #[test]
    fn test_amount_must_be_positive_with_cents() {
        for amount in [r#""0""#, r#""-5""#, r#""1.005""#, r#""99999999999""#] {
            let json = format!(
                r#"{{"kind":"expense","category":"utilities","amount":{amount},"paymentMethod":"card"}}"#
            );
            assert!(matches!(create(&json), Err(AppError::Validation(_))), "{amount}");
        }
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        assert!(validate_amount(Decimal::from_str("12.500").unwrap()).is_ok());
    }

    #[test]
    fn test_bad_currency_rejected() {
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("U$D").is_err());
        assert_eq!(normalize_currency(" eur ").unwrap(), "EUR");
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        let u: UpdateFinance = serde_json::from_str(r#"{"description":"  "}"#).unwrap();
        let u = u.validate().unwrap();
        assert!(u.description.is_none());
        assert!(u.amount.is_none());

        let u: UpdateFinance = serde_json::from_str(r#"{"amount":"-1"}"#).unwrap();
        assert!(u.validate().is_err());
    }
}
