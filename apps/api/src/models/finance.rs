use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "finance_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FinanceKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "finance_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FinanceCategory {
    Tithe,
    Offering,
    Donation,
    Pledge,
    Salary,
    Utilities,
    Maintenance,
    Missions,
    Events,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    MobileMoney,
    Cheque,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinanceRow {
    pub id: Uuid,
    pub kind: FinanceKind,
    pub category: FinanceCategory,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub donor_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
