use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::AppError;
use crate::finance::commands::{CreateFinance, UpdateFinance};
use crate::models::finance::{FinanceCategory, FinanceKind, FinanceRow, PaymentMethod};
use crate::pagination::{fetch_page, Paginated, Pagination};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceFilter {
    pub kind: Option<FinanceKind>,
    pub category: Option<FinanceCategory>,
    pub payment_method: Option<PaymentMethod>,
    pub currency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FinanceFilter {
    pub fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(kind) = self.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }
        if let Some(category) = self.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(method) = self.payment_method {
            qb.push(" AND payment_method = ").push_bind(method);
        }
        if let Some(currency) = &self.currency {
            qb.push(" AND currency = ").push_bind(currency.trim().to_ascii_uppercase());
        }
        let range = DateRange::new(self.start_date, self.end_date);
        if let Some(from) = range.from() {
            qb.push(" AND transaction_date >= ").push_bind(from);
        }
        if let Some(until) = range.until() {
            qb.push(" AND transaction_date < ").push_bind(until);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub kind: FinanceKind,
    pub category: FinanceCategory,
    pub total: Decimal,
}

/// Totals for one currency. Amounts in different currencies are never added together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencySummary {
    pub currency: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

/// Folds `(currency, kind, category, sum)` groups into per-currency summaries,
/// ordered by currency code and then by category.
pub fn summarize(groups: Vec<(String, FinanceKind, FinanceCategory, Decimal)>) -> Vec<CurrencySummary> {
    let mut per_currency: BTreeMap<String, BTreeMap<(FinanceCategory, bool), Decimal>> = BTreeMap::new();
    for (currency, kind, category, total) in groups {
        let is_expense = kind == FinanceKind::Expense;
        *per_currency
            .entry(currency)
            .or_default()
            .entry((category, is_expense))
            .or_default() += total;
    }

    per_currency
        .into_iter()
        .map(|(currency, categories)| {
            let mut income = Decimal::ZERO;
            let mut expense = Decimal::ZERO;
            let by_category = categories
                .into_iter()
                .map(|((category, is_expense), total)| {
                    let kind = if is_expense {
                        expense += total;
                        FinanceKind::Expense
                    } else {
                        income += total;
                        FinanceKind::Income
                    };
                    CategoryTotal { kind, category, total }
                })
                .collect();
            CurrencySummary {
                currency,
                income,
                expense,
                net: income - expense,
                by_category,
            }
        })
        .collect()
}

pub async fn create_finance(
    pool: &PgPool,
    cmd: CreateFinance,
    actor: Uuid,
    default_currency: &str,
) -> Result<FinanceRow, AppError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, FinanceRow>(
        r#"
        INSERT INTO finances
            (id, kind, category, amount, currency, description, donor_name,
             payment_method, reference, transaction_date, recorded_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cmd.kind)
    .bind(cmd.category)
    .bind(cmd.amount)
    .bind(cmd.currency.as_deref().unwrap_or(default_currency))
    .bind(&cmd.description)
    .bind(&cmd.donor_name)
    .bind(cmd.payment_method)
    .bind(&cmd.reference)
    .bind(cmd.transaction_date.unwrap_or(now))
    .bind(actor)
    .bind(now)
    .fetch_one(pool)
    .await?;

    info!("Recorded {:?} {} {} ({:?})", row.kind, row.amount, row.currency, row.category);
    Ok(row)
}

pub async fn list_finances(
    pool: &PgPool,
    filter: &FinanceFilter,
    pagination: Pagination,
) -> Result<Paginated<FinanceRow>, AppError> {
    Ok(fetch_page(
        pool,
        "finances",
        "transaction_date DESC, created_at DESC",
        pagination,
        |qb| filter.push_filters(qb),
    )
    .await?)
}

pub async fn get_finance(pool: &PgPool, id: Uuid) -> Result<FinanceRow, AppError> {
    sqlx::query_as::<_, FinanceRow>("SELECT * FROM finances WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn update_finance(
    pool: &PgPool,
    id: Uuid,
    cmd: UpdateFinance,
) -> Result<FinanceRow, AppError> {
    sqlx::query_as::<_, FinanceRow>(
        r#"
        UPDATE finances SET
            kind = COALESCE($2, kind),
            category = COALESCE($3, category),
            amount = COALESCE($4, amount),
            currency = COALESCE($5, currency),
            description = COALESCE($6, description),
            donor_name = COALESCE($7, donor_name),
            payment_method = COALESCE($8, payment_method),
            reference = COALESCE($9, reference),
            transaction_date = COALESCE($10, transaction_date),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(cmd.kind)
    .bind(cmd.category)
    .bind(cmd.amount)
    .bind(&cmd.currency)
    .bind(&cmd.description)
    .bind(&cmd.donor_name)
    .bind(cmd.payment_method)
    .bind(&cmd.reference)
    .bind(cmd.transaction_date)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

pub async fn delete_finance(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM finances WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted finance record {id}");
    Ok(())
}

pub async fn summary(pool: &PgPool, filter: &FinanceFilter) -> Result<Vec<CurrencySummary>, AppError> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT currency, kind, category, SUM(amount) FROM finances WHERE TRUE",
    );
    filter.push_filters(&mut qb);
    qb.push(" GROUP BY currency, kind, category");
    let groups: Vec<(String, FinanceKind, FinanceCategory, Decimal)> =
        qb.build_query_as().fetch_all(pool).await?;
    Ok(summarize(groups))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Finance record {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_summarize_per_currency() {
        let summary = summarize(vec![
            ("USD".to_string(), FinanceKind::Income, FinanceCategory::Tithe, dec("1200.00")),
            ("USD".to_string(), FinanceKind::Income, FinanceCategory::Offering, dec("310.25")),
            ("USD".to_string(), FinanceKind::Expense, FinanceCategory::Utilities, dec("450.10")),
            ("GHS".to_string(), FinanceKind::Income, FinanceCategory::Offering, dec("90.00")),
        ]);

        assert_eq!(summary.len(), 2);
        let ghs = &summary[0];
        assert_eq!(ghs.currency, "GHS");
        assert_eq!(ghs.net, dec("90.00"));

        let usd = &summary[1];
        assert_eq!(usd.income, dec("1510.25"));
        assert_eq!(usd.expense, dec("450.10"));
        assert_eq!(usd.net, dec("1060.15"));
        let categories: Vec<FinanceCategory> = usd.by_category.iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            vec![FinanceCategory::Tithe, FinanceCategory::Offering, FinanceCategory::Utilities]
        );
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(vec![]).is_empty());
    }

    #[test]
    fn test_filter_sql() {
        let filter = FinanceFilter {
            kind: Some(FinanceKind::Income),
            currency: Some("usd".to_string()),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM finances WHERE TRUE");
        filter.push_filters(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM finances WHERE TRUE AND kind = $1 AND currency = $2 AND transaction_date < $3"
        );
    }
}
