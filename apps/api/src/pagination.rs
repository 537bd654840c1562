//! Page resolution and the shared list envelope.
//!
//! Every list endpoint extracts `Query<PageParams>` next to its own filter
//! struct; both deserialize from the same query string.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

/// Raw `?page=&limit=` values as sent by the caller.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A resolved, 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Clamps `page` and `limit` to at least 1 and caps `limit` at `max_limit`.
    /// Pages beyond the last one are valid and simply come back empty.
    pub fn resolve(params: PageParams, default_limit: i64, max_limit: i64) -> Self {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// `ceil(total / limit)`; zero when nothing matches.
pub fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// List response envelope shared by every paginated endpoint.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            data,
            total,
            page: pagination.page,
            limit: pagination.limit,
            pages: page_count(total, pagination.limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            pages: self.pages,
        }
    }
}

/// Runs a filtered COUNT and a filtered, ordered page SELECT against `table`.
///
/// `push_filters` appends ` AND ...` clauses; both statements start from
/// `WHERE TRUE` so the closure never has to track whether it is first.
pub async fn fetch_page<T, F>(
    pool: &PgPool,
    table: &str,
    order_by: &str,
    pagination: Pagination,
    push_filters: F,
) -> Result<Paginated<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'static, Postgres>),
{
    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table} WHERE TRUE"));
    push_filters(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {table} WHERE TRUE"));
    push_filters(&mut select);
    select.push(format!(" ORDER BY {order_by} LIMIT "));
    select.push_bind(pagination.limit);
    select.push(" OFFSET ");
    select.push_bind(pagination.offset());
    let data = select.build_query_as::<T>().fetch_all(pool).await?;

    Ok(Paginated::new(data, total, pagination))
}

/// Escapes LIKE metacharacters and wraps the term for a substring match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let p = Pagination::resolve(PageParams::default(), 20, 100);
        assert_eq!(p, Pagination { page: 1, limit: 20 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_resolve_clamps_low_values() {
        let p = Pagination::resolve(
            PageParams {
                page: Some(0),
                limit: Some(-5),
            },
            20,
            100,
        );
        assert_eq!(p, Pagination { page: 1, limit: 1 });
    }

    #[test]
    fn test_resolve_caps_limit() {
        let p = Pagination::resolve(
            PageParams {
                page: Some(3),
                limit: Some(10_000),
            },
            20,
            100,
        );
        assert_eq!(p.limit, 100);
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn test_page_count_is_ceiling() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(95, 20), 5);
    }

    #[test]
    fn test_page_beyond_last_is_empty_not_error() {
        let page: Paginated<u8> = Paginated::new(vec![], 15, Pagination { page: 9, limit: 10 });
        assert!(page.data.is_empty());
        assert_eq!(page.pages, 2);
        assert_eq!(page.page, 9);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_map_keeps_counts() {
        let page = Paginated::new(vec![1, 2], 7, Pagination { page: 2, limit: 2 }).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.pages, 4);
    }
}
