//! Merchant-ownership rewriting for tenant-owned tables.
//!
//! Every read, update and delete against `products`, `orders` or `users`
//! goes through [`scope_query`]. Under [`Scope::ScopedTo`] the statement gains
//! an `owner = $N` predicate with the merchant id bound as the last parameter;
//! under [`Scope::Unscoped`] it is returned untouched.

use std::borrow::Cow;

use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Postgres};

use crate::database::manager::DatabaseError;
use crate::tenant::Scope;
use crate::types::MerchantId;

/// Ownership column used when a statement reads a single table
pub const OWNER_COLUMN: &str = "merchant_id";

const SET_OPERATORS: [&str; 3] = ["UNION", "INTERSECT", "EXCEPT"];

/// Positional statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i32),
    BigInt(i64),
    Decimal(Decimal),
    Bool(bool),
    Text(Option<String>),
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::BigInt(v)
    }
}

impl From<Decimal> for SqlParam {
    fn from(v: Decimal) -> Self {
        SqlParam::Decimal(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(Some(v))
    }
}

impl From<Option<String>> for SqlParam {
    fn from(v: Option<String>) -> Self {
        SqlParam::Text(v)
    }
}

/// Statement text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedQuery {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Scope a statement on the default `merchant_id` column.
pub fn scope_query(
    scope: &Scope,
    base_query: &str,
    params: Vec<SqlParam>,
) -> Result<ScopedQuery, DatabaseError> {
    scope_query_on(scope, OWNER_COLUMN, base_query, params)
}

/// Scope a statement on an explicit ownership column, e.g. `o.merchant_id` in a join.
///
/// Comments are dropped from scoped statements. A statement with a top-level
/// `UNION`, `INTERSECT`, `EXCEPT` or a second statement after `;` is refused,
/// since one appended predicate cannot cover every branch.
pub fn scope_query_on(
    scope: &Scope,
    owner_column: &str,
    base_query: &str,
    mut params: Vec<SqlParam>,
) -> Result<ScopedQuery, DatabaseError> {
    let merchant_id: MerchantId = match scope {
        Scope::Unscoped => {
            return Ok(ScopedQuery {
                query: base_query.to_string(),
                params,
            })
        }
        Scope::ScopedTo(id) => *id,
    };

    let cleaned = strip_comments(base_query);
    let statement = cleaned.trim_end();
    let statement = statement.strip_suffix(';').unwrap_or(statement).trim_end();

    let words = top_level_words(statement);
    if let Some(w) = words.iter().find(|w| w.is(";") || SET_OPERATORS.iter().any(|op| w.is(op))) {
        return Err(DatabaseError::Unscopable(format!("top-level `{}` in `{}`", w.text, statement.trim())));
    }

    let predicate = format!("{} = ${}", owner_column, params.len() + 1);
    params.push(SqlParam::Int(merchant_id));

    let where_idx = words.iter().position(|w| w.is("WHERE"));
    let tail_start = (where_idx.map_or(0, |i| i + 1)..words.len())
        .find(|&i| starts_trailing_clause(&words, i))
        .map_or(statement.len(), |i| words[i].start);

    let head = statement[..tail_start].trim_end();
    let tail = &statement[tail_start..];

    let mut query = String::with_capacity(statement.len() + predicate.len() + 16);
    match where_idx {
        Some(i) => {
            let body_start = words[i].end();
            let body = head[body_start..].trim();
            let has_or = words[i + 1..]
                .iter()
                .take_while(|w| w.start < tail_start)
                .any(|w| w.is("OR"));

            query.push_str(&head[..body_start]);
            if has_or {
                // AND binds tighter than OR; keep the caller's disjunction intact.
                query.push_str(" (");
                query.push_str(body);
                query.push(')');
            } else {
                query.push(' ');
                query.push_str(body);
            }
            query.push_str(" AND ");
        }
        None => {
            query.push_str(head);
            query.push_str(" WHERE ");
        }
    }
    query.push_str(&predicate);

    if !tail.is_empty() {
        query.push(' ');
        query.push_str(tail);
    }

    Ok(ScopedQuery { query, params })
}

impl ScopedQuery {
    /// Wrap a statement that is deliberately not tenant-scoped.
    pub fn unscoped(query: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    pub async fn fetch_all<T>(&self, pool: &PgPool) -> Result<Vec<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, T>(&self.query);
        for p in self.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn fetch_optional<T>(&self, pool: &PgPool) -> Result<Option<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, T>(&self.query);
        for p in self.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(pool).await?)
    }

    pub async fn fetch_one<T>(&self, pool: &PgPool) -> Result<T, DatabaseError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, T>(&self.query);
        for p in self.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_one(pool).await?)
    }

    /// Run a `SELECT COUNT(*) ...` style statement
    pub async fn fetch_count(&self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = self.fetch_one(pool).await?;
        Ok(count)
    }

    /// Execute and return the number of affected rows
    pub async fn execute(&self, pool: &PgPool) -> Result<u64, DatabaseError> {
        let mut q = sqlx::query(&self.query);
        for p in self.params.iter() {
            q = bind_param_query(q, p);
        }
        Ok(q.execute(pool).await?.rows_affected())
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match p {
        SqlParam::Int(v) => q.bind(*v),
        SqlParam::BigInt(v) => q.bind(*v),
        SqlParam::Decimal(v) => q.bind(*v),
        SqlParam::Bool(v) => q.bind(*v),
        SqlParam::Text(v) => q.bind(v.as_deref()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match p {
        SqlParam::Int(v) => q.bind(*v),
        SqlParam::BigInt(v) => q.bind(*v),
        SqlParam::Decimal(v) => q.bind(*v),
        SqlParam::Bool(v) => q.bind(*v),
        SqlParam::Text(v) => q.bind(v.as_deref()),
    }
}

/// Identifier-like word found outside quotes and parentheses
struct Word<'a> {
    start: usize,
    text: &'a str,
}

impl Word<'_> {
    fn is(&self, keyword: &str) -> bool {
        self.text.eq_ignore_ascii_case(keyword)
    }

    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

fn top_level_words(sql: &str) -> Vec<Word<'_>> {
    let bytes = sql.as_bytes();
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i, quote),
            b';' => {
                if depth == 0 {
                    words.push(Word {
                        start: i,
                        text: &sql[i..i + 1],
                    });
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b'$' => {
                // Placeholder such as $12
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                if depth == 0 {
                    words.push(Word {
                        start,
                        text: &sql[start..i],
                    });
                }
            }
            b if b.is_ascii_digit() => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    words
}

/// Index just past the quoted run opening at `open`
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() && bytes[i] != quote {
        i += 1;
    }
    (i + 1).min(bytes.len())
}

/// Replace `--` and `/* */` comments outside quotes with a single space.
fn strip_comments(sql: &str) -> Cow<'_, str> {
    if !sql.contains("--") && !sql.contains("/*") {
        return Cow::Borrowed(sql);
    }

    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i, quote),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                out.push_str(&sql[copied..i]);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                out.push(' ');
                copied = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&sql[copied..i]);
                // Postgres block comments nest
                let mut depth = 0usize;
                while i < bytes.len() {
                    if bytes[i..].starts_with(b"/*") {
                        depth += 1;
                        i += 2;
                    } else if bytes[i..].starts_with(b"*/") {
                        depth -= 1;
                        i += 2;
                        if depth == 0 {
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
                out.push(' ');
                copied = i;
            }
            _ => i += 1,
        }
    }

    out.push_str(&sql[copied..]);
    Cow::Owned(out)
}

fn starts_trailing_clause(words: &[Word<'_>], i: usize) -> bool {
    let next_is = |kw: &str| words.get(i + 1).is_some_and(|w| w.is(kw));
    let w = &words[i];

    if w.is("GROUP") || w.is("ORDER") {
        return next_is("BY");
    }
    if w.is("FOR") {
        return next_is("UPDATE") || next_is("SHARE") || next_is("NO") || next_is("KEY");
    }
    w.is("LIMIT") || w.is("OFFSET") || w.is("RETURNING")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_where_when_absent() {
        let scoped = scope_query(&Scope::ScopedTo(7), "SELECT * FROM products", vec![]).unwrap();
        assert_eq!(scoped.query, "SELECT * FROM products WHERE merchant_id = $1");
        assert_eq!(scoped.params, vec![SqlParam::Int(7)]);
    }

    #[test]
    fn appends_and_after_existing_where() {
        let scoped = scope_query(
            &Scope::ScopedTo(7),
            "SELECT * FROM products WHERE stock < $1",
            vec![SqlParam::from(5)],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT * FROM products WHERE stock < $1 AND merchant_id = $2"
        );
        assert_eq!(scoped.params, vec![SqlParam::Int(5), SqlParam::Int(7)]);
    }

    #[test]
    fn unscoped_is_byte_for_byte_identical() {
        let base = "SELECT *  FROM products\n WHERE stock < $1 ORDER BY name";
        let params = vec![SqlParam::from(5), SqlParam::from("x")];
        let scoped = scope_query(&Scope::Unscoped, base, params.clone()).unwrap();
        assert_eq!(scoped.query, base);
        assert_eq!(scoped.params, params);
    }

    #[test]
    fn predicate_goes_before_order_and_limit() {
        let scoped = scope_query(
            &Scope::ScopedTo(3),
            "SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            vec![SqlParam::from(10i64), SqlParam::from(0i64)],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT * FROM products WHERE merchant_id = $3 ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        assert_eq!(scoped.params.last(), Some(&SqlParam::Int(3)));
        assert_eq!(scoped.params.len(), 3);
    }

    #[test]
    fn predicate_goes_before_returning() {
        let scoped = scope_query(
            &Scope::ScopedTo(9),
            "UPDATE products SET stock = $1 WHERE id = $2 RETURNING *",
            vec![SqlParam::from(0), SqlParam::from(4)],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "UPDATE products SET stock = $1 WHERE id = $2 AND merchant_id = $3 RETURNING *"
        );
    }

    #[test]
    fn top_level_or_is_parenthesised() {
        let scoped = scope_query(
            &Scope::ScopedTo(2),
            "SELECT * FROM products WHERE stock = 0 OR category = $1 ORDER BY name",
            vec![SqlParam::from("toys")],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT * FROM products WHERE (stock = 0 OR category = $1) AND merchant_id = $2 ORDER BY name"
        );
    }

    #[test]
    fn nested_or_is_left_alone() {
        let scoped = scope_query(
            &Scope::ScopedTo(2),
            "SELECT * FROM products WHERE (stock = 0 OR stock > 100)",
            vec![],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT * FROM products WHERE (stock = 0 OR stock > 100) AND merchant_id = $1"
        );
    }

    #[test]
    fn keywords_in_strings_and_subqueries_are_ignored() {
        let scoped = scope_query(
            &Scope::ScopedTo(5),
            "SELECT id FROM orders WHERE status = 'where order by' AND user_id IN (SELECT id FROM users WHERE is_active LIMIT 5)",
            vec![],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT id FROM orders WHERE status = 'where order by' AND user_id IN (SELECT id FROM users WHERE is_active LIMIT 5) AND merchant_id = $1"
        );
    }

    #[test]
    fn lowercase_keywords_are_recognised() {
        let scoped = scope_query(
            &Scope::ScopedTo(1),
            "select count(*) from users where is_active order by id",
            vec![],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "select count(*) from users where is_active AND merchant_id = $1 order by id"
        );
    }

    #[test]
    fn explicit_owner_column_for_joins() {
        let scoped = scope_query_on(
            &Scope::ScopedTo(8),
            "o.merchant_id",
            "SELECT o.id FROM orders o JOIN users u ON o.user_id = u.id ORDER BY o.created_at DESC",
            vec![],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT o.id FROM orders o JOIN users u ON o.user_id = u.id WHERE o.merchant_id = $1 ORDER BY o.created_at DESC"
        );
    }

    #[test]
    fn delete_gets_scoped() {
        let scoped = scope_query(
            &Scope::ScopedTo(4),
            "DELETE FROM products WHERE id = $1",
            vec![SqlParam::from(11)],
        )
        .unwrap();
        assert_eq!(scoped.query, "DELETE FROM products WHERE id = $1 AND merchant_id = $2");
        assert_eq!(scoped.params, vec![SqlParam::Int(11), SqlParam::Int(4)]);
    }

    #[test]
    fn trailing_line_comment_cannot_swallow_predicate() {
        let scoped = scope_query(&Scope::ScopedTo(7), "SELECT * FROM products -- all rows\n", vec![]).unwrap();
        assert_eq!(scoped.query, "SELECT * FROM products WHERE merchant_id = $1");
    }

    #[test]
    fn comments_do_not_hide_keywords() {
        let scoped = scope_query(
            &Scope::ScopedTo(7),
            "SELECT * FROM products /* WHERE nothing */ WHERE stock < $1 -- or everything\nORDER BY name",
            vec![SqlParam::from(5)],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT * FROM products   WHERE stock < $1 AND merchant_id = $2 ORDER BY name"
        );
    }

    #[test]
    fn comment_markers_inside_strings_are_kept() {
        let scoped = scope_query(
            &Scope::ScopedTo(1),
            "SELECT * FROM products WHERE name = '--sale /* new */'",
            vec![],
        )
        .unwrap();
        assert_eq!(
            scoped.query,
            "SELECT * FROM products WHERE name = '--sale /* new */' AND merchant_id = $1"
        );
    }

    #[test]
    fn set_operators_are_refused() {
        for base in [
            "SELECT id FROM products WHERE stock = 0 UNION SELECT id FROM products WHERE stock > 100",
            "SELECT id FROM products INTERSECT SELECT product_id FROM order_items",
            "SELECT id FROM products EXCEPT SELECT id FROM products WHERE stock = 0",
        ] {
            let err = scope_query(&Scope::ScopedTo(7), base, vec![]).unwrap_err();
            assert!(matches!(err, DatabaseError::Unscopable(_)), "{}", base);
        }
    }

    #[test]
    fn union_inside_subquery_is_allowed() {
        let scoped = scope_query(
            &Scope::ScopedTo(2),
            "SELECT * FROM products WHERE id IN (SELECT 1 UNION SELECT 2)",
            vec![],
        )
        .unwrap();
        assert!(scoped.query.ends_with(") AND merchant_id = $1"));
    }

    #[test]
    fn single_trailing_semicolon_is_dropped() {
        let scoped = scope_query(&Scope::ScopedTo(7), "SELECT * FROM products;  ", vec![]).unwrap();
        assert_eq!(scoped.query, "SELECT * FROM products WHERE merchant_id = $1");
    }

    #[test]
    fn stacked_statements_are_refused() {
        let err = scope_query(
            &Scope::ScopedTo(7),
            "SELECT * FROM products; DELETE FROM products",
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Unscopable(_)));
    }

    #[test]
    fn unscoped_never_rewrites_or_refuses() {
        let base = "SELECT 1 UNION SELECT 2; -- anything";
        let scoped = scope_query(&Scope::Unscoped, base, vec![]).unwrap();
        assert_eq!(scoped.query, base);
    }
}
