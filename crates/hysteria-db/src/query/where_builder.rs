//! Composable WHERE clauses.
//!
//! [`WhereQueryBuilder`] accumulates conditions joined with `AND`/`OR`. The
//! chainable condition methods live on the [`Filterable`] trait so the same
//! vocabulary works on a bare where builder, on a
//! [`QueryBuilder`](super::builder::QueryBuilder), and inside nested groups.
//!
//! The accumulated fragment never includes the `WHERE` keyword; it is added
//! when a statement is assembled. That is what lets a nested builder be
//! spliced into its parent as a parenthesized group.
//!
//! ```
//! # use std::sync::LazyLock;
//! # use hysteria_db::model::{Model, ModelMeta};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Serialize, Deserialize)]
//! # struct User { id: i64 }
//! # impl Model for User {
//! #     fn meta() -> &'static ModelMeta {
//! #         static META: LazyLock<ModelMeta> =
//! #             LazyLock::new(|| ModelMeta::builder("User").build().unwrap());
//! #         &META
//! #     }
//! # }
//! use hysteria_db::query::dialect::Dialect;
//! use hysteria_db::query::templates::Op;
//! use hysteria_db::query::where_builder::{Filterable, WhereQueryBuilder};
//!
//! let filter = WhereQueryBuilder::new(Dialect::MySql, User::meta())
//!     .where_("a", Op::Eq, 1)
//!     .and_where_builder(|q| q.where_("c", Op::Eq, 2).or_where("d", Op::Eq, 3));
//! let (sql, params) = filter.to_sql();
//! assert_eq!(sql, "WHERE users.a = ? AND (users.c = ? OR users.d = ?)");
//! assert_eq!(params.len(), 3);
//! ```

use hysteria_core::HysteriaResult;

use super::dialect::Dialect;
use super::templates::{Op, SqlFragment, WhereTemplate};
use crate::model::ModelMeta;
use crate::value::Value;

/// How a condition attaches to the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    And,
    Or,
}

/// Accumulated WHERE conditions for one model.
#[derive(Debug, Clone)]
pub struct WhereQueryBuilder {
    dialect: Dialect,
    meta: &'static ModelMeta,
    fragment: SqlFragment,
}

impl WhereQueryBuilder {
    pub const fn new(dialect: Dialect, meta: &'static ModelMeta) -> Self {
        Self {
            dialect,
            meta,
            fragment: SqlFragment {
                sql: String::new(),
                params: Vec::new(),
            },
        }
    }

    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub const fn meta(&self) -> &'static ModelMeta {
        self.meta
    }

    pub(crate) const fn template(&self) -> WhereTemplate<'static> {
        WhereTemplate::new(self.dialect, self.meta)
    }

    /// An empty builder for the same model, used for nested groups.
    pub const fn nested(&self) -> Self {
        Self::new(self.dialect, self.meta)
    }

    /// Appends a condition. The joiner is ignored for the first condition;
    /// empty conditions are skipped.
    pub fn push(&mut self, joiner: Joiner, condition: SqlFragment) {
        if condition.is_empty() {
            return;
        }
        if self.fragment.is_empty() {
            self.fragment = condition;
            return;
        }
        self.fragment.sql.push_str(match joiner {
            Joiner::And => " AND ",
            Joiner::Or => " OR ",
        });
        self.fragment.sql.push_str(&condition.sql);
        self.fragment.params.extend(condition.params);
    }

    /// The conditions without the `WHERE` keyword.
    pub const fn fragment(&self) -> &SqlFragment {
        &self.fragment
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }

    /// The full clause including the `WHERE` keyword, or an empty fragment.
    pub fn clause(&self) -> SqlFragment {
        if self.fragment.is_empty() {
            SqlFragment::default()
        } else {
            SqlFragment::new(
                format!("WHERE {}", self.fragment.sql),
                self.fragment.params.clone(),
            )
        }
    }

    /// The clause with placeholders converted, for inspection.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let clause = self.clause();
        (
            self.dialect.convert_placeholders(&clause.sql, 1),
            clause.params,
        )
    }
}

/// Chainable WHERE conditions.
///
/// Implementors only expose their [`WhereQueryBuilder`]. Every condition
/// comes in a plain, an `and_` and an `or_` form; the plain form joins with
/// `AND`.
pub trait Filterable: Sized {
    /// The where state conditions are appended to.
    fn filters(&mut self) -> &mut WhereQueryBuilder;

    #[doc(hidden)]
    fn push_where(mut self, joiner: Joiner, build: impl FnOnce(&WhereTemplate<'static>) -> SqlFragment) -> Self {
        let condition = build(&self.filters().template());
        self.filters().push(joiner, condition);
        self
    }

    // ── comparisons ────────────────────────────────────────────────────

    fn where_(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.push_where(Joiner::And, |t| t.condition(column, op, value.into()))
    }

    fn and_where(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.where_(column, op, value)
    }

    fn or_where(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.push_where(Joiner::Or, |t| t.condition(column, op, value.into()))
    }

    /// `column != value`.
    fn where_not(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_(column, Op::NotEq, value)
    }

    fn and_where_not(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_(column, Op::NotEq, value)
    }

    fn or_where_not(self, column: &str, value: impl Into<Value>) -> Self {
        self.or_where(column, Op::NotEq, value)
    }

    // ── ranges ─────────────────────────────────────────────────────────

    fn where_between(self, column: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.push_where(Joiner::And, |t| t.between(column, min.into(), max.into(), false))
    }

    fn and_where_between(self, column: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.where_between(column, min, max)
    }

    fn or_where_between(self, column: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.push_where(Joiner::Or, |t| t.between(column, min.into(), max.into(), false))
    }

    fn where_not_between(self, column: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.push_where(Joiner::And, |t| t.between(column, min.into(), max.into(), true))
    }

    fn and_where_not_between(
        self,
        column: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.where_not_between(column, min, max)
    }

    fn or_where_not_between(
        self,
        column: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.push_where(Joiner::Or, |t| t.between(column, min.into(), max.into(), true))
    }

    // ── lists ──────────────────────────────────────────────────────────

    fn where_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Joiner::And, |t| t.in_list(column, values, false))
    }

    fn and_where_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.where_in(column, values)
    }

    fn or_where_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Joiner::Or, |t| t.in_list(column, values, false))
    }

    fn where_not_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Joiner::And, |t| t.in_list(column, values, true))
    }

    fn and_where_not_in<V: Into<Value>>(
        self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.where_not_in(column, values)
    }

    fn or_where_not_in<V: Into<Value>>(
        self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Joiner::Or, |t| t.in_list(column, values, true))
    }

    // ── nulls ──────────────────────────────────────────────────────────

    fn where_null(self, column: &str) -> Self {
        self.push_where(Joiner::And, |t| t.null(column, false))
    }

    fn and_where_null(self, column: &str) -> Self {
        self.where_null(column)
    }

    fn or_where_null(self, column: &str) -> Self {
        self.push_where(Joiner::Or, |t| t.null(column, false))
    }

    fn where_not_null(self, column: &str) -> Self {
        self.push_where(Joiner::And, |t| t.null(column, true))
    }

    fn and_where_not_null(self, column: &str) -> Self {
        self.where_not_null(column)
    }

    fn or_where_not_null(self, column: &str) -> Self {
        self.push_where(Joiner::Or, |t| t.null(column, true))
    }

    // ── regex ──────────────────────────────────────────────────────────

    /// Fails with `UnsupportedOperation` on `SQLite`.
    fn where_regex(mut self, column: &str, pattern: &str) -> HysteriaResult<Self> {
        let condition = self.filters().template().regex(column, pattern, false)?;
        self.filters().push(Joiner::And, condition);
        Ok(self)
    }

    fn and_where_regex(self, column: &str, pattern: &str) -> HysteriaResult<Self> {
        self.where_regex(column, pattern)
    }

    fn or_where_regex(mut self, column: &str, pattern: &str) -> HysteriaResult<Self> {
        let condition = self.filters().template().regex(column, pattern, false)?;
        self.filters().push(Joiner::Or, condition);
        Ok(self)
    }

    fn where_not_regex(mut self, column: &str, pattern: &str) -> HysteriaResult<Self> {
        let condition = self.filters().template().regex(column, pattern, true)?;
        self.filters().push(Joiner::And, condition);
        Ok(self)
    }

    // ── raw ────────────────────────────────────────────────────────────

    /// Appends a raw fragment written with `PLACEHOLDER` tokens.
    fn where_raw(self, fragment: &str, params: Vec<Value>) -> Self {
        self.push_where(Joiner::And, |_| SqlFragment::new(fragment, params))
    }

    fn and_where_raw(self, fragment: &str, params: Vec<Value>) -> Self {
        self.where_raw(fragment, params)
    }

    fn or_where_raw(self, fragment: &str, params: Vec<Value>) -> Self {
        self.push_where(Joiner::Or, |_| SqlFragment::new(fragment, params))
    }

    // ── nested groups ──────────────────────────────────────────────────

    /// Builds a parenthesized group with a fresh builder for the same model.
    fn where_builder(self, build: impl FnOnce(WhereQueryBuilder) -> WhereQueryBuilder) -> Self {
        self.group(Joiner::And, build)
    }

    fn and_where_builder(self, build: impl FnOnce(WhereQueryBuilder) -> WhereQueryBuilder) -> Self {
        self.group(Joiner::And, build)
    }

    fn or_where_builder(self, build: impl FnOnce(WhereQueryBuilder) -> WhereQueryBuilder) -> Self {
        self.group(Joiner::Or, build)
    }

    #[doc(hidden)]
    fn group(mut self, joiner: Joiner, build: impl FnOnce(WhereQueryBuilder) -> WhereQueryBuilder) -> Self {
        let inner = build(self.filters().nested());
        if !inner.is_empty() {
            let SqlFragment { sql, params } = inner.fragment;
            self.filters()
                .push(joiner, SqlFragment::new(format!("({sql})"), params));
        }
        self
    }
}

impl Filterable for WhereQueryBuilder {
    fn filters(&mut self) -> &mut WhereQueryBuilder {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::query::templates::fixtures::User;
    use hysteria_core::HysteriaError;

    fn builder(dialect: Dialect) -> WhereQueryBuilder {
        WhereQueryBuilder::new(dialect, User::meta())
    }

    #[test]
    fn test_empty_builder_has_no_clause() {
        let b = builder(Dialect::Sqlite);
        assert!(b.is_empty());
        assert_eq!(b.to_sql(), (String::new(), vec![]));
    }

    #[test]
    fn test_nested_group_params_in_order() {
        let (sql, params) = builder(Dialect::MySql)
            .where_("a", Op::Eq, 1)
            .and_where_builder(|q| q.where_("c", Op::Eq, 2).or_where("d", Op::Eq, 3))
            .to_sql();
        assert_eq!(sql, "WHERE users.a = ? AND (users.c = ? OR users.d = ?)");
        assert_eq!(params, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_postgres_numbering_spans_groups() {
        let (sql, _) = builder(Dialect::Postgres)
            .where_in("id", [1, 2])
            .or_where_builder(|q| q.where_between("id", 10, 20))
            .to_sql();
        assert_eq!(
            sql,
            "WHERE users.id IN ($1, $2) OR (users.id BETWEEN $3 AND $4)"
        );
    }

    #[test]
    fn test_empty_group_is_skipped() {
        let (sql, _) = builder(Dialect::Sqlite)
            .where_null("email")
            .or_where_builder(|q| q)
            .to_sql();
        assert_eq!(sql, "WHERE users.email IS NULL");
    }

    #[test]
    fn test_first_condition_ignores_joiner() {
        let (sql, _) = builder(Dialect::Sqlite).or_where_not("userName", "x").to_sql();
        assert_eq!(sql, "WHERE users.user_name != ?");
    }

    #[test]
    fn test_not_variants() {
        let (sql, params) = builder(Dialect::Sqlite)
            .where_not_in("id", Vec::<i64>::new())
            .where_not_null("email")
            .where_not_between("id", 1, 2)
            .to_sql();
        assert_eq!(
            sql,
            "WHERE 1 = 1 AND users.email IS NOT NULL AND users.id NOT BETWEEN ? AND ?"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_raw_fragment() {
        let (sql, params) = builder(Dialect::Postgres)
            .where_("id", Op::Gt, 5)
            .or_where_raw("LOWER(users.user_name) = PLACEHOLDER", vec![Value::from("ann")])
            .to_sql();
        assert_eq!(sql, "WHERE users.id > $1 OR LOWER(users.user_name) = $2");
        assert_eq!(params[1], Value::from("ann"));
    }

    #[test]
    fn test_regex_errors_on_sqlite() {
        let err = builder(Dialect::Sqlite).where_regex("userName", "^a").unwrap_err();
        assert!(matches!(err, HysteriaError::UnsupportedOperation(_)));
        let (sql, _) = builder(Dialect::MySql)
            .where_regex("userName", "^a")
            .unwrap()
            .to_sql();
        assert_eq!(sql, "WHERE users.user_name REGEXP ?");
    }
}
