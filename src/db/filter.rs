//! Typed filter predicates
//!
//! Filters are built by callers from static column names and rendered to a
//! WHERE fragment with positional `?` placeholders. The same rendered
//! predicate is shared by a page query and its count query.

use super::value::SqlValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, SqlValue),
    IsNull(&'static str),
    IsNotNull(&'static str),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Filter::Eq(column, value.into())
    }

    /// Conjunction of the given predicates. `None` for an empty set, the
    /// predicate itself for a single one.
    pub fn all(mut filters: Vec<Filter>) -> Option<Filter> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        }
    }

    /// Append this predicate's SQL to `sql` and its parameters to `params`.
    fn render_into(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            // `= NULL` never matches; an equality against null means IS NULL.
            Filter::Eq(column, SqlValue::Null) | Filter::IsNull(column) => {
                sql.push_str(column);
                sql.push_str(" IS NULL");
            }
            Filter::Eq(column, value) => {
                sql.push_str(column);
                sql.push_str(" = ?");
                params.push(value.clone());
            }
            Filter::IsNotNull(column) => {
                sql.push_str(column);
                sql.push_str(" IS NOT NULL");
            }
            Filter::And(filters) if filters.is_empty() => sql.push_str("1 = 1"),
            Filter::And(filters) => {
                sql.push('(');
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(" AND ");
                    }
                    filter.render_into(sql, params);
                }
                sql.push(')');
            }
        }
    }

    /// Columns referenced anywhere in the predicate
    pub fn columns(&self) -> Vec<&'static str> {
        match self {
            Filter::Eq(column, _) | Filter::IsNull(column) | Filter::IsNotNull(column) => {
                vec![*column]
            }
            Filter::And(filters) => filters.iter().flat_map(Filter::columns).collect(),
        }
    }
}

/// A rendered WHERE clause (including the keyword) and its bind parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Render an optional predicate. No predicate renders no WHERE clause.
pub fn render_where(filter: Option<&Filter>) -> WhereClause {
    match filter {
        None => WhereClause::default(),
        Some(filter) => {
            let mut sql = String::from(" WHERE ");
            let mut params = Vec::new();
            filter.render_into(&mut sql, &mut params);
            WhereClause { sql, params }
        }
    }
}
