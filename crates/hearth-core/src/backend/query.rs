//! Filter/order query composition.
//!
//! A [`Query`] renders to PostgREST query parameters for the hosted backend and
//! can also be evaluated directly against JSON rows by the in-memory backend.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

/// Comparison operators supported in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
        }
    }
}

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    IsNull(String),
    NotNull(String),
    /// Any of the nested filters matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Serialize) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: to_json(value),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    /// Whether the filter holds for a JSON row.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Self::Compare { column, op, value } => {
                let Some(cell) = row.get(column).filter(|cell| !cell.is_null()) else {
                    return false;
                };
                compare_values(cell, value).is_some_and(|ordering| op.accepts(ordering))
            }
            Self::IsNull(column) => row.get(column).map_or(true, Value::is_null),
            Self::NotNull(column) => row.get(column).is_some_and(|cell| !cell.is_null()),
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(row)),
        }
    }

    /// Top-level `(key, value)` query parameter.
    fn to_param(&self) -> (String, String) {
        match self {
            Self::Compare { column, op, value } => {
                (column.clone(), format!("{}.{}", op.keyword(), render_value(value)))
            }
            Self::IsNull(column) => (column.clone(), "is.null".to_string()),
            Self::NotNull(column) => (column.clone(), "not.is.null".to_string()),
            Self::Or(filters) => ("or".to_string(), render_group(filters)),
        }
    }

    /// Condition as it appears inside an `or=(...)` group.
    fn to_inline(&self) -> String {
        match self {
            Self::Compare { column, op, value } => {
                format!("{column}.{}.{}", op.keyword(), quote_inline(&render_value(value)))
            }
            Self::IsNull(column) => format!("{column}.is.null"),
            Self::NotNull(column) => format!("{column}.not.is.null"),
            Self::Or(filters) => format!("or{}", render_group(filters)),
        }
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Column selection, filters, ordering and limit for one table read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    columns: Option<String>,
    filters: Vec<Filter>,
    order: Vec<OrderBy>,
    limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict returned columns, e.g. `"id, url"`.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.replace(' ', ""));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl Serialize) -> Self {
        self.filter(Filter::compare(column, CompareOp::Eq, value))
    }

    #[must_use]
    pub fn lt(self, column: &str, value: impl Serialize) -> Self {
        self.filter(Filter::compare(column, CompareOp::Lt, value))
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl Serialize) -> Self {
        self.filter(Filter::compare(column, CompareOp::Lte, value))
    }

    #[must_use]
    pub fn gt(self, column: &str, value: impl Serialize) -> Self {
        self.filter(Filter::compare(column, CompareOp::Gt, value))
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl Serialize) -> Self {
        self.filter(Filter::compare(column, CompareOp::Gte, value))
    }

    #[must_use]
    pub fn is_null(self, column: &str) -> Self {
        self.filter(Filter::IsNull(column.to_string()))
    }

    #[must_use]
    pub fn not_null(self, column: &str) -> Self {
        self.filter(Filter::NotNull(column.to_string()))
    }

    #[must_use]
    pub fn or(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Whether every filter holds for the row.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Evaluate against rows: filter, order, limit, then project columns.
    #[must_use]
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
        let mut selected: Vec<&Value> = rows.into_iter().filter(|row| self.matches(row)).collect();

        selected.sort_by(|a, b| {
            for key in &self.order {
                let left = a.get(&key.column).unwrap_or(&Value::Null);
                let right = b.get(&key.column).unwrap_or(&Value::Null);
                let ordering = compare_nullable(left, right);
                let ordering = if key.ascending {
                    ordering
                } else {
                    ordering.reverse()
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        selected
            .into_iter()
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|row| self.project(row))
            .collect()
    }

    fn project(&self, row: &Value) -> Value {
        let Some(columns) = self.columns.as_deref().filter(|columns| *columns != "*") else {
            return row.clone();
        };
        let Some(object) = row.as_object() else {
            return row.clone();
        };

        let projected: Map<String, Value> = columns
            .split(',')
            .filter_map(|column| {
                object
                    .get(column)
                    .map(|value| (column.to_string(), value.clone()))
            })
            .collect();
        Value::Object(projected)
    }

    /// PostgREST query parameters.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|key| {
                    let direction = if key.ascending { "asc" } else { "desc" };
                    format!("{}.{direction}", key.column)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Filter-only parameters for `PATCH`/`DELETE` requests.
    #[must_use]
    pub fn to_filter_params(&self) -> Vec<(String, String)> {
        self.filters.iter().map(Filter::to_param).collect()
    }
}

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn render_group(filters: &[Filter]) -> String {
    let inner = filters
        .iter()
        .map(Filter::to_inline)
        .collect::<Vec<_>>()
        .join(",");
    format!("({inner})")
}

fn quote_inline(value: &str) -> String {
    if value.contains([',', '(', ')', '"']) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Nulls sort last in ascending order.
fn compare_nullable(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_values(left, right).unwrap_or(Ordering::Equal),
    }
}

/// Compare two JSON cells, understanding numbers, RFC 3339 timestamps and
/// ISO dates stored as strings.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(compare_text(a, b)),
        (Value::String(text), Value::Number(number)) => {
            text.parse::<f64>().ok()?.partial_cmp(&number.as_f64()?)
        }
        (Value::Number(number), Value::String(text)) => {
            number.as_f64()?.partial_cmp(&text.parse::<f64>().ok()?)
        }
        _ => (left == right).then_some(Ordering::Equal),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    if let (Ok(a), Ok(b)) = (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        return a.cmp(&b);
    }
    if let (Ok(a), Ok(b)) = (
        NaiveDate::parse_from_str(a, "%Y-%m-%d"),
        NaiveDate::parse_from_str(b, "%Y-%m-%d"),
    ) {
        return a.cmp(&b);
    }
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": 1, "user_id": "a", "start_time": "2024-06-01T10:00:00+00:00", "end_time": null}),
            json!({"id": 2, "user_id": "a", "start_time": "2024-06-03T10:00:00+00:00", "end_time": "2024-06-03T11:00:00+00:00"}),
            json!({"id": 3, "user_id": "b", "start_time": "2024-05-01T10:00:00+00:00", "end_time": "2024-05-01T11:00:00+00:00"}),
        ]
    }

    #[test]
    fn overlap_query_in_memory() {
        let query = Query::new()
            .eq("user_id", "a")
            .lt("start_time", "2024-06-04T00:00:00+00:00")
            .or(vec![
                Filter::compare("end_time", CompareOp::Gte, "2024-06-02T00:00:00+00:00"),
                Filter::is_null("end_time"),
            ])
            .order("start_time", true);
        let data = rows();
        let ids: Vec<_> = query.apply(&data).iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[test]
    fn timestamps_compare_across_offsets() {
        let row = json!({"start_time": "2024-06-01T10:00:00+02:00"});
        assert!(Query::new()
            .lt("start_time", "2024-06-01T09:00:00+00:00")
            .matches(&row));
    }

    #[test]
    fn renders_postgrest_params() {
        let query = Query::new()
            .select("id, url")
            .eq("user_id", "a")
            .not_null("due_date")
            .or(vec![
                Filter::compare("end_time", CompareOp::Gte, "2024-06-02T00:00:00+00:00"),
                Filter::is_null("end_time"),
            ])
            .order("created_at", false)
            .limit(5);
        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "id,url".to_string()),
                ("user_id".to_string(), "eq.a".to_string()),
                ("due_date".to_string(), "not.is.null".to_string()),
                (
                    "or".to_string(),
                    "(end_time.gte.2024-06-02T00:00:00+00:00,end_time.is.null)".to_string()
                ),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn projection_and_descending_order() {
        let query = Query::new().select("id").order("id", false).limit(2);
        let data = rows();
        assert_eq!(query.apply(&data), vec![json!({"id": 3}), json!({"id": 2})]);
    }

    #[test]
    fn missing_cells_never_satisfy_comparisons() {
        let row = json!({"id": 1});
        assert!(!Query::new().gte("due_date", "2024-01-01").matches(&row));
        assert!(Query::new().is_null("due_date").matches(&row));
        assert!(!Query::new().not_null("due_date").matches(&row));
    }

    #[test]
    fn numeric_ids_match_string_filters() {
        let row = json!({"id": 42});
        assert!(Query::new().eq("id", "42").matches(&row));
        assert!(Query::new().eq("id", 42).matches(&row));
    }
}
