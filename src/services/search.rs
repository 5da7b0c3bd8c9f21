use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, LikeExpr, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Value,
};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::config::AppConfig;
use crate::entities::{facility, facility_age_link, facility_paying_type_link};
use crate::errors::ServiceError;
use crate::models::{FacilityView, FieldFilter, SearchCriteria, SearchResult};
use crate::services::facilities::load_views;
use crate::services::taxonomy::normalize_label;

/// Half-width of the geo bounding box, in coordinate units
pub const GEO_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldKind {
    Float,
    Int,
    Bool,
    Text,
    Timestamp,
}

/// Columns a generic filter may reference
fn filterable(field: &str) -> Option<(facility::Column, FieldKind)> {
    use facility::Column as C;
    let found = match field {
        "name" => (C::Name, FieldKind::Text),
        "owner" => (C::Owner, FieldKind::Text),
        "address" => (C::Address, FieldKind::Text),
        "x" => (C::X, FieldKind::Float),
        "y" => (C::Y, FieldKind::Float),
        "hidden" => (C::Hidden, FieldKind::Bool),
        "length" => (C::Length, FieldKind::Float),
        "width" => (C::Width, FieldKind::Float),
        "height" => (C::Height, FieldKind::Float),
        "depth" => (C::Depth, FieldKind::Float),
        "area" => (C::Area, FieldKind::Float),
        "eps" => (C::Eps, FieldKind::Int),
        "actual_workload" => (C::ActualWorkload, FieldKind::Int),
        "annual_capacity" => (C::AnnualCapacity, FieldKind::Int),
        "accessibility" => (C::Accessibility, FieldKind::Bool),
        "site" => (C::Site, FieldKind::Text),
        "phone_number" => (C::PhoneNumber, FieldKind::Text),
        "document" => (C::Document, FieldKind::Text),
        "note" => (C::Note, FieldKind::Text),
        "created_at" => (C::CreatedAt, FieldKind::Timestamp),
        "type" => (C::TypeName, FieldKind::Text),
        "owning_type" => (C::OwningType, FieldKind::Text),
        "covering_type" => (C::CoveringType, FieldKind::Text),
        _ => return None,
    };
    Some(found)
}

/// Columns results may be ordered by; anything else orders by name
fn sort_column(order_by: Option<&str>) -> facility::Column {
    use facility::Column as C;
    match order_by {
        Some("created_at") => C::CreatedAt,
        Some("type") => C::TypeName,
        Some("area") => C::Area,
        Some("actual_workload") => C::ActualWorkload,
        Some("eps") => C::Eps,
        Some("annual_capacity") => C::AnnualCapacity,
        _ => C::Name,
    }
}

fn literal(field: &str, kind: FieldKind, value: &JsonValue) -> Result<Value, ServiceError> {
    let mismatch = || {
        ServiceError::ValidationError(format!(
            "filter value {} does not fit field '{}'",
            value, field
        ))
    };
    let converted = match kind {
        FieldKind::Float => value.as_f64().map(Value::from),
        FieldKind::Int => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::from),
        FieldKind::Bool => value.as_bool().map(Value::from),
        FieldKind::Text => value.as_str().map(|s| Value::from(s.to_string())),
        FieldKind::Timestamp => value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| Value::from(ts.with_timezone(&Utc))),
    };
    converted.ok_or_else(mismatch)
}

/// `eq`, `lt` and `gt` of one filter, AND-ed as written. `lt`/`gt` are inclusive.
fn field_condition(filter: &FieldFilter) -> Result<Condition, ServiceError> {
    let (column, kind) = filterable(&filter.field).ok_or_else(|| {
        ServiceError::ValidationError(format!("unknown filter field '{}'", filter.field))
    })?;

    let mut condition = Condition::all();
    if let Some(value) = &filter.eq {
        condition = condition.add(column.eq(literal(&filter.field, kind, value)?));
    }
    if let Some(value) = &filter.lt {
        condition = condition.add(column.lte(literal(&filter.field, kind, value)?));
    }
    if let Some(value) = &filter.gt {
        condition = condition.add(column.gte(literal(&filter.field, kind, value)?));
    }
    Ok(condition)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Both searched columns hold lower-cased text, so the pattern is lowered in Rust.
fn contains(column: facility::Column, pattern: &str) -> SimpleExpr {
    Expr::col((facility::Entity, column)).like(LikeExpr::new(pattern).escape('\\'))
}

fn normalized_set(labels: &Option<Vec<String>>) -> Option<Vec<String>> {
    labels
        .as_ref()
        .map(|labels| {
            labels
                .iter()
                .map(|label| normalize_label(label))
                .filter(|label| !label.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|set| !set.is_empty())
}

/// Builds the filtered, ordered select shared by the count and the page.
pub fn filtered_select(criteria: &SearchCriteria) -> Result<Select<facility::Entity>, ServiceError> {
    let mut query = facility::Entity::find();

    if let (Some(x), Some(y)) = (criteria.x, criteria.y) {
        query = query
            .filter(facility::Column::X.gt(x - GEO_EPSILON))
            .filter(facility::Column::X.lt(x + GEO_EPSILON))
            .filter(facility::Column::Y.gt(y - GEO_EPSILON))
            .filter(facility::Column::Y.lt(y + GEO_EPSILON));
    }

    if let Some(q) = criteria.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", escape_like(&q.to_lowercase()));
        query = query.filter(
            Condition::any()
                .add(contains(facility::Column::SearchText, &pattern))
                .add(contains(facility::Column::TypeName, &pattern)),
        );
    }

    if let Some(hidden) = criteria.hidden {
        query = query.filter(facility::Column::Hidden.eq(hidden));
    }

    if let Some(types) = normalized_set(&criteria.type_name) {
        query = query.filter(facility::Column::TypeName.is_in(types));
    }
    if let Some(owning) = normalized_set(&criteria.owning_type) {
        query = query.filter(facility::Column::OwningType.is_in(owning));
    }
    if let Some(covering) = normalized_set(&criteria.covering_type) {
        query = query.filter(facility::Column::CoveringType.is_in(covering));
    }
    if let Some(paying) = normalized_set(&criteria.paying_type) {
        query = query.filter(
            facility::Column::Id.in_subquery(
                Query::select()
                    .column(facility_paying_type_link::Column::Facility)
                    .from(facility_paying_type_link::Entity)
                    .and_where(facility_paying_type_link::Column::Term.is_in(paying))
                    .to_owned(),
            ),
        );
    }
    if let Some(ages) = normalized_set(&criteria.age) {
        query = query.filter(
            facility::Column::Id.in_subquery(
                Query::select()
                    .column(facility_age_link::Column::Facility)
                    .from(facility_age_link::Entity)
                    .and_where(facility_age_link::Column::Term.is_in(ages))
                    .to_owned(),
            ),
        );
    }

    for filter in &criteria.filters {
        query = query.filter(field_condition(filter)?);
    }

    let order = if criteria.order_desc {
        Order::Desc
    } else {
        Order::Asc
    };
    Ok(query
        .order_by(sort_column(criteria.order_by.as_deref()), order)
        .order_by(facility::Column::Id, Order::Asc))
}

/// Runs a search on any connection. `page_size` is ignored when `criteria.all` is set.
pub async fn search_on<C>(
    conn: &C,
    criteria: &SearchCriteria,
    page_size: u64,
) -> Result<SearchResult, ServiceError>
where
    C: ConnectionTrait,
{
    let query = filtered_select(criteria)?;
    let count = query.clone().count(conn).await?;

    let page = if criteria.all {
        query
    } else {
        query
            .limit(page_size)
            .offset(criteria.offset.unwrap_or(0))
    };
    let facilities: Vec<FacilityView> = load_views(conn, page.all(conn).await?).await?;

    debug!(count, returned = facilities.len(), "facility search finished");
    Ok(SearchResult { count, facilities })
}

/// Facility search engine
#[derive(Clone)]
pub struct SearchService {
    db: Arc<DatabaseConnection>,
    config: Arc<AppConfig>,
}

impl SearchService {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    #[instrument(skip(self, criteria))]
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResult, ServiceError> {
        let page_size = self.config.effective_page_size(criteria.limit);
        search_on(&*self.db, criteria, page_size).await
    }
}
