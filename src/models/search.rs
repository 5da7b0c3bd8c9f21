use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::facility::FacilityView;

/// Comparison on a single facility column. Bounds are inclusive and every
/// bound present in one filter must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldFilter {
    pub field: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub eq: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub lt: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub gt: Option<Value>,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            eq: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn between(field: impl Into<String>, gt: impl Into<Value>, lt: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            gt: Some(gt.into()),
            lt: Some(lt.into()),
            ..Default::default()
        }
    }
}

/// Facility search request. Every criterion is optional and all of them are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SearchCriteria {
    /// Longitude-like coordinate; only used together with `y`
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Case-insensitive substring over name, address, owner and type
    pub q: Option<String>,
    pub hidden: Option<bool>,
    #[serde(rename = "type")]
    pub type_name: Option<Vec<String>>,
    pub owning_type: Option<Vec<String>>,
    pub covering_type: Option<Vec<String>>,
    pub paying_type: Option<Vec<String>>,
    pub age: Option<Vec<String>>,
    pub filters: Vec<FieldFilter>,
    /// One of created_at, type, area, actual_workload, eps, annual_capacity; defaults to name
    pub order_by: Option<String>,
    pub order_desc: bool,
    /// Return every match, ignoring limit and offset
    pub all: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One page of search results plus the size of the whole filtered set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub count: u64,
    pub facilities: Vec<FacilityView>,
}
