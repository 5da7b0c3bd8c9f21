use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::Patch;
use crate::entities::facility;
use crate::errors::ServiceError;

/// Opening hours for a single day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct DaySchedule {
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    /// Opening time, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_clock_time")]
    pub since: Option<String>,
    /// Closing time, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_clock_time")]
    pub to: Option<String>,
}

/// Weekly schedule. Every day is closed by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct WorkingHours {
    #[validate]
    pub monday: DaySchedule,
    #[validate]
    pub tuesday: DaySchedule,
    #[validate]
    pub wednesday: DaySchedule,
    #[validate]
    pub thursday: DaySchedule,
    #[validate]
    pub friday: DaySchedule,
    #[validate]
    pub saturday: DaySchedule,
    #[validate]
    pub sunday: DaySchedule,
}

impl WorkingHours {
    pub fn to_json(&self) -> Result<serde_json::Value, ServiceError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reads a stored schedule, falling back to all-closed for unreadable values.
    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    if NaiveTime::parse_from_str(value, "%H:%M").is_ok() {
        Ok(())
    } else {
        let mut err = ValidationError::new("clock_time");
        err.message = Some("Time must be formatted as HH:MM".into());
        Err(err)
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

fn default_hidden() -> bool {
    true
}

/// Complete set of facility fields, used for create and full replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct FacilityFields {
    #[validate(custom = "validate_not_blank", length(max = 512))]
    pub name: String,
    #[validate(custom = "validate_not_blank", length(max = 512))]
    pub owner: String,
    #[validate(custom = "validate_not_blank", length(max = 1024))]
    pub address: String,

    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,

    #[serde(default = "default_hidden")]
    pub hidden: bool,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub length: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub width: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub height: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub depth: Option<f64>,
    #[validate(range(min = 0.0))]
    pub area: f64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub eps: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub actual_workload: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub annual_capacity: Option<i32>,

    #[serde(default)]
    pub accessibility: bool,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    #[validate]
    pub working_hours: WorkingHours,

    #[serde(rename = "type")]
    #[validate(custom = "validate_not_blank")]
    pub type_name: String,
    #[serde(default)]
    pub owning_type: Option<String>,
    #[serde(default)]
    pub covering_type: Option<String>,
    #[serde(default)]
    pub paying_type: Vec<String>,
    #[serde(default)]
    pub age: Vec<String>,
}

impl FacilityFields {
    /// Minimal field set; every optional attribute left empty.
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        address: impl Into<String>,
        area: f64,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            address: address.into(),
            x: None,
            y: None,
            hidden: default_hidden(),
            length: None,
            width: None,
            height: None,
            depth: None,
            area,
            eps: None,
            actual_workload: None,
            annual_capacity: None,
            accessibility: false,
            site: None,
            phone_number: None,
            document: None,
            note: None,
            working_hours: WorkingHours::default(),
            type_name: type_name.into(),
            owning_type: None,
            covering_type: None,
            paying_type: Vec::new(),
            age: Vec::new(),
        }
    }
}

/// Partial update. Keys that are absent stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FacilityPatch {
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub owner: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub address: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub x: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub y: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<bool>)]
    pub hidden: Patch<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub length: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub width: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub height: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub depth: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<f64>)]
    pub area: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<i32>)]
    pub eps: Patch<i32>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<i32>)]
    pub actual_workload: Patch<i32>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<i32>)]
    pub annual_capacity: Patch<i32>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<bool>)]
    pub accessibility: Patch<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub site: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub phone_number: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub document: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub note: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<WorkingHours>)]
    pub working_hours: Patch<WorkingHours>,
    #[serde(rename = "type", default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub type_name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub owning_type: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<String>)]
    pub covering_type: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<Vec<String>>)]
    pub paying_type: Patch<Vec<String>>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[schema(value_type = Option<Vec<String>>)]
    pub age: Patch<Vec<String>>,
}

impl FacilityPatch {
    /// Checks the keys that are present. Required fields may not be nulled.
    pub fn validate_patch(&self) -> Result<(), ServiceError> {
        let mut problems = Vec::new();

        for (field, value) in [
            ("name", &self.name),
            ("owner", &self.owner),
            ("address", &self.address),
            ("type", &self.type_name),
        ] {
            match value {
                Patch::Null => problems.push(format!("{field} cannot be null")),
                Patch::Value(v) if v.trim().is_empty() => {
                    problems.push(format!("{field} must not be blank"))
                }
                _ => {}
            }
        }

        if matches!(self.area, Patch::Null) {
            problems.push("area cannot be null".to_string());
        }
        for (field, value) in [
            ("hidden", &self.hidden),
            ("accessibility", &self.accessibility),
        ] {
            if matches!(value, Patch::Null) {
                problems.push(format!("{field} cannot be null"));
            }
        }
        match &self.working_hours {
            Patch::Null => problems.push("working_hours cannot be null".to_string()),
            Patch::Value(hours) => {
                if let Err(err) = hours.validate() {
                    problems.push(format!("working_hours: {err}"));
                }
            }
            Patch::Missing => {}
        }

        for (field, value) in [
            ("length", &self.length),
            ("width", &self.width),
            ("height", &self.height),
            ("depth", &self.depth),
            ("area", &self.area),
        ] {
            if let Patch::Value(v) = value {
                if *v < 0.0 {
                    problems.push(format!("{field} must not be negative"));
                }
            }
        }
        for (field, value) in [
            ("eps", &self.eps),
            ("actual_workload", &self.actual_workload),
            ("annual_capacity", &self.annual_capacity),
        ] {
            if let Patch::Value(v) = value {
                if *v < 0 {
                    problems.push(format!("{field} must not be negative"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(problems.join("; ")))
        }
    }
}

/// Photo reference as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoView {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
}

impl From<crate::entities::facility_photo::Model> for PhotoView {
    fn from(model: crate::entities::facility_photo::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            filename: model.filename,
        }
    }
}

/// Facility with every association resolved to labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FacilityView {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub address: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub hidden: bool,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub area: f64,
    pub eps: Option<i32>,
    pub actual_workload: Option<i32>,
    pub annual_capacity: Option<i32>,
    pub accessibility: bool,
    pub site: Option<String>,
    pub phone_number: Option<String>,
    pub document: Option<String>,
    pub note: Option<String>,
    pub working_hours: WorkingHours,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub owning_type: Option<String>,
    pub covering_type: Option<String>,
    pub paying_type: Vec<String>,
    pub age: Vec<String>,
    pub photos: Vec<PhotoView>,
}

impl FacilityView {
    /// Builds the view from a stored row and its already loaded associations.
    pub fn assemble(
        model: facility::Model,
        mut paying_type: Vec<String>,
        mut age: Vec<String>,
        photos: Vec<PhotoView>,
    ) -> Self {
        paying_type.sort();
        age.sort();
        Self {
            id: model.id,
            working_hours: WorkingHours::from_json(&model.working_hours),
            name: model.name,
            owner: model.owner,
            address: model.address,
            x: model.x,
            y: model.y,
            hidden: model.hidden,
            length: model.length,
            width: model.width,
            height: model.height,
            depth: model.depth,
            area: model.area,
            eps: model.eps,
            actual_workload: model.actual_workload,
            annual_capacity: model.annual_capacity,
            accessibility: model.accessibility,
            site: model.site,
            phone_number: model.phone_number,
            document: model.document,
            note: model.note,
            created_at: model.created_at,
            type_name: model.type_name,
            owning_type: model.owning_type,
            covering_type: model.covering_type,
            paying_type,
            age,
            photos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_defaults() {
        let fields: FacilityFields = serde_json::from_value(serde_json::json!({
            "name": "Pool A",
            "owner": "City",
            "address": "1 Main St",
            "area": 100.0,
            "type": "Бассейны"
        }))
        .unwrap();

        assert!(fields.hidden);
        assert!(!fields.accessibility);
        assert!(fields.paying_type.is_empty());
        assert_eq!(fields.working_hours, WorkingHours::default());
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn blank_type_and_negative_area_fail_validation() {
        let mut fields = FacilityFields::new("Pool", "City", "1 Main St", -1.0, "  ");
        fields.eps = Some(-5);
        let errors = fields.validate().unwrap_err();
        let keys = errors.field_errors();
        assert!(keys.contains_key("type") || keys.contains_key("type_name"));
        assert!(keys.contains_key("area"));
        assert!(keys.contains_key("eps"));
    }

    #[test]
    fn malformed_clock_time_is_rejected() {
        let mut fields = FacilityFields::new("Pool", "City", "1 Main St", 10.0, "бассейны");
        fields.working_hours.monday = DaySchedule {
            open: true,
            all_day: Some(false),
            since: Some("9am".into()),
            to: Some("18:00".into()),
        };
        assert!(fields.validate().is_err());

        fields.working_hours.monday.since = Some("09:00".into());
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn patch_rejects_null_on_required_fields() {
        let patch: FacilityPatch =
            serde_json::from_value(serde_json::json!({ "name": null, "note": null })).unwrap();
        let err = patch.validate_patch().unwrap_err();
        assert!(err.to_string().contains("name cannot be null"));
        assert!(!err.to_string().contains("note"));
    }

    #[test]
    fn empty_patch_is_valid() {
        let patch: FacilityPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch, FacilityPatch::default());
        assert!(patch.validate_patch().is_ok());
    }

    #[test]
    fn unreadable_schedule_falls_back_to_closed() {
        let hours = WorkingHours::from_json(&serde_json::json!("garbage"));
        assert!(!hours.sunday.open);
    }
}
