pub mod facility;
pub mod search;
pub mod spreadsheet;

pub use facility::{DaySchedule, FacilityFields, FacilityPatch, FacilityView, PhotoView, WorkingHours};
pub use search::{FieldFilter, SearchCriteria, SearchResult};
pub use spreadsheet::{Cell, ExportLink, ImportedFacility, RowError, Sheet, ValidationReport, Workbook};
