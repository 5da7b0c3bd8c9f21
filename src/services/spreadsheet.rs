use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::errors::{is_data_error, ServiceError};
use crate::events::{Event, EventSender};
use crate::models::{
    Cell, ExportLink, FacilityFields, FacilityView, ImportedFacility, RowError, SearchCriteria,
    Sheet, ValidationReport, Workbook,
};
use crate::services::facilities::{insert_facility, resolve_taxonomy};
use crate::services::search::search_on;
use crate::services::taxonomy::{DEFAULT_IMPORT_AGES, DEFAULT_IMPORT_PAYING_TYPES};
use crate::storage::ObjectStorage;

/// Workbook column a header maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetColumn {
    Ordinal,
    Name,
    Address,
    Owner,
    OwningType,
    Length,
    Width,
    Height,
    Depth,
    Area,
    Eps,
    ActualWorkload,
    AnnualCapacity,
    CoveringType,
    Document,
    Note,
}

/// Header dictionary shared by import and export. The ordinal column is import-only.
const HEADERS: [(&str, SheetColumn); 16] = [
    ("№", SheetColumn::Ordinal),
    ("Наименование", SheetColumn::Name),
    ("Адрес", SheetColumn::Address),
    ("Пользователь", SheetColumn::Owner),
    ("Форма собственности", SheetColumn::OwningType),
    ("Длина", SheetColumn::Length),
    ("Ширина", SheetColumn::Width),
    ("Высота", SheetColumn::Height),
    ("Глубина", SheetColumn::Depth),
    ("Площадь", SheetColumn::Area),
    ("ЕПС", SheetColumn::Eps),
    ("Фактическая загруженность", SheetColumn::ActualWorkload),
    ("Годовая мощность", SheetColumn::AnnualCapacity),
    ("Покрытие", SheetColumn::CoveringType),
    ("Документ", SheetColumn::Document),
    ("Примечания", SheetColumn::Note),
];

impl SheetColumn {
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        HEADERS
            .iter()
            .find(|(label, _)| *label == header)
            .map(|(_, column)| *column)
    }

    pub fn header(self) -> &'static str {
        HEADERS
            .iter()
            .find(|(_, column)| *column == self)
            .map(|(label, _)| *label)
            .unwrap_or_default()
    }

    fn field(self) -> &'static str {
        match self {
            SheetColumn::Ordinal => "n",
            SheetColumn::Name => "name",
            SheetColumn::Address => "address",
            SheetColumn::Owner => "owner",
            SheetColumn::OwningType => "owning_type",
            SheetColumn::Length => "length",
            SheetColumn::Width => "width",
            SheetColumn::Height => "height",
            SheetColumn::Depth => "depth",
            SheetColumn::Area => "area",
            SheetColumn::Eps => "eps",
            SheetColumn::ActualWorkload => "actual_workload",
            SheetColumn::AnnualCapacity => "annual_capacity",
            SheetColumn::CoveringType => "covering_type",
            SheetColumn::Document => "document",
            SheetColumn::Note => "note",
        }
    }
}

/// Candidate facility read from one data row
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub n: i64,
    pub type_name: String,
    pub name: Option<String>,
    pub fields: Result<FacilityFields, String>,
}

impl SheetRow {
    fn error(&self, detail: String) -> RowError {
        RowError {
            n: self.n,
            type_name: self.type_name.clone(),
            name: self.name.clone(),
            detail,
        }
    }
}

fn cell_number(cell: &Cell, field: &str) -> Result<Option<f64>, String> {
    if cell.is_absent() {
        return Ok(None);
    }
    match cell {
        Cell::Number(n) => Ok(Some(*n)),
        Cell::Text(t) => t
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{field}: '{}' is not a number", t.trim())),
        other => Err(format!("{field}: {other:?} is not a number")),
    }
}

fn cell_integer(cell: &Cell, field: &str) -> Result<Option<i32>, String> {
    match cell_number(cell, field)? {
        None => Ok(None),
        Some(n) if n.fract() == 0.0 && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) => {
            Ok(Some(n as i32))
        }
        Some(n) => Err(format!("{field}: {n} is not an integer")),
    }
}

/// Reads every data row of a sheet. Row 0 is the header row.
pub fn read_sheet(sheet: &Sheet) -> Vec<SheetRow> {
    let Some((header, data)) = sheet.rows.split_first() else {
        return Vec::new();
    };
    let columns: Vec<Option<SheetColumn>> = header
        .iter()
        .map(|cell| cell.as_text().and_then(|text| SheetColumn::from_header(&text)))
        .collect();

    data.iter()
        .enumerate()
        .map(|(position, row)| read_row(&sheet.name, &columns, row, position as i64 + 1))
        .collect()
}

fn read_row(
    type_name: &str,
    columns: &[Option<SheetColumn>],
    row: &[Cell],
    position: i64,
) -> SheetRow {
    let cells = || {
        columns
            .iter()
            .zip(row.iter())
            .filter_map(|(column, cell)| column.map(|column| (column, cell)))
            .filter(|(_, cell)| !cell.is_absent())
    };

    let n = cells()
        .find(|(column, _)| *column == SheetColumn::Ordinal)
        .and_then(|(_, cell)| cell_integer(cell, "n").ok().flatten())
        .map(i64::from)
        .unwrap_or(position);
    let name = cells()
        .find(|(column, _)| *column == SheetColumn::Name)
        .and_then(|(_, cell)| cell.as_text());

    let mut fields = FacilityFields::new("", "", "", 0.0, type_name);
    fields.hidden = false;
    let mut area_seen = false;
    let mut problems = Vec::new();

    for (column, cell) in cells() {
        let field = column.field();
        let outcome: Result<(), String> = match column {
            SheetColumn::Ordinal => Ok(()),
            SheetColumn::Name => {
                fields.name = cell.as_text().unwrap_or_default();
                Ok(())
            }
            SheetColumn::Address => {
                fields.address = cell.as_text().unwrap_or_default();
                Ok(())
            }
            SheetColumn::Owner => {
                fields.owner = cell.as_text().unwrap_or_default();
                Ok(())
            }
            SheetColumn::OwningType => {
                fields.owning_type = cell.as_text();
                Ok(())
            }
            SheetColumn::CoveringType => {
                fields.covering_type = cell.as_text();
                Ok(())
            }
            SheetColumn::Document => {
                fields.document = cell.as_text();
                Ok(())
            }
            SheetColumn::Note => {
                fields.note = cell.as_text();
                Ok(())
            }
            SheetColumn::Length => cell_number(cell, field).map(|v| fields.length = v),
            SheetColumn::Width => cell_number(cell, field).map(|v| fields.width = v),
            SheetColumn::Height => cell_number(cell, field).map(|v| fields.height = v),
            SheetColumn::Depth => cell_number(cell, field).map(|v| fields.depth = v),
            SheetColumn::Area => cell_number(cell, field).map(|v| {
                area_seen = v.is_some();
                fields.area = v.unwrap_or_default();
            }),
            SheetColumn::Eps => cell_integer(cell, field).map(|v| fields.eps = v),
            SheetColumn::ActualWorkload => {
                cell_integer(cell, field).map(|v| fields.actual_workload = v)
            }
            SheetColumn::AnnualCapacity => {
                cell_integer(cell, field).map(|v| fields.annual_capacity = v)
            }
        };
        if let Err(problem) = outcome {
            problems.push(problem);
        }
    }

    for (field, present) in [
        ("name", !fields.name.is_empty()),
        ("address", !fields.address.is_empty()),
        ("owner", !fields.owner.is_empty()),
        ("area", area_seen),
    ] {
        if !present {
            problems.push(format!("{field}: field required"));
        }
    }
    if problems.is_empty() {
        if let Err(errors) = fields.validate() {
            problems.push(errors.to_string());
        }
    }

    SheetRow {
        n,
        type_name: type_name.to_string(),
        name,
        fields: if problems.is_empty() {
            Ok(fields)
        } else {
            Err(problems.join("; "))
        },
    }
}

/// Checks every row without touching the store.
pub fn validate_workbook(workbook: &Workbook) -> ValidationReport {
    let errors = workbook
        .sheets
        .iter()
        .flat_map(read_sheet)
        .filter_map(|row| match &row.fields {
            Ok(_) => None,
            Err(detail) => Some(row.error(detail.clone())),
        })
        .collect();
    ValidationReport { errors }
}

fn export_row(facility: &FacilityView) -> Vec<Cell> {
    HEADERS
        .iter()
        .filter(|(_, column)| *column != SheetColumn::Ordinal)
        .map(|(_, column)| match column {
            SheetColumn::Ordinal => Cell::Empty,
            SheetColumn::Name => Cell::from(facility.name.clone()),
            SheetColumn::Address => Cell::from(facility.address.clone()),
            SheetColumn::Owner => Cell::from(facility.owner.clone()),
            SheetColumn::OwningType => Cell::from(facility.owning_type.clone()),
            SheetColumn::Length => Cell::from(facility.length),
            SheetColumn::Width => Cell::from(facility.width),
            SheetColumn::Height => Cell::from(facility.height),
            SheetColumn::Depth => Cell::from(facility.depth),
            SheetColumn::Area => Cell::from(facility.area),
            SheetColumn::Eps => Cell::from(facility.eps),
            SheetColumn::ActualWorkload => Cell::from(facility.actual_workload),
            SheetColumn::AnnualCapacity => Cell::from(facility.annual_capacity),
            SheetColumn::CoveringType => Cell::from(facility.covering_type.clone()),
            SheetColumn::Document => Cell::from(facility.document.clone()),
            SheetColumn::Note => Cell::from(facility.note.clone()),
        })
        .collect()
}

/// Groups facilities into one sheet per type, headed by the readable labels.
pub fn build_workbook(facilities: &[FacilityView]) -> Workbook {
    let header: Vec<Cell> = HEADERS
        .iter()
        .filter(|(_, column)| *column != SheetColumn::Ordinal)
        .map(|(label, _)| Cell::from(*label))
        .collect();

    let mut by_type: BTreeMap<&str, Vec<Vec<Cell>>> = BTreeMap::new();
    for facility in facilities {
        by_type
            .entry(facility.type_name.as_str())
            .or_insert_with(|| vec![header.clone()])
            .push(export_row(facility));
    }

    Workbook {
        sheets: by_type
            .into_iter()
            .map(|(name, rows)| Sheet {
                name: name.to_string(),
                rows,
            })
            .collect(),
    }
}

fn row_is_skippable(err: &ServiceError) -> bool {
    match err {
        ServiceError::ValidationError(_) | ServiceError::AlreadyExists(_) => true,
        ServiceError::DatabaseError(db_err) => is_data_error(db_err),
        _ => false,
    }
}

/// Bulk import and export of facilities through workbooks
#[derive(Clone)]
pub struct SpreadsheetService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    storage: Arc<dyn ObjectStorage>,
}

impl SpreadsheetService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            db,
            event_sender,
            storage,
        }
    }

    pub fn validate(&self, workbook: &Workbook) -> ValidationReport {
        let report = validate_workbook(workbook);
        debug!(
            rows = workbook.data_row_count(),
            errors = report.errors.len(),
            "validated workbook"
        );
        report
    }

    /// Inserts every valid row. Rows that fail are rolled back individually
    /// and the rest of the batch is committed.
    #[instrument(skip(self, workbook))]
    pub async fn import(
        &self,
        workbook: &Workbook,
        size_bytes: usize,
    ) -> Result<Vec<ImportedFacility>, ServiceError> {
        let rows: Vec<SheetRow> = workbook.sheets.iter().flat_map(read_sheet).collect();
        let mut imported = Vec::new();

        let txn = self.db.begin().await?;
        for row in &rows {
            let mut fields = match &row.fields {
                Ok(fields) => fields.clone(),
                Err(detail) => {
                    debug!(n = row.n, sheet = %row.type_name, "skipping invalid row: {}", detail);
                    continue;
                }
            };
            if fields.paying_type.is_empty() {
                fields.paying_type = DEFAULT_IMPORT_PAYING_TYPES.map(String::from).to_vec();
            }
            if fields.age.is_empty() {
                fields.age = DEFAULT_IMPORT_AGES.map(String::from).to_vec();
            }

            let savepoint = txn.begin().await?;
            let outcome = match resolve_taxonomy(&savepoint, &fields).await {
                Ok(taxonomy) => insert_facility(&savepoint, &fields, &taxonomy).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(model) => {
                    savepoint.commit().await?;
                    imported.push(ImportedFacility {
                        id: model.id,
                        address: model.address,
                    });
                }
                Err(err) if row_is_skippable(&err) => {
                    savepoint.rollback().await?;
                    warn!(n = row.n, sheet = %row.type_name, "row not imported: {}", err);
                }
                Err(err) => {
                    savepoint.rollback().await?;
                    return Err(err);
                }
            }
        }
        txn.commit().await?;

        info!(
            "Imported {} of {} workbook rows ({:.3} KB)",
            imported.len(),
            rows.len(),
            size_bytes as f64 / 1000.0
        );
        self.event_sender
            .send_or_log(Event::SpreadsheetImported {
                size_bytes,
                rows: rows.len(),
                imported: imported.len(),
            });

        Ok(imported)
    }

    /// Writes every facility matching `criteria` to a workbook in object storage.
    #[instrument(skip(self, criteria))]
    pub async fn export(&self, criteria: &SearchCriteria) -> Result<ExportLink, ServiceError> {
        let criteria = SearchCriteria {
            all: true,
            ..criteria.clone()
        };
        let result = search_on(&*self.db, &criteria, 0).await?;
        let workbook = build_workbook(&result.facilities);
        let payload = serde_json::to_vec(&workbook)?;

        let key = format!("export-{}.json", Utc::now().timestamp());
        let url = self.storage.put(Bytes::from(payload), &key).await?;

        info!("Exported {} facilities to {}", result.count, url);
        Ok(ExportLink { url })
    }
}
